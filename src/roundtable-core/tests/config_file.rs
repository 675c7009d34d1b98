use roundtable_core::{DebateConfig, DebateOrchestrator, RoleStance, TemplateGenerator};
use std::time::Duration;

const EXAMPLE: &str = include_str!("../../../roundtable.example.toml");

#[test]
fn test_example_config_parses() {
    let config = DebateConfig::from_toml_str(EXAMPLE).unwrap();

    assert_eq!(config.max_rounds, 4);
    assert_eq!(config.auto_end_conditions.timeout_minutes, Some(15));
    assert!(
        config
            .auto_end_conditions
            .moderator_keywords
            .contains(&"consensus".to_string())
    );

    let stances: Vec<RoleStance> = config.roles.iter().map(|r| r.stance).collect();
    assert_eq!(
        stances,
        vec![
            RoleStance::Pro,
            RoleStance::Con,
            RoleStance::Moderator,
            RoleStance::Summary
        ]
    );
}

#[tokio::test]
async fn test_example_config_runs_offline() {
    let mut config = DebateConfig::from_toml_str(EXAMPLE).unwrap();
    config.topic = "Four-day work week".to_string();
    config.turn_delay_ms = 0;

    let mut orchestrator =
        DebateOrchestrator::new(config, Box::new(TemplateGenerator::new(Duration::ZERO))).unwrap();
    let outcome = orchestrator.run().await.unwrap();

    // Three rotating roles over four rounds; the template text never
    // contains a closing keyword.
    assert_eq!(outcome.transcript.len(), 12);
    assert_eq!(outcome.rounds_completed, 4);
    assert!(outcome.summary.unwrap().starts_with("Scribe"));

    let markdown = roundtable_core::transcript::to_markdown(&outcome.topic, &outcome.transcript, None);
    assert_eq!(markdown.matches("## Round").count(), 4);
}
