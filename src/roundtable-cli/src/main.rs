//! Roundtable CLI - multi-role AI debates
//!
//! Runs a debate between configured personas using an OpenAI-compatible API.

use clap::Parser;
use colored::{ColoredString, Colorize};
use roundtable_core::transcript;
use roundtable_core::{
    DebateConfig, DebateEvent, DebateOrchestrator, OpenAiGenerator, OpenAiSettings,
    ResponseGenerator, RoleColor, TemplateGenerator,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "roundtable",
    version,
    about = "Roundtable - watch AI personas debate a topic",
    long_about = "Runs a turn-based debate between AI roles using OpenAI-compatible APIs."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// TOML file with roles and auto-end conditions
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of rounds
    #[arg(short, long, value_name = "ROUNDS")]
    rounds: Option<u32>,

    /// Stop after this many minutes (0 disables)
    #[arg(long, value_name = "MINUTES")]
    timeout_minutes: Option<u64>,

    /// Use this model for every role
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Skip the closing summary
    #[arg(long)]
    no_summary: bool,

    /// Pause between turns in milliseconds
    #[arg(long, value_name = "MS")]
    turn_delay_ms: Option<u64>,

    /// Generate canned responses instead of calling an API
    #[arg(long)]
    offline: bool,

    /// Write the transcript to a .json or .md file
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DebateConfig::load(path)?,
        None => DebateConfig::with_default_roles(""),
    };
    config.topic = cli.topic.clone();
    if let Some(rounds) = cli.rounds {
        config.max_rounds = rounds;
    }
    if let Some(minutes) = cli.timeout_minutes {
        config.auto_end_conditions.timeout_minutes = Some(minutes);
    }
    if let Some(model) = &cli.model {
        config.override_model(model);
    }
    if let Some(delay) = cli.turn_delay_ms {
        config.turn_delay_ms = delay;
    }
    if cli.no_summary {
        config.summary_enabled = false;
    }

    let generator: Box<dyn ResponseGenerator> = if cli.offline {
        Box::new(TemplateGenerator::default())
    } else {
        Box::new(OpenAiGenerator::new(openai_settings(cli.model.as_deref()))?)
    };

    print_header(&config);

    let mut orchestrator =
        DebateOrchestrator::new(config, generator)?.with_callback(create_console_callback());

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Stopping after the current turn...".yellow());
            stop.stop();
        }
    });

    let outcome = orchestrator.run().await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  Debate concluded: {}.", outcome.end_reason)
            .bright_green()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    if let Some(path) = &cli.output {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let body = if is_json {
            outcome.to_json()?
        } else {
            transcript::to_markdown(
                &outcome.topic,
                &outcome.transcript,
                outcome.summary.as_deref(),
            )
        };
        fs::write(path, body)?;
        info!(path = %path.display(), "transcript written");
        println!("Transcript written to {}", path.display().to_string().bold());
    }

    Ok(())
}

/// API settings from the environment.
fn openai_settings(model: Option<&str>) -> OpenAiSettings {
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        warn!("OPENAI_API_KEY not set");
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let default_model = model
        .map(str::to_string)
        .or_else(|| env::var("OPENAI_MODEL").ok())
        .unwrap_or_else(|| "gpt-4o-mini".to_string());

    OpenAiSettings::new(api_base, api_key, default_model)
}

fn print_header(config: &DebateConfig) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", "Roundtable".bold()).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), config.topic.bright_white());
    println!(
        "{} {}",
        "Max rounds:".bold(),
        config.max_rounds.to_string().bright_white()
    );
    println!();
    println!("{}", "Roles:".bold());
    for (i, role) in config.roles.iter().enumerate() {
        println!(
            "  {}. {} ({}) - using {}",
            i + 1,
            paint(&role.name, role.color),
            role.stance.display_name().yellow(),
            role.model_id.as_deref().unwrap_or("default model").dimmed()
        );
    }
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

fn paint(text: &str, color: RoleColor) -> ColoredString {
    match color {
        RoleColor::Red => text.bright_red(),
        RoleColor::Blue => text.bright_blue(),
        RoleColor::Green => text.bright_green(),
        RoleColor::Yellow => text.bright_yellow(),
        RoleColor::Magenta => text.bright_magenta(),
        RoleColor::Cyan => text.bright_cyan(),
        RoleColor::White => text.bright_white(),
    }
}

/// Create a callback that prints debate events to the console.
fn create_console_callback() -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    Box::new(move |event| match event {
        DebateEvent::DebateStart { .. } => {}
        DebateEvent::RoundStart { round, max_rounds } => {
            println!();
            println!("{}", "═".repeat(70).bright_magenta());
            println!(
                "{}",
                format!("  ROUND {} / {}", round, max_rounds)
                    .bright_magenta()
                    .bold()
            );
            println!("{}", "═".repeat(70).bright_magenta());
            println!();
        }
        DebateEvent::SpeakerStart { role, .. } => {
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                paint(&role.name, role.color).bold(),
                format!("({})", role.stance.display_name()).yellow()
            );
        }
        DebateEvent::SpeakerMessage(message) => {
            let wrapped = textwrap(&message.content, 66);
            for line in wrapped.lines() {
                println!("  {}", line);
            }
            println!();
        }
        DebateEvent::TurnFailed { role, error } => {
            eprintln!(
                "  {} {} - {}",
                "[Turn failed]".red().bold(),
                role,
                error.dimmed()
            );
        }
        DebateEvent::Summary { author, content } => {
            println!("{}", "─".repeat(70).dimmed());
            println!("{} {}", "Summary by".bold(), author.bright_cyan().bold());
            for line in textwrap(&content, 66).lines() {
                println!("  {}", line);
            }
        }
        DebateEvent::DebateEnd { .. } => {
            // Handled in main
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line_len + word_len + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap_breaks_on_width() {
        let wrapped = textwrap("one two three four five", 9);
        assert_eq!(wrapped, "one two\nthree\nfour five");
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "roundtable",
            "Cats vs dogs",
            "--rounds",
            "4",
            "--offline",
            "--no-summary",
            "-o",
            "out.md",
        ])
        .unwrap();
        assert_eq!(cli.topic, "Cats vs dogs");
        assert_eq!(cli.rounds, Some(4));
        assert!(cli.offline);
        assert!(cli.no_summary);
        assert_eq!(cli.output, Some(PathBuf::from("out.md")));
    }
}
