//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use council_domain::ExecutionMode;
use std::path::PathBuf;

/// How far `council ask` runs the deliberation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Answers, peer ranking and chairman synthesis
    Full,
    /// Independent answers only
    Stage1,
    /// Answers plus peer ranking; the top-ranked answer is final
    Stages12,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => ExecutionMode::Full,
            ModeArg::Stage1 => ExecutionMode::Stage1,
            ModeArg::Stages12 => ExecutionMode::Stages12,
        }
    }
}

/// CLI arguments for council
#[derive(Parser, Debug)]
#[command(name = "council")]
#[command(author, version, about = "Multi-model deliberation council")]
#[command(long_about = r#"
Council asks a panel of language models the same question, has them rank
each other's answers anonymously, and lets a chairman model synthesize the
final answer. Every step is streamed as one JSON event per line.

The process has three stages:
1. Answers: every panel member responds in parallel
2. Ranking: each member ranks the anonymized answers of its peers
3. Synthesis: the chairman writes the final answer from both

Simple questions skip the panel and are answered directly.

Configuration files are loaded from (lowest to highest priority):
1. ~/.config/council/config.toml          Global config
2. ./council.toml or ./.council.toml      Project-level config
3. --config <path>                        Explicit config file
4. COUNCIL_* environment variables        e.g. COUNCIL_SERVER__BIND

Example:
  council ask "Should we split the monolith this quarter?"
  council ask --mode stage1 "Compare Postgres and SQLite for this workload"
  council ask --panel cto=openai/gpt-5.1,cfo,coach "How do we price the pro tier?"
  council serve --bind 0.0.0.0:8001
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the council a question and stream events as NDJSON
    Ask(AskArgs),
    /// Serve the streaming HTTP API
    Serve(ServeArgs),
    /// Show configuration file locations and the resolved councils
    Config,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to put to the council
    pub question: String,

    /// Council to deliberate with (defaults to the configured one)
    #[arg(long, value_name = "ID")]
    pub council: Option<String>,

    /// How far to run the deliberation
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Skip classification and let the chairman answer directly
    #[arg(long)]
    pub force_direct: bool,

    /// Seat this panel instead of routing: advisor=model,advisor,...
    #[arg(long, value_name = "PANEL")]
    pub panel: Option<String>,

    /// Conversation id used for the transcript file
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server].bind)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_with_every_flag() {
        let cli = Cli::try_parse_from([
            "council",
            "-vv",
            "ask",
            "Should we hire?",
            "--council",
            "product",
            "--mode",
            "stages12",
            "--force-direct",
            "--panel",
            "cto=m1,cfo",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "Should we hire?");
        assert_eq!(args.council.as_deref(), Some("product"));
        assert_eq!(args.mode, Some(ModeArg::Stages12));
        assert!(args.force_direct);
        assert_eq!(args.panel.as_deref(), Some("cto=m1,cfo"));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["council", "serve", "--bind", "0.0.0.0:9000", "--config", "c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["council", "ask"]).is_err());
    }

    #[test]
    fn mode_maps_to_execution_mode() {
        assert_eq!(ExecutionMode::from(ModeArg::Stage1), ExecutionMode::Stage1);
        assert_eq!(ExecutionMode::from(ModeArg::Full), ExecutionMode::Full);
    }
}
