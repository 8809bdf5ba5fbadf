//! CLI parse: clap types for studygen. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// studygen - quality-gated learning content generation
#[derive(Parser, Debug)]
#[command(name = "studygen", version)]
#[command(about = "Generate lessons, curricula and assessments through a quality-gated LLM pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces ./studygen.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve provider calls from a JSON fixture file instead of the network
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Trace id echoed in error payloads (generated when absent)
    #[arg(long, global = true)]
    pub trace_id: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

/// Request JSON source: a file, or stdin when omitted
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Path to the request JSON
    #[arg(long, short)]
    pub input: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate lesson content or a quiz set
    Generate(InputArgs),
    /// Curriculum operations
    Curriculum {
        #[command(subcommand)]
        command: CurriculumCommands,
    },
    /// Placement assessment operations
    Assessment {
        #[command(subcommand)]
        command: AssessmentCommands,
    },
    /// Reply to the latest user message as the learning assistant
    Chat(InputArgs),
    /// Classify a failure reason
    Classify {
        /// Raw failure text
        reason: String,
    },
    /// Convert a legacy error detail string into an error payload
    ExplainError {
        /// Detail such as `content_generate_failed:timeout:...`
        detail: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CurriculumCommands {
    /// Generate a new curriculum
    Generate(InputArgs),
    /// Rewrite a curriculum from a chat message
    Refine(InputArgs),
    /// Explain how and why a topic should be taught
    Reasoning(InputArgs),
    /// Generate learning sections for a topic
    Sections(InputArgs),
}

#[derive(Subcommand, Debug)]
pub enum AssessmentCommands {
    /// Generate placement questions
    Questions(InputArgs),
    /// Analyze placement answers
    Analyze(InputArgs),
}
