//! Command-name contract for logging.

use crate::cli::parse::{AssessmentCommands, Commands, CurriculumCommands};

/// Dotted command name (e.g. "curriculum.sections").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Generate(_) => "generate".to_string(),
        Commands::Curriculum { command } => format!("curriculum.{}", curriculum_command_name(command)),
        Commands::Assessment { command } => format!("assessment.{}", assessment_command_name(command)),
        Commands::Chat(_) => "chat".to_string(),
        Commands::Classify { .. } => "classify".to_string(),
        Commands::ExplainError { .. } => "explain_error".to_string(),
    }
}

pub fn curriculum_command_name(command: &CurriculumCommands) -> &'static str {
    match command {
        CurriculumCommands::Generate(_) => "generate",
        CurriculumCommands::Refine(_) => "refine",
        CurriculumCommands::Reasoning(_) => "reasoning",
        CurriculumCommands::Sections(_) => "sections",
    }
}

pub fn assessment_command_name(command: &AssessmentCommands) -> &'static str {
    match command {
        AssessmentCommands::Questions(_) => "questions",
        AssessmentCommands::Analyze(_) => "analyze",
    }
}
