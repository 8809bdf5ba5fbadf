//! CLI domain: parse, route, help and output only.
//! No domain orchestration; a single route table dispatches to the generation service.

mod help;
mod output;
mod parse;
mod route;

pub use help::command_name;
pub use output::{exit_code, map_error, CommandError, USAGE_ERROR};
pub use parse::{AssessmentCommands, Cli, Commands, CurriculumCommands, InputArgs};
pub use route::RunContext;
