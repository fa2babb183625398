//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, FieldsCommands};
pub use presentation::{format_fields_table, format_pass_outcome, format_validation_errors};
pub use route::RunContext;
