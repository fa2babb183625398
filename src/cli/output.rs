//! CLI output: error mapping from domain errors to stable CLI surface.

/// Render an error with its full cause chain.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("Error: {:#}", e)
}
