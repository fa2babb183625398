//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources override earlier ones key by key; tables merge, scalars and
//! arrays replace.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("backend.endpoint", "http://localhost:11010/v1/")?
        .set_default("backend.timeout_secs", 30)?
        .set_default("storage.backend", "sled")?
        .set_default("storage.path", ".uagent/target_fields")?
        .set_default("logging.level", "info")
}
