//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, ConfigCommands, FieldsCommands};
use crate::cli::presentation::{format_fields_table, format_pass_outcome, format_validation_errors};
use crate::config::{AgentConfig, ConfigLoader};
use crate::hash::{canonical_hash, canonical_hash_subset};
use crate::model::Resource;
use crate::reconcile::run_pass;
use crate::store::TargetFieldItem;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: AgentConfig,
}

impl RunContext {
    /// Load the layered configuration, including `--config` when given.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = config_path {
            loader = loader.with_file(path);
        }
        let config = loader.load().context("Failed to load configuration")?;
        Ok(Self { config })
    }

    pub fn from_config(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Hash { file, fields } => hash_file(file, fields.as_deref()),
            Commands::Capabilities => Ok(self
                .config
                .capabilities()
                .into_iter()
                .collect::<Vec<_>>()
                .join("\n")),
            Commands::Fields { command } => self.handle_fields(command),
            Commands::Reconcile { kind, targets } => self.handle_reconcile(kind, targets),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_fields(&self, command: &FieldsCommands) -> Result<String> {
        let store = self.config.storage.open_store()?;
        match command {
            FieldsCommands::List { kind } => {
                let tx = store.load()?;
                let items = match kind {
                    Some(kind) => tx.list(kind),
                    None => tx.list_all(),
                };
                Ok(format_fields_table(&items))
            }
            FieldsCommands::Forget { kind, uuid } => {
                let mut tx = store.load()?;
                tx.delete(&TargetFieldItem::new(kind.clone(), *uuid, BTreeSet::new()), true)?;
                store.persist(tx)?;
                info!(uuid = %uuid, kind = %kind, "Target fields forgotten");
                Ok(format!("Forgot target fields of {}/{}", kind, uuid))
            }
        }
    }

    fn handle_reconcile(&self, kind: &str, targets: &Path) -> Result<String> {
        let targets = read_targets(kind, targets)?;
        let mut driver = self.config.build_driver()?;
        let outcome = run_pass(&mut driver, kind, &targets)?;
        let summary = format_pass_outcome(kind, &outcome);
        if outcome.is_clean() {
            Ok(summary)
        } else {
            bail!("{}", summary)
        }
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String> {
        match command {
            ConfigCommands::Validate => match self.config.validate() {
                Ok(()) => Ok("Configuration is valid.".to_string()),
                Err(errors) => bail!("{}", format_validation_errors(&errors)),
            },
            ConfigCommands::Show => {
                toml::to_string_pretty(&self.config).context("Failed to render configuration")
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn hash_file(path: &Path, fields: Option<&[String]>) -> Result<String> {
    let document = read_json(path)?;
    let hash = match fields {
        None => canonical_hash(&document)?,
        Some(fields) => {
            let Value::Object(view) = &document else {
                bail!("--fields needs a JSON object, {} holds something else", path.display());
            };
            let fields: BTreeSet<String> = fields.iter().map(|f| f.trim().to_string()).collect();
            canonical_hash_subset(view, &fields)?
        }
    };
    Ok(hash)
}

/// Target values must each carry a `uuid`
fn read_targets(kind: &str, path: &Path) -> Result<Vec<Resource>> {
    let Value::Array(values) = read_json(path)? else {
        bail!("{} must hold a JSON array of objects", path.display());
    };
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let Value::Object(view) = value else {
                return Err(anyhow!("Target #{} is not a JSON object", index));
            };
            let fields = view.keys().cloned().collect();
            Resource::from_value(view, kind, fields)
                .ok_or_else(|| anyhow!("Target #{} has no valid uuid", index))
        })
        .collect()
}
