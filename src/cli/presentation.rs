//! CLI presentation: text formatters per command family.

use crate::config::ValidationError;
use crate::reconcile::PassOutcome;
use crate::store::TargetFieldItem;
use comfy_table::Table;

pub fn format_fields_table(items: &[TargetFieldItem]) -> String {
    if items.is_empty() {
        return "No target fields recorded.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Kind", "UUID", "Fields"]);
    for item in items {
        let fields = item.fields.iter().cloned().collect::<Vec<_>>().join(", ");
        table.add_row(vec![item.kind.clone(), item.uuid.to_string(), fields]);
    }
    table.to_string()
}

pub fn format_pass_outcome(kind: &str, outcome: &PassOutcome) -> String {
    let mut lines = vec![format!(
        "{}: {} created, {} updated, {} deleted",
        kind, outcome.created, outcome.updated, outcome.deleted
    )];
    if outcome.conflicts > 0 {
        lines.push(format!(
            "{} created concurrently elsewhere, retried next pass",
            outcome.conflicts
        ));
    }
    for failure in &outcome.failures {
        lines.push(format!(
            "  {:?} {} failed: {}",
            failure.action, failure.uuid, failure.error
        ));
    }
    lines.join("\n")
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut out = format!("Configuration has {} problem(s):", errors.len());
    for error in errors {
        out.push_str(&format!("\n  - {}", error));
    }
    out
}
