//! Terminal representations of inventory data.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde_json::Value;

use muster_core::model::{Entity, EntityState};
use muster_core::ops::RunReport;

struct Widths {
    id: usize,
    name: usize,
    kind: usize,
}

fn measure(entities: &[Entity]) -> Widths {
    let mut widths = Widths {
        id: "ID".len(),
        name: "Name".len(),
        kind: "Kind".len(),
    };
    for entity in entities {
        widths.id = widths.id.max(entity.id().len());
        widths.name = widths.name.max(entity.name().unwrap_or("").len());
        widths.kind = widths.kind.max(entity.kind().tag().len());
    }
    widths
}

fn print_table_header(widths: &Widths) {
    // Pad before coloring so the escape codes don't count against the
    // column width.
    println!(
        "{}  {}  {}  {}",
        format!("{:<width$}", "ID", width = widths.id).bold(),
        format!("{:<width$}", "Name", width = widths.name).bold(),
        format!("{:<width$}", "Kind", width = widths.kind).bold(),
        "State".bold(),
    );
    println!("{}", "─".repeat(widths.id + widths.name + widths.kind + 11));
}

fn print_entity_row(entity: &Entity, widths: &Widths) {
    println!(
        "{}  {}  {}  {}",
        format!("{:<width$}", entity.id(), width = widths.id).green(),
        format!("{:<width$}", entity.name().unwrap_or(""), width = widths.name).magenta(),
        format!("{:<width$}", entity.kind().tag(), width = widths.kind).cyan(),
        state_cell(entity.state()),
    );
}

fn state_cell(state: EntityState) -> ColoredString {
    let text = state.to_string();
    match state {
        EntityState::Active => text.green(),
        EntityState::Terminated => text.red(),
        _ => text.yellow(),
    }
}

/// Print entities as an aligned ID / Name / Kind / State table.
pub fn print_entity_table(entities: &[Entity]) {
    let widths = measure(entities);
    print_table_header(&widths);
    for entity in entities {
        print_entity_row(entity, &widths);
    }
}

/// Incremental table for search output. Column widths are fixed when the
/// first batch arrives; rows from later batches overflow their columns
/// rather than reflowing what is already on screen.
#[derive(Default)]
pub struct SearchTable {
    widths: Option<Widths>,
}

impl SearchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_batch(&mut self, entities: &[Entity]) {
        let widths = self.widths.get_or_insert_with(|| {
            let widths = measure(entities);
            print_table_header(&widths);
            widths
        });
        for entity in entities {
            print_entity_row(entity, widths);
        }
    }
}

/// Print one entity as an attribute detail view. Attributes appear in
/// their declared order; absent and empty values are skipped. Attributes
/// holding lists of objects (firewall rules) are rendered as indented
/// blocks under the attribute name.
pub fn print_entity(entity: &Entity) -> Result<()> {
    let attrs = entity.to_attrs()?;
    let title = format!("{}: {}", entity.kind().display_name(), entity.id());
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()));
    for attribute in entity.kind().searchable_attributes() {
        if *attribute == "id" {
            continue;
        }
        let Some(value) = attrs.get(*attribute) else {
            continue;
        };
        match value {
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                println!("  {}:", title_case(attribute).cyan());
                for item in items {
                    print_object_block(item);
                }
            }
            _ => {
                let cell = value_cell(value);
                if cell.is_empty() {
                    continue;
                }
                println!("  {}: {}", title_case(attribute).cyan(), cell);
            }
        }
    }
    Ok(())
}

fn print_object_block(object: &Value) {
    let Some(map) = object.as_object() else {
        return;
    };
    let mut first = true;
    for (key, value) in map {
        let cell = value_cell(value);
        if cell.is_empty() {
            continue;
        }
        let bullet = if first { "-" } else { " " };
        println!("    {} {}: {}", bullet, title_case(key), cell);
        first = false;
    }
}

/// Print the closing summary of an update run.
pub fn print_run_report(report: &RunReport) {
    let source_errors = report.source_errors.to_string();
    let source_errors = if report.source_errors > 0 {
        source_errors.red()
    } else {
        source_errors.normal()
    };

    println!();
    println!("{}", "Update Report".bold());
    println!("─────────────");
    println!("  Upserted: {}", report.upserted.to_string().green());
    println!("  Terminated: {}", report.terminated.to_string().yellow());
    println!("  Skipped: {}", report.skipped);
    println!("  Source errors: {}", source_errors);
    println!("  Duration: {:.1}s", report.duration_ms as f64 / 1000.0);
}

fn value_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_cell)
            .filter(|cell| !cell.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn title_case(attribute: &str) -> String {
    attribute
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("public_read"), "Public Read");
        assert_eq!(title_case("state"), "State");
    }

    #[test]
    fn test_value_cell_joins_lists() {
        assert_eq!(value_cell(&json!(["10.0.1.5", "10.0.2.8"])), "10.0.1.5, 10.0.2.8");
        assert_eq!(value_cell(&json!(true)), "true");
        assert_eq!(value_cell(&json!(5432)), "5432");
        assert_eq!(value_cell(&json!(null)), "");
        assert_eq!(value_cell(&json!([])), "");
    }

    #[test]
    fn test_state_cell_text() {
        colored::control::set_override(false);
        assert_eq!(state_cell(EntityState::Active).to_string(), "active");
        assert_eq!(state_cell(EntityState::Terminated).to_string(), "terminated");
        colored::control::unset_override();
    }

    #[test]
    fn test_measure_tracks_longest_cell() {
        let entity = Entity::from_attrs(
            muster_core::model::EntityKind::Service,
            json!({"id": "ser_001", "name": "identity provider", "state": "active"})
                .as_object()
                .unwrap(),
        )
        .unwrap();

        let widths = measure(&[entity]);

        assert_eq!(widths.id, "ser_001".len());
        assert_eq!(widths.name, "identity provider".len());
    }
}
