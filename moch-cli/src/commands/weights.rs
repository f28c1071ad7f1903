//! Weight commands - record, edit, and summarize a pet's weight history.

use clap::Subcommand;
use console::style;

use moch_core::error::MochResult;
use moch_models::{SortDirection, WeightEntry};

use super::Session;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum WeightsAction {
    /// List a pet's weight entries, oldest first.
    List {
        /// Pet ID.
        pet: String,
        /// Newest first.
        #[arg(long)]
        desc: bool,
    },
    /// Record a weight.
    Add {
        /// Pet ID.
        pet: String,
        /// Weight in kilograms.
        weight: f64,
        /// Date of the measurement (YYYY-MM-DD, defaults to today).
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form notes.
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Edit a weight entry.
    Edit {
        /// Weight entry ID.
        id: String,
        /// New weight in kilograms.
        #[arg(short, long)]
        weight: Option<f64>,
        /// New measurement date (YYYY-MM-DD).
        #[arg(short, long)]
        date: Option<String>,
        /// New notes (empty to clear).
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Remove a weight entry.
    Remove {
        /// Weight entry ID.
        id: String,
    },
    /// Show start, latest, and change over the whole history.
    Summary {
        /// Pet ID.
        pet: String,
    },
}

pub async fn run(session: &Session, action: WeightsAction, format: OutputFormat) -> MochResult<()> {
    let store = &session.store;

    match action {
        WeightsAction::List { pet, desc } => {
            let pet_id = super::parse_id(&pet)?;
            let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
            let entries = store.list_weight_entries(pet_id, direction)?;

            match format {
                OutputFormat::Json => super::print_json(&entries)?,
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("No weight entries.");
                        return Ok(());
                    }
                    let mut table = super::new_table();
                    table.set_header(vec!["ID", "Date", "Weight", "Notes"]);
                    for e in &entries {
                        table.add_row(vec![
                            e.id().to_string(),
                            e.recorded_at.to_string(),
                            format!("{:.2} kg", e.weight),
                            e.notes.as_deref().map(|n| super::truncate(n, 40)).unwrap_or_default(),
                        ]);
                    }
                    println!("{table}");
                    println!("\n{} entr{}.", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
                }
            }
        }
        WeightsAction::Add { pet, weight, date, notes } => {
            let pet_id = super::parse_id(&pet)?;
            let recorded_at = match date {
                Some(d) => super::parse_date(&d)?,
                None => chrono::Utc::now().date_naive(),
            };
            let mut entry = WeightEntry::for_pet_id(pet_id, weight, recorded_at);
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }

            let id = store.insert(entry)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
                OutputFormat::Text => {
                    println!(
                        "  {} Recorded {weight:.2} kg on {recorded_at} {}",
                        style("OK").green().bold(),
                        style(id).dim()
                    );
                }
            }
        }
        WeightsAction::Edit { id, weight, date, notes } => {
            let id = super::parse_id(&id)?;
            let date = date.as_deref().map(super::parse_date).transpose()?;
            let entry = store.update::<WeightEntry, _>(id, |e| {
                if let Some(weight) = weight {
                    e.weight = weight;
                }
                if let Some(date) = date {
                    e.recorded_at = date;
                }
                if let Some(notes) = notes {
                    e.notes = Some(notes);
                }
            })?;

            match format {
                OutputFormat::Json => super::print_json(&entry)?,
                OutputFormat::Text => {
                    println!(
                        "  {} {:.2} kg on {}",
                        style("OK").green().bold(),
                        entry.weight,
                        entry.recorded_at
                    );
                }
            }
        }
        WeightsAction::Remove { id } => {
            let id = super::parse_id(&id)?;
            let removed = store.delete::<WeightEntry>(id)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "id": id, "removed": removed }));
                }
                OutputFormat::Text if removed => {
                    println!("  {} Weight entry removed.", style("OK").green().bold());
                }
                OutputFormat::Text => {
                    println!("  {} No weight entry with ID {id}.", style("WARN").yellow().bold());
                }
            }
        }
        WeightsAction::Summary { pet } => {
            let pet_id = super::parse_id(&pet)?;
            let summary = store.weight_summary(pet_id)?;

            match (format, summary) {
                (OutputFormat::Json, summary) => super::print_json(&summary)?,
                (OutputFormat::Text, None) => println!("No weight entries."),
                (OutputFormat::Text, Some(summary)) => {
                    let change = format!("{:+.2} kg", summary.change);
                    let change = if summary.is_gain() {
                        style(change).green()
                    } else if summary.is_loss() {
                        style(change).red()
                    } else {
                        style(change).dim()
                    };

                    println!("{}", style("Weight Progress").bold().underlined());
                    println!("  Start:   {:.2} kg ({})", summary.start.weight, summary.start.recorded_at);
                    println!("  Latest:  {:.2} kg ({})", summary.end.weight, summary.end.recorded_at);
                    println!("  Change:  {change}");
                }
            }
        }
    }

    Ok(())
}
