//! Reminder commands - list, add, complete, reopen, and remove care reminders.

use clap::Subcommand;
use console::style;

use moch_core::error::MochResult;
use moch_models::queries::partition_reminders;
use moch_models::{Reminder, ReminderFilter, ReminderType};

use super::Session;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum RemindersAction {
    /// List reminders, upcoming first.
    List {
        /// Only reminders for this pet ID.
        #[arg(short, long)]
        pet: Option<String>,
        /// Only reminders not yet done.
        #[arg(long, conflicts_with = "completed")]
        upcoming: bool,
        /// Only reminders already done.
        #[arg(long)]
        completed: bool,
    },
    /// Add a reminder.
    Add {
        /// Reminder title.
        title: String,
        /// When it is due (RFC 3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD", UTC).
        #[arg(short, long)]
        at: String,
        /// Reminder type (vet-visit, vaccine, medication, grooming, other).
        #[arg(short = 't', long = "type", default_value = "other")]
        reminder_type: String,
        /// Free-form notes.
        #[arg(short, long)]
        notes: Option<String>,
        /// Pet ID this reminder is for.
        #[arg(short, long)]
        pet: Option<String>,
    },
    /// Mark a reminder as done.
    Done {
        /// Reminder ID.
        id: String,
    },
    /// Mark a done reminder as upcoming again.
    Reopen {
        /// Reminder ID.
        id: String,
    },
    /// Remove a reminder.
    Remove {
        /// Reminder ID.
        id: String,
    },
}

pub async fn run(session: &Session, action: RemindersAction, format: OutputFormat) -> MochResult<()> {
    let store = &session.store;

    match action {
        RemindersAction::List { pet, upcoming, completed } => {
            let mut filter = match (upcoming, completed) {
                (true, _) => ReminderFilter::upcoming(),
                (_, true) => ReminderFilter::completed(),
                _ => ReminderFilter::all(),
            };
            if let Some(pet) = pet {
                filter = filter.for_pet(super::parse_id(&pet)?);
            }
            let reminders = store.list_reminders(&filter)?;

            match format {
                OutputFormat::Json => super::print_json(&reminders)?,
                OutputFormat::Text => {
                    if reminders.is_empty() {
                        println!("No reminders.");
                        return Ok(());
                    }
                    let clock_24h = store.ensure_configuration()?.use_24_hour_clock;
                    let (open, done) = partition_reminders(reminders);
                    print_section("Upcoming", &open, clock_24h);
                    print_section("Completed", &done, clock_24h);
                }
            }
        }
        RemindersAction::Add { title, at, reminder_type, notes, pet } => {
            let reminder_type: ReminderType = reminder_type.parse()?;
            let mut reminder = Reminder::new(title, super::parse_datetime(&at)?, reminder_type);
            if let Some(notes) = notes {
                reminder = reminder.with_notes(notes);
            }
            if let Some(pet) = pet {
                reminder = reminder.for_pet(super::parse_id(&pet)?);
            }

            let id = store.insert(reminder)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
                OutputFormat::Text => {
                    println!("  {} Reminder added {}", style("OK").green().bold(), style(id).dim());
                }
            }
        }
        RemindersAction::Done { id } => set_completed(session, &id, true, format)?,
        RemindersAction::Reopen { id } => set_completed(session, &id, false, format)?,
        RemindersAction::Remove { id } => {
            let id = super::parse_id(&id)?;
            let removed = store.delete::<Reminder>(id)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "id": id, "removed": removed }));
                }
                OutputFormat::Text if removed => {
                    println!("  {} Reminder removed.", style("OK").green().bold());
                }
                OutputFormat::Text => {
                    println!("  {} No reminder with ID {id}.", style("WARN").yellow().bold());
                }
            }
        }
    }

    Ok(())
}

fn set_completed(session: &Session, id: &str, completed: bool, format: OutputFormat) -> MochResult<()> {
    let id = super::parse_id(id)?;
    let reminder = session
        .store
        .update::<Reminder, _>(id, |r| r.is_completed = completed)?;

    match format {
        OutputFormat::Json => super::print_json(&reminder)?,
        OutputFormat::Text => {
            let state = if completed { "done" } else { "upcoming" };
            println!(
                "  {} \"{}\" marked {state}.",
                style("OK").green().bold(),
                reminder.title
            );
        }
    }
    Ok(())
}

fn print_section(heading: &str, reminders: &[Reminder], clock_24h: bool) {
    if reminders.is_empty() {
        return;
    }
    println!("{}", style(heading).bold().underlined());

    let mut table = super::new_table();
    table.set_header(vec!["ID", "When", "Type", "Title", "Pet", "Notes"]);
    for r in reminders {
        table.add_row(vec![
            r.id().to_string(),
            super::format_datetime(&r.scheduled_date, clock_24h),
            r.reminder_type.display_name().to_string(),
            super::truncate(&r.title, 40),
            r.pet_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            r.notes.as_deref().map(|n| super::truncate(n, 30)).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    println!();
}
