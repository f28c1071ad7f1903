//! Pet commands - list, add, rename, remove, and manage photos.

use clap::Subcommand;
use console::style;

use moch_core::error::{MochError, MochResult};
use moch_models::{Pet, PetType, ReminderFilter, SortDirection};
use moch_services::FileAssetLoader;

use super::Session;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum PetsAction {
    /// List all pets, sorted by name.
    List,
    /// Add a new pet.
    Add {
        /// Pet name.
        name: String,
        /// Birthday (YYYY-MM-DD).
        #[arg(short, long)]
        birthday: String,
        /// Pet type (dog, cat).
        #[arg(short = 't', long = "type", default_value = "dog")]
        pet_type: String,
        /// Photo file to attach.
        #[arg(short, long)]
        photo: Option<String>,
    },
    /// Rename a pet.
    Rename {
        /// Pet ID.
        id: String,
        /// New name.
        name: String,
    },
    /// Remove a pet, its weight history, and its reminder assignments.
    Remove {
        /// Pet ID.
        id: String,
    },
    /// Set or clear a pet's photo.
    Photo {
        /// Pet ID.
        id: String,
        /// Photo file to attach.
        #[arg(short, long, conflicts_with = "clear")]
        file: Option<String>,
        /// Remove the current photo.
        #[arg(long)]
        clear: bool,
    },
}

pub async fn run(session: &Session, action: PetsAction, format: OutputFormat) -> MochResult<()> {
    let store = &session.store;

    match action {
        PetsAction::List => {
            let pets = store.list_pets()?;

            match format {
                OutputFormat::Json => super::print_json(&pets)?,
                OutputFormat::Text => {
                    if pets.is_empty() {
                        println!("No pets yet.");
                        return Ok(());
                    }

                    let today = chrono::Utc::now().date_naive();
                    let mut table = super::new_table();
                    table.set_header(vec!["ID", "Name", "Type", "Birthday", "Age", "Photo"]);
                    for pet in &pets {
                        table.add_row(vec![
                            pet.id().to_string(),
                            super::truncate(&pet.name, 30),
                            pet.pet_type.to_string(),
                            pet.birthday.to_string(),
                            pet.age_in_years(today).to_string(),
                            if pet.has_photo() { "yes" } else { "-" }.to_string(),
                        ]);
                    }
                    println!("{table}");
                    println!("\n{} pet(s).", pets.len());
                }
            }
        }
        PetsAction::Add { name, birthday, pet_type, photo } => {
            let pet_type: PetType = pet_type.parse()?;
            let pet = Pet::new(name, super::parse_date(&birthday)?, pet_type);
            let id = store.insert(pet)?;

            if let Some(source) = photo {
                store.attach_photo(id, &FileAssetLoader::new(), &source).await?;
            }

            let pet = store
                .get::<Pet>(id)?
                .ok_or_else(|| MochError::not_found("pet", id))?;
            match format {
                OutputFormat::Json => super::print_json(&pet)?,
                OutputFormat::Text => {
                    println!(
                        "  {} Added {} ({}) {}",
                        style("OK").green().bold(),
                        style(&pet.name).bold(),
                        pet.pet_type,
                        style(id).dim()
                    );
                }
            }
        }
        PetsAction::Rename { id, name } => {
            let id = super::parse_id(&id)?;
            let pet = store.update::<Pet, _>(id, |p| p.name = name)?;
            match format {
                OutputFormat::Json => super::print_json(&pet)?,
                OutputFormat::Text => {
                    println!("  {} Renamed to {}", style("OK").green().bold(), style(&pet.name).bold());
                }
            }
        }
        PetsAction::Remove { id } => {
            let id = super::parse_id(&id)?;
            let weights = store.list_weight_entries(id, SortDirection::Asc)?.len();
            let reminders = store.list_reminders(&ReminderFilter::all().for_pet(id))?.len();
            let removed = store.delete::<Pet>(id)?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "id": id,
                        "removed": removed,
                        "weightEntriesDeleted": if removed { weights } else { 0 },
                        "remindersDetached": if removed { reminders } else { 0 },
                    }));
                }
                OutputFormat::Text => {
                    if removed {
                        println!("  {} Pet removed.", style("OK").green().bold());
                        println!("  {weights} weight entr{} deleted, {reminders} reminder(s) unassigned.",
                            if weights == 1 { "y" } else { "ies" });
                    } else {
                        println!("  {} No pet with ID {id}.", style("WARN").yellow().bold());
                    }
                }
            }
        }
        PetsAction::Photo { id, file, clear } => {
            let id = super::parse_id(&id)?;
            let pet = match (file, clear) {
                (Some(source), _) => store.attach_photo(id, &FileAssetLoader::new(), &source).await?,
                (None, true) => store.set_photo(id, None)?,
                (None, false) => {
                    return Err(MochError::Validation(
                        "pass --file <path> or --clear".to_string(),
                    ));
                }
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "id": id,
                        "hasPhoto": pet.has_photo(),
                        "bytes": pet.photo.as_ref().map_or(0, |p| p.len()),
                    }));
                }
                OutputFormat::Text => match &pet.photo {
                    Some(bytes) => println!(
                        "  {} Photo set for {} ({})",
                        style("OK").green().bold(),
                        pet.name,
                        super::format_bytes(bytes.len() as u64)
                    ),
                    None => println!("  {} Photo cleared for {}", style("OK").green().bold(), pet.name),
                },
            }
        }
    }

    Ok(())
}
