//! Database management commands.

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;

use moch_core::error::{MochError, MochResult};

use super::Session;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Reset the database (WARNING: destroys all data).
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the database file path.
    Path,
}

pub async fn run(session: &Session, action: DbAction, format: OutputFormat) -> MochResult<()> {
    let db = session.store.database();
    let db_path = &session.db_path;

    match action {
        DbAction::Stats => {
            let stats = db.stats()?;

            let file_size = std::fs::metadata(db_path).ok().map(|m| m.len());
            let wal_path = db_path.with_extension("db-wal");
            let wal_size = std::fs::metadata(&wal_path).ok().map(|m| m.len());

            let conn = db.conn()?;
            let journal_mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_else(|_| "unknown".to_string());

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "path": db_path.display().to_string(),
                        "tables": stats,
                        "file_size_bytes": file_size,
                        "wal_size_bytes": wal_size,
                        "journal_mode": journal_mode,
                    }));
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:          {}", db_path.display());
                    println!("  Journal mode:  {}", journal_mode);
                    println!();

                    let mut table = super::new_table();
                    table.set_header(vec!["Table", "Row Count"]);
                    table.add_row(vec!["pets".to_string(), stats.pets.to_string()]);
                    table.add_row(vec!["pet_photos".to_string(), stats.photos.to_string()]);
                    table.add_row(vec!["reminders".to_string(), stats.reminders.to_string()]);
                    table.add_row(vec!["weight_entries".to_string(), stats.weight_entries.to_string()]);
                    table.add_row(vec!["app_configuration".to_string(), stats.configurations.to_string()]);
                    println!("{table}");

                    let total = file_size.unwrap_or(0) + wal_size.unwrap_or(0);
                    if total > 0 {
                        println!();
                        println!("  On disk:       {}", super::format_bytes(total));
                    }
                }
            }
        }
        DbAction::Check => {
            let conn = db.conn()?;
            let integrity = db.run_integrity_check();

            let mut stmt = conn
                .prepare("PRAGMA foreign_key_check")
                .map_err(|e| MochError::Storage(e.to_string()))?;
            let fk_violations: Vec<String> = stmt
                .query_map([], |row| {
                    let table: String = row.get(0)?;
                    let rowid: i64 = row.get(1)?;
                    let parent: String = row.get(2)?;
                    Ok(format!("{table} row {rowid} -> {parent}"))
                })
                .map_err(|e| MochError::Storage(e.to_string()))?
                .filter_map(|r| r.ok())
                .collect();

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "integrity_ok": integrity.is_ok(),
                        "integrity_error": integrity.as_ref().err().map(|e| e.to_string()),
                        "foreign_key_violations": fk_violations,
                    }));
                }
                OutputFormat::Text => {
                    match &integrity {
                        Ok(()) => println!("  {} Integrity check passed.", style("OK").green().bold()),
                        Err(e) => println!("  {} Integrity check failed: {e}", style("FAIL").red().bold()),
                    }
                    if fk_violations.is_empty() {
                        println!("  {} Foreign key constraints OK.", style("OK").green().bold());
                    } else {
                        println!(
                            "  {} {} foreign key violation(s):",
                            style("WARN").yellow().bold(),
                            fk_violations.len()
                        );
                        for v in fk_violations.iter().take(10) {
                            println!("    - {v}");
                        }
                        if fk_violations.len() > 10 {
                            println!("    ... and {} more", fk_violations.len() - 10);
                        }
                    }
                }
            }
        }
        DbAction::Reset { yes } => {
            if !yes {
                println!(
                    "  {} This will delete ALL pets, reminders and weight history.",
                    style("WARNING").red().bold()
                );
                println!("  Database: {}", db_path.display());

                let confirmed = Confirm::new()
                    .with_prompt("  Are you sure you want to reset the database?")
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirmed {
                    println!("  Reset cancelled.");
                    return Ok(());
                }
            }

            db.reset()?;
            println!("  {} Database reset complete.", style("OK").green().bold());
        }
        DbAction::Path => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"path": db_path.display().to_string()}));
            }
            OutputFormat::Text => println!("{}", db_path.display()),
        },
    }

    Ok(())
}
