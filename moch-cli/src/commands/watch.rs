//! Interactive session that prints change events.
//!
//! The change bus lives in-process, so `watch` keeps one store open and reads
//! commands from stdin (`pets add Mochi -b 2021-03-01`, `weights list <id>`,
//! ...). After each command it prints the change events the command produced,
//! filtered by the requested scope.

use clap::{Parser, ValueEnum};
use console::style;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use moch_core::error::{MochError, MochResult};
use moch_models::EntityKind;
use moch_services::{ChangeEvent, Operation, Scope};

use super::{Session, StoreCommand};
use crate::OutputFormat;

/// Entity kinds selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Pet,
    Reminder,
    Weight,
    Config,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Pet => EntityKind::Pet,
            KindArg::Reminder => EntityKind::Reminder,
            KindArg::Weight => EntityKind::WeightEntry,
            KindArg::Config => EntityKind::AppConfiguration,
        }
    }
}

/// One line typed into the session.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: StoreCommand,
}

pub async fn run(
    session: &Session,
    pet: Option<String>,
    kind: Option<KindArg>,
    format: OutputFormat,
) -> MochResult<()> {
    let mut scope = match pet {
        Some(pet) => Scope::pet(super::parse_id(&pet)?),
        None => Scope::all(),
    };
    if let Some(kind) = kind {
        scope = scope.of_kind(kind.into());
    }

    let (subscription, mut events) = session.store.bus().subscribe_channel(scope);
    println!(
        "{} Type a command (e.g. {}), {} to quit.",
        style("Watching for changes.").bold(),
        style("pets list").cyan(),
        style("exit").cyan()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"moch> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let args = match split_args(line) {
            Ok(args) => args,
            Err(e) => {
                eprintln!("{} {e}", style("error:").red().bold());
                continue;
            }
        };
        match SessionLine::try_parse_from(args) {
            Ok(parsed) => {
                if let Err(e) = super::execute(session, parsed.command, format).await {
                    eprintln!("{} {e}", style("error:").red().bold());
                }
            }
            Err(e) => {
                // clap renders help and usage errors itself
                let _ = e.print();
            }
        }
        drain(&mut events, format)?;
    }

    subscription.release();
    Ok(())
}

fn drain(events: &mut UnboundedReceiver<ChangeEvent>, format: OutputFormat) -> MochResult<()> {
    while let Ok(event) = events.try_recv() {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
            OutputFormat::Text => {
                let marker = match event.operation {
                    Operation::Created => style("+").green().bold(),
                    Operation::Updated => style("~").yellow().bold(),
                    Operation::Deleted => style("-").red().bold(),
                };
                println!("  {marker} {event}");
            }
        }
    }
    Ok(())
}

/// Split a session line into arguments with POSIX shell quoting rules.
fn split_args(line: &str) -> MochResult<Vec<String>> {
    shell_words::split(line).map_err(|e| MochError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args_quotes() {
        assert_eq!(
            split_args(r#"reminders add "Rabies booster" --at 2024-06-01"#).unwrap(),
            vec!["reminders", "add", "Rabies booster", "--at", "2024-06-01"]
        );
        assert_eq!(split_args("pets  list ").unwrap(), vec!["pets", "list"]);
        assert_eq!(split_args(r#"a '' b"#).unwrap(), vec!["a", "", "b"]);
        assert_eq!(split_args(r"it\'s").unwrap(), vec!["it's"]);
        assert!(split_args(r#"pets add "Mochi"#).is_err());
        assert_eq!(
            split_args(r#"pets rename abc "Sir \"Mochi\"""#).unwrap(),
            vec!["pets", "rename", "abc", r#"Sir "Mochi""#]
        );
    }

    #[test]
    fn test_session_line_parses_store_commands() {
        assert!(SessionLine::try_parse_from(["pets", "list"]).is_ok());
        assert!(SessionLine::try_parse_from(["weights", "summary", "abc"]).is_ok());
        assert!(SessionLine::try_parse_from(["watch"]).is_err());
    }
}
