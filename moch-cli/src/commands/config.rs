//! In-app preference commands.

use clap::Subcommand;
use console::style;

use moch_core::error::MochResult;
use moch_models::AppConfiguration;
use moch_services::progress::lead_time_description;

use super::Session;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current preferences.
    Show,
    /// Change one or more preferences.
    Set {
        /// Enable or disable reminder notifications.
        #[arg(long)]
        notifications: Option<bool>,
        /// Default reminder lead time in hours (1-168).
        #[arg(long)]
        lead_time: Option<f64>,
        /// Show times on a 24-hour clock.
        #[arg(long)]
        clock_24h: Option<bool>,
    },
    /// Restore the default preferences.
    Reset,
}

pub async fn run(session: &Session, action: ConfigAction, format: OutputFormat) -> MochResult<()> {
    let store = &session.store;

    let config = match action {
        ConfigAction::Show => store.ensure_configuration()?,
        ConfigAction::Set { notifications, lead_time, clock_24h } => {
            store.update_configuration(|c| {
                if let Some(enabled) = notifications {
                    c.notifications_enabled = enabled;
                }
                if let Some(hours) = lead_time {
                    c.default_lead_time_in_hours = hours;
                }
                if let Some(clock) = clock_24h {
                    c.use_24_hour_clock = clock;
                }
            })?
        }
        ConfigAction::Reset => store.reset_configuration()?,
    };

    match format {
        OutputFormat::Json => super::print_json(&config)?,
        OutputFormat::Text => print_text(&config),
    }
    Ok(())
}

fn print_text(config: &AppConfiguration) {
    let on_off = |v: bool| if v { style("on").green() } else { style("off").dim() };

    println!("{}", style("Preferences").bold().underlined());
    println!("  Notifications:   {}", on_off(config.notifications_enabled));
    println!(
        "  Lead time:       {} h  ({})",
        config.default_lead_time_in_hours,
        lead_time_description(config.default_lead_time_in_hours)
    );
    println!("  24-hour clock:   {}", on_off(config.use_24_hour_clock));
    if config.is_default() {
        println!("  {}", style("(defaults)").dim());
    }
}
