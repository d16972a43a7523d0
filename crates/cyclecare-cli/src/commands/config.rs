//! Config commands. Changes take effect on the next invocation; a change to
//! the cycle constants or reminder settings is applied to live notifications
//! by the next `notify reconcile`.

use clap::Subcommand;
use cyclecare_core::Config;

use super::CmdResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value (e.g. "cycle.luteal_length_days", "reminders.enabled")
    Get { key: String },
    /// Change one value; it is validated before it is saved
    Set { key: String, value: String },
    /// Show every setting
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore the defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            Config::load()?.set(&key, &value)?;
            println!("{key} = {value}");
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config);
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Config reset to defaults.");
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    let cycle = &config.cycle;
    println!("Cycle");
    println!("  Luteal phase:      {} day(s)", cycle.luteal_length_days);
    println!(
        "  Fertile window:    {} day(s) before to {} day(s) after ovulation",
        cycle.fertile_window_lead_days, cycle.fertile_window_tail_days
    );
    println!(
        "  Profile defaults:  {}-day cycle, {}-day period",
        cycle.default_cycle_length_days, cycle.default_period_length_days
    );

    let reminders = &config.reminders;
    println!("Reminders");
    if !reminders.enabled {
        println!("  Disabled");
        return;
    }
    println!("  Fire at:           {:02}:00 local time", reminders.notify_hour);
    println!("  Cycles ahead:      {}", reminders.forecast_cycles);
    println!(
        "  Early warning:     {} day(s) ahead for irregular cycles",
        reminders.irregular_lead_days
    );
}
