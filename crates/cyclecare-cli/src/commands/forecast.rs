use clap::Args;
use cyclecare_core::{Confidence, PredictedEvent};

use super::{parse_date, CmdResult, Context};

#[derive(Args)]
pub struct ForecastArgs {
    /// Number of cycles to forecast (defaults to config)
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Forecast from this date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub from: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ForecastArgs) -> CmdResult {
    let ctx = Context::open()?;
    let profile = ctx.require_profile().await?;
    let from = parse_date(args.from.as_deref())?;
    let cycles = args
        .cycles
        .unwrap_or(ctx.care.config().reminders.forecast_cycles);

    let events: Vec<PredictedEvent> = ctx
        .care
        .get_upcoming_events(&profile, from, cycles)?
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if !profile.is_regular {
        println!("Cycles marked irregular: dates are estimates.");
    }
    for event in &events {
        let marker = match event.confidence {
            Confidence::Regular => "",
            Confidence::EstimatedIrregular => " (estimated)",
        };
        println!(
            "{}  cycle {}  {}{}",
            event.date,
            event.cycle_index,
            event.event_type.label(),
            marker
        );
    }
    Ok(())
}
