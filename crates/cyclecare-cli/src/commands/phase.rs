use chrono::Duration;
use clap::Args;

use super::{parse_date, CmdResult, Context};

#[derive(Args)]
pub struct PhaseArgs {
    /// Date to look up (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PhaseArgs) -> CmdResult {
    let ctx = Context::open()?;
    let profile = ctx.require_profile().await?;
    let date = parse_date(args.date.as_deref())?;
    let model = ctx.care.model();

    let (day, phase) = ctx.care.get_current_phase(&profile, date)?;
    let days_until = model.days_until_next_period(&profile, date)?;
    let next_period = date + Duration::days(i64::from(days_until));
    let (fertile_start, fertile_end) = model.fertile_window(&profile, date)?;

    if args.json {
        let value = serde_json::json!({
            "date": date,
            "cycle_day": day.get(),
            "phase": phase,
            "days_until_next_period": days_until,
            "next_period_start": next_period,
            "fertile_window": { "start": fertile_start, "end": fertile_end },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{date}: cycle day {day} ({phase})");
    println!("Next period in {days_until} day(s)");
    println!("Fertile window this cycle: {fertile_start} to {fertile_end}");
    Ok(())
}
