//! Cycle profile commands.
//!
//! Saving or updating the profile bumps its version and reconciles the
//! reminder schedule right away.

use chrono::Utc;
use clap::Subcommand;
use cyclecare_core::{CycleProfile, ProfileUpdate, ReconciliationReport};

use super::{parse_date, today, CmdResult, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the stored profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the profile
    Set {
        /// First day of the most recent period (YYYY-MM-DD)
        #[arg(long)]
        anchor: String,
        /// Average cycle length in days (defaults to config)
        #[arg(long)]
        cycle_length: Option<u32>,
        /// Average period length in days (defaults to config)
        #[arg(long)]
        period_length: Option<u32>,
        /// Cycles vary in length
        #[arg(long)]
        irregular: bool,
    },
    /// Change individual fields of the stored profile
    Update {
        #[arg(long)]
        anchor: Option<String>,
        #[arg(long)]
        cycle_length: Option<u32>,
        #[arg(long)]
        period_length: Option<u32>,
        /// true or false
        #[arg(long)]
        regular: Option<bool>,
    },
}

pub async fn run(action: ProfileAction) -> CmdResult {
    let ctx = Context::open()?;
    match action {
        ProfileAction::Show { json } => show(&ctx, json).await,
        ProfileAction::Set {
            anchor,
            cycle_length,
            period_length,
            irregular,
        } => {
            let defaults = &ctx.care.config().cycle;
            let profile = CycleProfile::from_onboarding(
                parse_date(Some(anchor.as_str()))?,
                Some(cycle_length.unwrap_or(defaults.default_cycle_length_days)),
                Some(period_length.unwrap_or(defaults.default_period_length_days)),
                !irregular,
            )?;
            let saved = ctx.care.set_profile(profile).await?;
            println!("Profile saved (version {}).", saved.version);
            let report = ctx
                .care
                .reconcile_notifications_at(&saved, today(), Utc::now())
                .await?;
            print_report(&report);
            Ok(())
        }
        ProfileAction::Update {
            anchor,
            cycle_length,
            period_length,
            regular,
        } => {
            let current = ctx.require_profile().await?;
            let update = ProfileUpdate {
                anchor_date: anchor.as_deref().map(|s| parse_date(Some(s))).transpose()?,
                cycle_length_days: cycle_length,
                period_length_days: period_length,
                is_regular: regular,
            };
            let (next, report) = ctx
                .care
                .update_profile(&current, &update, today(), Utc::now())
                .await?;
            match report {
                Some(report) => {
                    println!("Profile updated (version {}).", next.version);
                    print_report(&report);
                }
                None => println!("Nothing to update."),
            }
            Ok(())
        }
    }
}

async fn show(ctx: &Context, json: bool) -> CmdResult {
    let profile = ctx.require_profile().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    println!("Anchor date:    {}", profile.anchor_date);
    println!("Cycle length:   {} days", profile.cycle_length_days);
    println!("Period length:  {} days", profile.period_length_days);
    println!(
        "Regularity:     {}",
        if profile.is_regular { "regular" } else { "irregular" }
    );
    println!("Version:        {}", profile.version);
    Ok(())
}

pub fn print_report(report: &ReconciliationReport) {
    println!("{}", report.message());
    for failed in &report.failed {
        eprintln!("  failed {:?} {}: {}", failed.operation, failed.id, failed.error);
    }
}
