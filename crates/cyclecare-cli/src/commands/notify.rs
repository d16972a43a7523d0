//! Reminder notification commands.
//!
//! Notifications land in the outbox file (`notifications.json` in the data
//! directory), which stands in for a platform notification center.

use chrono::Utc;
use clap::Subcommand;

use super::profile::print_report;
use super::{today, CmdResult, Context};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Bring scheduled reminders in line with the profile and subscription
    Reconcile,
    /// List reminders currently in the outbox
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-attempt operations left over from an incomplete reconciliation
    Retry,
    /// Cancel every scheduled reminder
    Clear,
}

pub async fn run(action: NotifyAction) -> CmdResult {
    let ctx = Context::open()?;
    match action {
        NotifyAction::Reconcile => {
            let profile = ctx.require_profile().await?;
            let report = ctx
                .care
                .reconcile_notifications_at(&profile, today(), Utc::now())
                .await?;
            print_report(&report);
        }
        NotifyAction::List { json } => {
            let live = ctx.outbox.live();
            if json {
                println!("{}", serde_json::to_string_pretty(&live)?);
                return Ok(());
            }
            if live.is_empty() {
                println!("No reminders scheduled.");
            }
            for n in &live {
                println!("{}  {}  {}", n.trigger_at.format("%Y-%m-%d %H:%M"), n.id, n.payload.title);
            }
        }
        NotifyAction::Retry => {
            // A same-version pass only touches what is missing or stale.
            let profile = ctx.require_profile().await?;
            let report = ctx
                .care
                .reconcile_notifications_at(&profile, today(), Utc::now())
                .await?;
            if report.is_noop() {
                println!("Nothing to retry.");
            } else {
                print_report(&report);
            }
        }
        NotifyAction::Clear => {
            let report = ctx.care.scheduler().cancel_all().await?;
            println!("Cancelled {} reminder(s).", report.cancelled.len());
        }
    }
    Ok(())
}
