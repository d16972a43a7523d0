//! Subscription commands.
//!
//! A tier change alters which reminders are allowed, so commands that change
//! the subscription reconcile notifications afterwards when a profile exists.

use chrono::Utc;
use clap::Subcommand;
use cyclecare_core::Tier;

use super::profile::print_report;
use super::{today, CmdResult, Context};

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// Show the current subscription
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Subscribe to a tier (free, premium, premium-plus)
    Subscribe {
        tier: Tier,
        /// Length of the paid period in months
        #[arg(long, default_value_t = 1)]
        months: u32,
        #[arg(long)]
        payment_method: Option<String>,
        /// Do not renew automatically
        #[arg(long)]
        no_auto_renew: bool,
    },
    /// Stop renewal; access continues until the end date
    Cancel,
    /// Rewrite an expired subscription to the free tier
    Normalize,
    /// Check whether a feature is available
    Check {
        /// Feature id (e.g. "ovulation_reminder")
        feature: String,
    },
    /// List features available on the current subscription
    Features,
}

pub async fn run(action: SubscriptionAction) -> CmdResult {
    let ctx = Context::open()?;
    let now = Utc::now();
    match action {
        SubscriptionAction::Show { json } => {
            let status = ctx.care.subscriptions().load().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }
            println!("Tier:        {}", status.tier);
            println!("Effective:   {}", status.effective_tier(now));
            if let Some(end) = status.end_date {
                println!("Ends:        {}", end.format("%Y-%m-%d"));
                if let Some(days) = status.days_remaining(now) {
                    println!("Remaining:   {days} day(s)");
                }
            }
            println!("Auto-renew:  {}", if status.auto_renew { "on" } else { "off" });
        }
        SubscriptionAction::Subscribe {
            tier,
            months,
            payment_method,
            no_auto_renew,
        } => {
            let status = ctx
                .care
                .subscribe(tier, months, !no_auto_renew, payment_method, now)
                .await?;
            match status.end_date {
                Some(end) => println!("Subscribed to {} until {}.", status.tier, end.format("%Y-%m-%d")),
                None => println!("Subscribed to {}.", status.tier),
            }
            refresh_notifications(&ctx).await?;
        }
        SubscriptionAction::Cancel => {
            let status = ctx.care.cancel_subscription(now).await?;
            match status.end_date {
                Some(end) if status.tier.is_paid() => println!(
                    "Renewal cancelled. {} access continues until {}.",
                    status.tier,
                    end.format("%Y-%m-%d")
                ),
                _ => println!("Subscription cancelled. You are on the {} tier.", status.tier),
            }
            refresh_notifications(&ctx).await?;
        }
        SubscriptionAction::Normalize => {
            if ctx.care.normalize_subscription(now).await? {
                println!("Expired subscription reset to {}.", Tier::Free);
                refresh_notifications(&ctx).await?;
            } else {
                println!("Subscription is current.");
            }
        }
        SubscriptionAction::Check { feature } => {
            if !ctx.care.gate().policy().contains(&feature) {
                return Err(format!("unknown feature: {feature}").into());
            }
            let allowed = ctx.care.has_feature_access_at(&feature, now).await;
            println!("{feature}: {}", if allowed { "allowed" } else { "denied" });
        }
        SubscriptionAction::Features => {
            let status = ctx.care.subscriptions().load().await;
            for feature in ctx.care.gate().accessible_features(&status, now) {
                println!("{feature}");
            }
        }
    }
    Ok(())
}

async fn refresh_notifications(ctx: &Context) -> CmdResult {
    if let Some(profile) = ctx.care.load_profile().await? {
        let report = ctx
            .care
            .reconcile_notifications_at(&profile, today(), Utc::now())
            .await?;
        if !report.is_noop() {
            print_report(&report);
        }
    }
    Ok(())
}
