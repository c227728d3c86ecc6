//! # Maintenance Utility
//!
//! Operator commands run against the configured database, usually from cron.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --package maintenance -- purge
//! cargo run --package maintenance -- process-jobs 50
//! cargo run --package maintenance -- promote <wallet_address> admin
//! ```
//!
//! - `purge`: drop expired cache entries, sessions expired or revoked more than
//!   30 days ago and completed jobs older than 7 days; expire overdue vouchers
//! - `process-jobs [max]`: retry queued email/SMS deliveries (default 100)
//! - `promote <wallet> <role>`: bootstrap a staff account

mod commands;

use chrono::Utc;
use lib_core::model::store::enums::Role;
use lib_core::{create_pool, migrate, Config};
use lib_integrations::{Integrations, IntegrationsConfig};

const USAGE: &str = "usage: maintenance <purge | process-jobs [max] | promote <wallet_address> <role>>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        anyhow::bail!(USAGE);
    };

    println!("============================================");
    println!("  ReliefLedger Maintenance: {}", command);
    println!("============================================");

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    println!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;
    migrate(&pool).await?;

    match command.as_str() {
        "purge" => {
            let report = commands::purge(&pool, Utc::now()).await?;
            println!("Expired cache entries removed: {}", report.cache_entries);
            println!("Stale sessions removed:        {}", report.sessions);
            println!("Vouchers marked expired:       {}", report.vouchers_expired);
            println!("Completed jobs removed:        {}", report.jobs);
        }
        "process-jobs" => {
            let max = match args.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("max must be a positive integer, got '{}'", raw))?,
                None => commands::DEFAULT_JOB_BATCH,
            };
            let integrations_config = IntegrationsConfig::from_env()?;
            let integrations = Integrations::from_config(&integrations_config)?;

            let summary = commands::process_jobs(&pool, integrations, max).await?;
            println!(
                "Processed {} job(s): {} completed, {} retried, {} failed",
                summary.processed, summary.completed, summary.retried, summary.failed
            );
        }
        "promote" => {
            let (Some(wallet), Some(role)) = (args.get(1), args.get(2)) else {
                anyhow::bail!(USAGE);
            };
            let role: Role = role.parse()?;

            let user = commands::promote(&pool, wallet, role).await?;
            println!("User {} ({}) is now {}", user.id, user.wallet_address, user.role);
        }
        other => anyhow::bail!("Unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}
