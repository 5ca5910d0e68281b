//! Travel Ledger - Audit Jobs Binary
//!
//! Runs the balance and completeness audits against the configured store
//! and prints a plain summary.
//!
//! # Usage
//!
//! ```bash
//! # Check every voucher satisfies the balance invariant
//! ledger-audit balance
//!
//! # Check that bookings and visas all produced vouchers
//! ledger-audit completeness --source-type booking --source-type visa
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LEDGER_TIMEZONE` - IANA business timezone (default: UTC)
//! * `LEDGER_COUNTER_SHARDS` - shards per counter (default: 32)
//! * `LEDGER_REPAIR_POLICY` - two_leg_averaging or flag_only
//!
//! # Exit Codes
//!
//! * `0` - audit completed, nothing needs manual attention
//! * `1` - one or more vouchers flagged for manual review
//! * `2` - unrecoverable store error

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::{AccountRegistry, SourceType};
use interface_cli::{AppContext, LedgerConfig};

#[derive(Parser)]
#[command(name = "ledger-audit", about = "Audit jobs for the travel ledger", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find unbalanced vouchers and repair the unambiguous ones
    Balance,
    /// Find business records that never produced a voucher
    Completeness {
        /// Source collections to check; defaults to booking, visa,
        /// subscription, expense, segment
        #[arg(long = "source-type", value_name = "TYPE")]
        source_types: Vec<String>,
    },
}

const EXIT_FLAGGED: i32 = 1;
const EXIT_STORE_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    // Load .env if present (useful for local development)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let config = match LedgerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            return EXIT_STORE_ERROR;
        }
    };

    init_tracing(&config.log_level);

    let context = match AppContext::new(&config, AccountRegistry::standard()) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("wiring error: {}", err);
            return EXIT_STORE_ERROR;
        }
    };

    match cli.command {
        Command::Balance => run_balance(&context).await,
        Command::Completeness { source_types } => {
            run_completeness(&context, source_types).await
        }
    }
}

async fn run_balance(context: &AppContext) -> i32 {
    match context.audit.run_balance_audit().await {
        Ok(report) => {
            println!(
                "balance audit: checked={} fixed={} flagged={}",
                report.checked,
                report.fixed,
                report.flagged.len()
            );
            for flagged in &report.flagged {
                println!(
                    "  needs review: {} delta={} legs={} ({})",
                    flagged.voucher_id, flagged.delta, flagged.legs, flagged.reason
                );
            }
            if report.has_flags() {
                EXIT_FLAGGED
            } else {
                0
            }
        }
        Err(err) => {
            eprintln!("balance audit aborted: {}", err);
            EXIT_STORE_ERROR
        }
    }
}

async fn run_completeness(context: &AppContext, raw_types: Vec<String>) -> i32 {
    let source_types = if raw_types.is_empty() {
        vec![
            SourceType::Booking,
            SourceType::Visa,
            SourceType::Subscription,
            SourceType::Expense,
            SourceType::Segment,
        ]
    } else {
        let mut parsed = Vec::with_capacity(raw_types.len());
        for raw in &raw_types {
            match raw.parse::<SourceType>() {
                Ok(source_type) => parsed.push(source_type),
                Err(err) => {
                    eprintln!("{}", err);
                    return EXIT_STORE_ERROR;
                }
            }
        }
        parsed
    };

    match context.audit.run_completeness_audit(&source_types).await {
        Ok(report) => {
            println!(
                "completeness audit: checked={} created={}",
                report.checked, report.created
            );
            0
        }
        Err(err) => {
            eprintln!("completeness audit aborted: {}", err);
            EXIT_STORE_ERROR
        }
    }
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
