use std::sync::{

    atomic::{

        AtomicBool,
        Ordering,
    },

    Arc,
};

use anyhow::{Context, Result};
use clap::{Parser};

use hopwalk::{

    Termination,
    HopRecord,
    Outcome,
    Target,
    Walker,
};

mod cli;

use cli::{Args};

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level())),
        )
        .init();

    println!("hopwalk v{}", env!("CARGO_PKG_VERSION"));

    let settings = args.settings();
    settings.validate().context("Invalid options")?;

    let target = Target::resolve(&args.target, settings.family)
        .with_context(|| format!("Unable to resolve {}", args.target))?;

    if target.was_resolved() {
        println!("Resolved {} as {}.\n", target.display(), target);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let walker = Walker::open(target, settings)
        .context("Failed to open raw ICMP socket (root or CAP_NET_RAW required)")?
        .with_cancel(cancel);

    let trace = walker.run(|record| println!("{}", format_record(record)));

    match trace.termination {
        Termination::DestinationReached => {
            println!("\nReached {} in {} hops.", trace.target, trace.records.len())
        }
        Termination::MaxHopsExceeded => {
            println!("\nGave up on {} after {} hops.", trace.target, trace.records.len())
        }
        Termination::Cancelled => println!("\nCancelled."),
    }

    Ok(())
}

fn format_record(record: &HopRecord) -> String {
    let outcome = record.outcome();

    let responder = outcome
        .responder()
        .map(|address| address.to_string())
        .unwrap_or_else(|| "*".to_string());

    let elapsed = match outcome {
        Outcome::HopReply { rtt, .. } | Outcome::DestinationReply { rtt, .. } => format!("{:.3?}", rtt),
        Outcome::Timeout | Outcome::ParseError => "Request timed out.".to_string(),
    };

    format!("{}\t{},\telapsed: {}", record.ttl(), responder, elapsed)
}
