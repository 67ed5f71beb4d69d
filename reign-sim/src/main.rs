use anyhow::{bail, Result};
use clap::Parser;
use reign_core::{
    Approach, EventLogObserver, InstanceStatus, OutcomePipeline, OutcomeTier, SeededRoller,
    Selection, StateStore,
};
use std::path::PathBuf;
use std::sync::Arc;

mod loader;

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve one kingdom event end to end", long_about = None)]
struct Args {
    /// Event catalog (JSON)
    #[arg(long)]
    catalog: PathBuf,

    /// Kingdom state (JSON)
    #[arg(long)]
    kingdom: PathBuf,

    /// Event id to trigger
    #[arg(short, long)]
    event: String,

    /// Approach for events that offer one (virtuous, practical, ruthless)
    #[arg(short, long)]
    approach: Option<Approach>,

    /// Skill check result (critical-success, success, failure, critical-failure)
    #[arg(short, long)]
    outcome: OutcomeTier,

    /// Hex to pick when the outcome asks for a selection (repeatable)
    #[arg(long = "select-hex")]
    select_hex: Vec<String>,

    /// Seed for all dice rolls
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Turns to advance after resolving, applying ongoing modifiers
    #[arg(long, default_value_t = 0)]
    advance_turns: u32,

    /// Resolution config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final kingdom state here (JSON)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Append the resolution archive here (JSONL)
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting reign-sim...");

    let catalog = loader::load_catalog(&args.catalog)?;
    let kingdom = loader::load_kingdom(&args.kingdom)?;
    let config = loader::load_config(args.config.as_deref())?;
    let turn = kingdom.turn;

    let store = Arc::new(StateStore::new(kingdom));
    let mut pipeline = OutcomePipeline::with_defaults(Arc::new(catalog), store.clone(), config)?;
    if let Some(path) = &args.event_log {
        pipeline.register_observer(Box::new(EventLogObserver::file(path)?));
    }
    let mut dice = SeededRoller::new(args.seed);

    let mut instance = pipeline.trigger(&args.event, turn)?;
    if instance.status() == InstanceStatus::Created {
        let Some(approach) = args.approach else {
            bail!("Event '{}' needs --approach", args.event);
        };
        pipeline.select_approach(&mut instance, approach)?;
    } else if let Some(approach) = args.approach {
        log::warn!("Event '{}' has no approaches; ignoring {}", args.event, approach);
    }
    pipeline.record_outcome(&mut instance, args.outcome)?;

    let mut preview = pipeline.preview(&mut instance, &mut dice)?;
    if preview.interaction.is_some() && !args.select_hex.is_empty() {
        let selection = Selection::hexes(args.select_hex.iter().cloned());
        preview = pipeline.submit_selection(&mut instance, &selection, &mut dice)?;
    }

    println!("{} ({} on turn {})", args.event, args.outcome, turn);
    for badge in &preview.badges {
        println!("  {badge}");
    }
    for warning in &preview.warnings {
        println!("  ! {warning}");
    }

    if instance.status() == InstanceStatus::InteractionPending {
        if let Some(request) = &preview.interaction {
            println!(
                "Awaiting selection: {} (up to {}; pass --select-hex)",
                request.spec.title, request.spec.count
            );
        }
        println!("Status: {}", instance.status());
        return Ok(());
    }

    let report = pipeline.execute(&mut instance)?;
    for failure in &report.failures {
        println!("  x {} failed: {}", failure.kind, failure.reason);
    }
    if let Some(id) = report.modifier {
        println!("  Registered {id}");
    }
    println!("Status: {}", report.status);

    for _ in 0..args.advance_turns {
        let applied = pipeline.advance_turn(&mut dice)?;
        let turn = store.snapshot().turn;
        for entry in &applied {
            println!(
                "Turn {}: {} {:+} {}{}",
                turn,
                entry.name,
                entry.applied,
                entry.resource,
                if entry.expired { " (expired)" } else { "" }
            );
        }
    }

    if let Some(path) = &args.output {
        let snapshot = store.snapshot();
        let json = serde_json::to_string_pretty(&*snapshot.state)?;
        std::fs::write(path, json)?;
        log::info!("Wrote kingdom state to {:?}", path);
    }

    log::info!("Finished at revision {}", store.revision());
    Ok(())
}
