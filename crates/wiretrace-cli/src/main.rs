mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands, CycleArgs, ResetArgs, StoreArgs, VerifyArgs};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use wiretrace_core::{
    snapshot, verify, CatalogMatcher, ConnectivityTracker, HttpGraphStore, Matcher, RuleCatalog,
    ScoreLedger, Session, SessionPaths, Snapshot, StoreMatcher, TopologyVerifier, WiringEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Cycle(args) => cmd_cycle(&cli.state, &cli.ledger, args).await,
        Commands::Components => cmd_components(&cli.state),
        Commands::Score => cmd_score(&cli.ledger),
        Commands::Verify(args) => cmd_verify(args).await,
        Commands::Reset(args) => cmd_reset(&cli.state, &cli.ledger, args),
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let snapshot = if path.extension().is_some_and(|ext| ext == "json") {
        snapshot::from_json_path(path)
    } else {
        snapshot::from_csv_path(path)
    };
    snapshot.with_context(|| format!("loading snapshot {}", path.display()))
}

fn http_store(store: &StoreArgs, url: &str) -> anyhow::Result<HttpGraphStore> {
    Ok(HttpGraphStore::with_timeout(
        url,
        store.label.clone(),
        Duration::from_secs(store.store_timeout),
    )?)
}

async fn cmd_cycle(state: &Path, ledger: &Path, args: CycleArgs) -> anyhow::Result<()> {
    let old = load_snapshot(&args.old)?;
    let new = load_snapshot(&args.new)?;

    let matcher: Box<dyn Matcher> = match (&args.store.store_url, &args.rules) {
        (Some(url), _) => {
            info!("matching against reference store at {url}");
            Box::new(StoreMatcher::open(
                http_store(&args.store, url)?,
                args.match_score,
                args.store.edges.clone(),
            )?)
        }
        (None, Some(rules)) => {
            let catalog = RuleCatalog::load_from_file(rules)
                .with_context(|| format!("loading rule catalog {}", rules.display()))?;
            info!("matching against {} catalog rules", catalog.len());
            Box::new(CatalogMatcher::new(catalog))
        }
        (None, None) => bail!("either --rules or --store-url is required"),
    };

    let paths = SessionPaths {
        connectivity: state.to_path_buf(),
        ledger: ledger.to_path_buf(),
    };
    let mut session = Session::open(paths, matcher)?;
    let report = session.process_cycle(&old, &new).await?;

    match &report.event {
        WiringEvent::Add(a, b) => println!("connected: {a} and {b}"),
        WiringEvent::Remove(a, b) => println!("disconnected: {a} and {b}"),
        WiringEvent::NoChange => println!("no wiring change detected"),
        WiringEvent::Ambiguous => println!("ambiguous wiring step, cycle skipped"),
    }
    if report.needs_review {
        warn!(
            "deletion candidates {:?} arrived alongside an add event; review the detection window",
            report.deletions
        );
    }
    print_components(&report.components);
    if let Some(matches) = &report.match_report {
        for m in &matches.matches {
            match m.rule_id {
                Some(id) => println!("matched rule {id} (+{}): {:?}", m.score, m.nodes),
                None => println!("verified against store (+{}): {:?}", m.score, m.nodes),
            }
        }
        if matches.unavailable > 0 {
            warn!(
                "{} component(s) unverifiable: reference store unavailable",
                matches.unavailable
            );
        }
        println!(
            "total score: {} ({:+} this cycle)",
            session.ledger().total(),
            report.score_delta
        );
    }
    Ok(())
}

fn cmd_components(state: &Path) -> anyhow::Result<()> {
    let tracker = ConnectivityTracker::load_from_file(state)?;
    print_components(&tracker.all_components());
    Ok(())
}

fn cmd_score(ledger: &Path) -> anyhow::Result<()> {
    let ledger = ScoreLedger::load_from_file(ledger)?;
    println!("total score: {}", ledger.total());
    println!("session score: {}", ledger.session_score());
    for record in ledger.results() {
        println!(
            "  {} {} — {} (+{})",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.terminal_a,
            record.terminal_b,
            record.score
        );
    }
    if !ledger.history().is_empty() {
        println!("closed sessions: {}", ledger.history().len());
    }
    Ok(())
}

async fn cmd_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let Some(url) = &args.store.store_url else {
        bail!("--store-url is required for verify");
    };
    let store = http_store(&args.store, url)?;
    let verifier = TopologyVerifier::load_from_file(store, &args.store.edges)?;

    let report = verifier.verify_all().await?;
    println!(
        "{} matched, {} unmatched, {} unavailable",
        report.matched.len(),
        report.unmatched.len(),
        report.unavailable.len()
    );
    for component in &report.matched {
        println!("  matched: {component:?}");
    }
    for component in &report.unmatched {
        println!("  unmatched: {component:?}");
    }
    for component in &report.unavailable {
        println!("  store unavailable: {component:?}");
    }

    if args.show_store {
        let components = verifier.store_components().await?;
        println!("reference store has {} component(s):", components.len());
        for component in components {
            println!("  {component:?}");
        }
    }
    Ok(())
}

fn cmd_reset(state: &Path, ledger_path: &Path, args: ResetArgs) -> anyhow::Result<()> {
    let mut ledger = ScoreLedger::load_from_file(ledger_path)?;
    ledger.reset_session();
    ledger.save_to_file(ledger_path)?;
    info!("session closed and archived");

    if args.hard {
        ConnectivityTracker::new().save_to_file(state)?;
        verify::reset_edge_log(&args.edges)?;
        let mut ledger = ScoreLedger::load_from_file(ledger_path)?;
        ledger.reset();
        ledger.save_to_file(ledger_path)?;
        info!("connectivity state, edge log, and totals cleared");
    }
    Ok(())
}

fn print_components(components: &[Vec<String>]) {
    if components.is_empty() {
        println!("no tracked components");
        return;
    }
    println!("current components:");
    for (idx, component) in components.iter().enumerate() {
        println!("  {}: {component:?}", idx + 1);
    }
}
