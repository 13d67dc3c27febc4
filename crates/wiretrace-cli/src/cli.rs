use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wiretrace")]
#[command(version, about = "Incremental wiring-graph tracking and scoring for trainer switchboards")]
pub struct Cli {
    /// Connectivity state file
    #[arg(
        long,
        global = true,
        env = "WIRETRACE_STATE",
        default_value = "data/connectivity.json"
    )]
    pub state: PathBuf,

    /// Score ledger file
    #[arg(
        long,
        global = true,
        env = "WIRETRACE_LEDGER",
        default_value = "data/ledger.json"
    )]
    pub ledger: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one detection cycle from two snapshot files
    Cycle(CycleArgs),
    /// Show the current connected components
    Components,
    /// Show the score ledger
    Score,
    /// Re-verify the query graph against the reference store
    Verify(VerifyArgs),
    /// Close the current scoring session
    Reset(ResetArgs),
}

#[derive(Args, Debug)]
pub struct CycleArgs {
    /// Previous snapshot (`name,state` CSV, or a .json object map)
    pub old: PathBuf,

    /// Current snapshot
    pub new: PathBuf,

    /// Rule catalog file (catalog-backed matching)
    #[arg(long, env = "WIRETRACE_RULES")]
    pub rules: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Score granted per store-verified component
    #[arg(long, default_value = "5.0")]
    pub match_score: f64,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Also list the reference store's own components
    #[arg(long)]
    pub show_store: bool,
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Reference graph store base URL (store-backed matching)
    #[arg(long, env = "WIRETRACE_STORE_URL")]
    pub store_url: Option<String>,

    /// Node label namespace on the store
    #[arg(long, env = "WIRETRACE_STORE_LABEL", default_value = "terminal")]
    pub label: String,

    /// Store request timeout in seconds
    #[arg(long, default_value = "5")]
    pub store_timeout: u64,

    /// Query-graph edge log (store-backed matching)
    #[arg(
        long,
        env = "WIRETRACE_EDGES",
        default_value = "data/query_edges.json"
    )]
    pub edges: PathBuf,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Also wipe connectivity state and the query-graph edge log
    #[arg(long)]
    pub hard: bool,

    /// Query-graph edge log to clear with --hard
    #[arg(
        long,
        env = "WIRETRACE_EDGES",
        default_value = "data/query_edges.json"
    )]
    pub edges: PathBuf,
}
