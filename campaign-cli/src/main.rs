use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use campaign_core::{run, GarrisonRequest, RandomiserSettings, DEFAULT_REBEL_FACTION};

#[derive(Debug, Parser)]
#[command(
    name = "campaign-randomiser",
    version,
    about = "Generates starting garrisons for ownerless campaign settlements"
)]
struct Args {
    /// Directory of per-faction unit templates (one `<faction>.txt` each).
    #[arg(long)]
    templates: PathBuf,

    #[arg(long)]
    seed: u64,

    /// JSON tier table and phase policy; overrides --classic.
    #[arg(long, value_name = "JSON")]
    tiers: Option<PathBuf>,

    /// Use the capped-count tables without generals instead of the
    /// probability curves.
    #[arg(long, default_value_t = false)]
    classic: bool,

    /// Generate a single garrison, e.g. `--garrison greek_cities:city`.
    /// May be given several times.
    #[arg(long = "garrison", value_name = "FACTION:TIER")]
    garrisons: Vec<GarrisonRequest>,

    /// Campaign start script whose rebel settlements get garrisons.
    #[arg(long, value_name = "DESCR_STRAT")]
    strat: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_REBEL_FACTION)]
    rebel_faction: String,

    /// Template used for rebel settlements; defaults to --rebel-faction.
    #[arg(long)]
    template_faction: Option<String>,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// Filter directives for the subscriber: a non-empty `RUST_LOG` wins over
/// the `--debug` default.
fn log_directives(debug: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ if debug => "debug".to_string(),
        _ => "info".to_string(),
    }
}

fn init_logging(debug: bool) {
    let directives = log_directives(debug, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("ignoring invalid log filter '{directives}': {err}");
        EnvFilter::new(if debug { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if args.garrisons.is_empty() && args.strat.is_none() {
        eprintln!("Error: nothing to generate; pass --garrison FACTION:TIER or --strat FILE");
        std::process::exit(1);
    }

    let settings = RandomiserSettings {
        seed: args.seed,
        templates_path: args.templates,
        tiers_path: args.tiers,
        strat_path: args.strat,
        rebel_faction: args.rebel_faction,
        template_faction: args.template_faction,
        requests: args.garrisons,
        classic: args.classic,
    };

    match run(settings) {
        Ok(armies) => print!("{armies}"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
