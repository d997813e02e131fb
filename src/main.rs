use anyhow::{Context, Result};
use birthplace_coords::config::Config;
use birthplace_coords::gazetteer::{
    normalize, DatasetProvider, GazetteerIndex, MatchResolver, Resolution,
};
use birthplace_coords::report::{read_requests, ResolutionReport};
use birthplace_coords::server;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Birthplace coordinates: resolve historical place names against GeoNames.
///
/// Examples:
///   birthplaces resolve --input python/emperors.csv --out src/data/birthplace_coords.json
///   birthplaces lookup Naissus --top 5
///   birthplaces serve --port 8080
#[derive(Parser)]
#[command(name = "birthplaces", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every birthplace in a CSV and write the mapping + missing report.
    Resolve {
        /// CSV with identifier and city columns.
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Output mapping JSON.
        #[arg(long, short = 'o', default_value = "birthplace_coords.json")]
        out: PathBuf,

        /// Missing-entries report JSON.
        #[arg(long, short = 'r', default_value = "birthplace_coords_report.json")]
        report: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Resolve a single city name and show the ranked candidates.
    Lookup {
        city: String,

        /// Number of candidates to print.
        #[arg(long, default_value_t = 5)]
        top: usize,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Serve lookups over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short = 'p', default_value_t = 8080)]
        port: u16,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// JSON config file.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Use this GeoNames dump directly instead of the cached download.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Extra overrides JSON, merged over the built-in table.
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Cache directory for the downloaded dataset.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Never download; fail if the dataset is not cached.
    #[arg(long)]
    offline: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Resolve { input, out, report, source } => run_resolve(&input, &out, &report, &source),
        Command::Lookup { city, top, source } => run_lookup(&city, top, &source),
        Command::Serve { host, port, source } => {
            let (resolver, _) = load_resolver(&source)?;
            let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            rt.block_on(server::start(&host, port, resolver))
                .with_context(|| format!("serving on {}:{}", host, port))
        }
    }
}

fn load_config(source: &SourceArgs) -> Result<Config> {
    let mut config = Config::load(source.config.as_deref())
        .with_context(|| format!("loading config {:?}", source.config))?;
    if let Some(ref path) = source.overrides {
        config.overrides_path = Some(path.clone());
    }
    if let Some(ref dir) = source.cache_dir {
        config.dataset.cache_dir = dir.clone();
    }
    Ok(config)
}

/// Acquire the dataset, build the index and assemble the resolver. Acquisition
/// failure stops here, before any index work.
fn load_resolver(source: &SourceArgs) -> Result<(MatchResolver, Config)> {
    let config = load_config(source)?;
    let overrides = config.overrides()?;

    let dataset = match source.dataset {
        Some(ref path) => path.clone(),
        None => {
            let mut provider = DatasetProvider::new(config.dataset.clone());
            provider.set_offline(source.offline);
            provider.ensure().context("acquiring gazetteer dataset")?
        }
    };

    let (index, stats) = GazetteerIndex::from_path(&dataset)
        .with_context(|| format!("reading gazetteer {}", dataset.display()))?;
    tracing::debug!(
        lines = stats.lines,
        defaulted_population = stats.defaulted_population,
        "gazetteer build stats"
    );

    let resolver = MatchResolver::new(Arc::new(index), Arc::new(overrides));
    Ok((resolver, config))
}

fn run_resolve(input: &Path, out: &Path, report_path: &Path, source: &SourceArgs) -> Result<()> {
    let (resolver, config) = load_resolver(source)?;
    let requests = read_requests(input, &config.columns)
        .with_context(|| format!("reading requests from {}", input.display()))?;

    let report = ResolutionReport::build(&resolver, &requests);
    report.write_mapping(out).with_context(|| format!("writing {}", out.display()))?;
    report
        .write_missing(report_path)
        .with_context(|| format!("writing {}", report_path.display()))?;

    let s = &report.summary;
    eprintln!(
        "  Resolved {}/{} birthplaces ({} via overrides), {} missing, {} skipped",
        s.resolved,
        s.requested - s.skipped,
        s.from_overrides,
        s.missing,
        s.skipped,
    );
    for m in &report.missing {
        eprintln!("    missing: {} ({})", m.name, m.city);
    }
    Ok(())
}

fn run_lookup(city: &str, top: usize, source: &SourceArgs) -> Result<()> {
    let (resolver, _) = load_resolver(source)?;

    match resolver.resolve(city) {
        Resolution::Resolved { lat, lng, source, geoname_id } => {
            println!(
                "  {} -> {:.6}, {:.6} [{}{}]",
                city,
                lat,
                lng,
                source,
                geoname_id.map(|id| format!(" #{}", id)).unwrap_or_default(),
            );
        }
        Resolution::Unresolved(reason) => println!("  {} -> unresolved ({})", city, reason),
    }

    let ranked = resolver.ranked_candidates(city);
    println!("  Top-{} of {} candidates for key '{}':", top.min(ranked.len()), ranked.len(), normalize(city));
    for (i, c) in ranked.iter().enumerate().take(top) {
        println!(
            "    {}. {} #{} class={} pop={} ({:.4}, {:.4})",
            i + 1,
            c.name,
            c.geoname_id,
            c.feature_class,
            c.population,
            c.lat,
            c.lng,
        );
    }
    Ok(())
}
