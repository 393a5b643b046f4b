use anyhow::Result;
use clap::Parser;
use chainmend::commands::{self, BatchArgs, Config, NodeOptions, ResolveOptions};
use chainmend::node::NodeType;
use std::path::PathBuf;
use std::time::Duration;

/// chainmend - obsolescence chain checker and repairer
///
/// Finds and fixes broken obsoletes/obsoletedBy links between the revisions
/// of data packages on a DataONE member node.
///
/// If the D1_AUTH_TOKEN environment variable is set, it is sent as a bearer
/// token. Updates normally need a client certificate (--cert).
///
/// Examples:
///   chainmend collect dois.txt chains.csv
///   chainmend resolve-unresolved chains.csv resolved.csv
///   chainmend check-cross-source resolved.csv
///   chainmend repair resolved.csv --audit updates.tsv --cert client.pem
#[derive(Parser, Debug)]
#[command(author, version = env!("CHAINMEND_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target node domain (also via CHAINMEND_NODE)
    #[arg(
        long,
        env = "CHAINMEND_NODE",
        value_name = "DOMAIN",
        default_value = "gmn.lternet.edu",
        global = true
    )]
    pub node: String,

    /// Node base URL (defaults to https://<node>)
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// PEM file with client certificate and key (also via CHAINMEND_CERT)
    #[arg(long, env = "CHAINMEND_CERT", value_name = "PATH", global = true)]
    pub cert: Option<PathBuf>,

    /// Stop after this many records (0 = no limit)
    #[arg(long = "max-records", value_name = "N", default_value_t = 0, global = true)]
    pub max_records: usize,

    /// Check every record, not only those with expected links
    #[arg(long, global = true)]
    pub deep: bool,

    /// Requests per burst
    #[arg(long = "burst-size", value_name = "N", default_value_t = 25, global = true)]
    pub burst_size: usize,

    /// Pause between bursts in milliseconds
    #[arg(long = "pause-ms", value_name = "MS", default_value_t = 1000, global = true)]
    pub pause_ms: u64,

    /// Request timeout in seconds
    #[arg(long = "timeout-secs", value_name = "S", default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    /// Delay between retries of one request in milliseconds
    #[arg(long = "retry-delay-ms", value_name = "MS", default_value_t = 1000, global = true)]
    pub retry_delay_ms: u64,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    fn node_options(&self) -> NodeOptions {
        NodeOptions {
            node: self.node.clone(),
            base_url: self.base_url.clone(),
            cert: self.cert.clone(),
            max_records: self.max_records,
            deep: self.deep,
            burst_size: self.burst_size,
            pause: Duration::from_millis(self.pause_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    fn default_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build a chain export from a list of external ids
    Collect(CollectArgs),

    /// Resolve the UNRESOLVED columns of a chain export
    ResolveUnresolved(ResolveArgs),

    /// Write the external id to identifier map of a chain export
    MakeDoiMap(MakeDoiMapArgs),

    /// Export the links present in each identifier's system metadata
    SysmetaInfo(SysmetaInfoArgs),

    /// Check each chain against its own revisions
    CheckInternal(CheckInternalArgs),

    /// Compare a resolved chain export with the node's metadata
    CheckCrossSource(CheckCrossSourceArgs),

    /// Correct the links in the node's metadata
    Repair(RepairArgs),

    /// collect, resolve-unresolved, repair and check-cross-source in one go
    Batch(BatchCliArgs),
}

#[derive(clap::Args, Debug)]
pub struct CollectArgs {
    /// File with one external id per line
    #[arg(value_name = "IDS")]
    pub input: PathBuf,

    /// Chain export to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Chain export to resolve
    #[arg(value_name = "CHAINS")]
    pub input: PathBuf,

    /// Resolved chain export to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Mapping file from make-doi-map, tried first
    #[arg(long, value_name = "PATH")]
    pub mapping: Option<PathBuf>,

    /// DOI resolver for landing-page lookups
    #[arg(long = "resolver-url", value_name = "URL", default_value = "https://doi.org")]
    pub resolver_url: String,

    /// Only use the mapping file
    #[arg(long = "no-landing-page")]
    pub no_landing_page: bool,
}

#[derive(clap::Args, Debug)]
pub struct MakeDoiMapArgs {
    /// Resolved chain export
    #[arg(value_name = "CHAINS")]
    pub input: PathBuf,

    /// Mapping file to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct SysmetaInfoArgs {
    /// File with one identifier per line
    #[arg(value_name = "PIDS")]
    pub input: PathBuf,

    /// Observed-links CSV to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Which node API to read from
    #[arg(long = "node-type", value_enum, default_value_t = NodeType::Mn)]
    pub node_type: NodeType,
}

#[derive(clap::Args, Debug)]
pub struct CheckInternalArgs {
    /// Observed-links CSV (or a chain export with --chains)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Read the links from a chain export instead
    #[arg(long)]
    pub chains: bool,

    /// Also compare each series with this revision catalogue
    #[arg(long = "versions-url", value_name = "URL")]
    pub versions_url: Option<String>,

    /// Write findings as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct CheckCrossSourceArgs {
    /// Resolved chain export
    #[arg(value_name = "CHAINS")]
    pub input: PathBuf,

    /// Write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RepairArgs {
    /// Resolved chain export
    #[arg(value_name = "CHAINS")]
    pub input: PathBuf,

    /// Write the repair audit TSV
    #[arg(long, value_name = "PATH")]
    pub audit: Option<PathBuf>,

    /// Plan and audit without publishing
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct BatchCliArgs {
    /// File with one external id per line
    #[arg(value_name = "IDS")]
    pub ids: PathBuf,

    /// First line to process (0-based)
    #[arg(value_name = "START")]
    pub start: usize,

    /// Line to stop before; -1 for the end of the file
    #[arg(value_name = "END", allow_negative_numbers = true)]
    pub end: i64,

    /// Prefix of every file the batch writes
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    /// DOI resolver for landing-page lookups
    #[arg(long = "resolver-url", value_name = "URL", default_value = "https://doi.org")]
    pub resolver_url: String,

    /// Plan and audit without publishing
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.default_filter()))
        .init();
    let config = Config::new(chainmend::runtime::RealRuntime, cli.node_options())?;

    match cli.command {
        Commands::Collect(args) => commands::collect(&config, &args.input, &args.output).await?,
        Commands::ResolveUnresolved(args) => {
            let options = ResolveOptions {
                mapping: args.mapping,
                resolver_url: args.resolver_url,
                landing_page: !args.no_landing_page,
            };
            commands::resolve_unresolved(&config, &args.input, &args.output, &options).await?;
        }
        Commands::MakeDoiMap(args) => commands::make_doi_map(&config, &args.input, &args.output)?,
        Commands::SysmetaInfo(args) => {
            commands::sysmeta_info(&config, &args.input, &args.output, args.node_type).await?
        }
        Commands::CheckInternal(args) => {
            commands::check_internal(
                &config,
                &args.input,
                args.chains,
                args.versions_url.as_deref(),
                args.report.as_deref(),
            )
            .await?
        }
        Commands::CheckCrossSource(args) => {
            commands::check_cross_source(&config, &args.input, args.report.as_deref()).await?
        }
        Commands::Repair(args) => {
            commands::repair(&config, &args.input, args.audit.as_deref(), args.dry_run).await?;
        }
        Commands::Batch(args) => {
            let args = BatchArgs {
                ids: args.ids,
                start: args.start,
                end: args.end,
                prefix: args.prefix,
                resolver_url: args.resolver_url,
                dry_run: args.dry_run,
            };
            commands::batch(&config, &args).await?
        }
    }
    Ok(())
}
