use anyhow::Result;
use clap::Parser;
use pkgrepo::commands::{self, Config};
use std::path::PathBuf;

/// pkgrepo - Versioned package repository tool
///
/// Discover package families across a search path, expand wildcard
/// requirements, show version preference order and install package variants.
///
/// Settings are read from PKGREPO_SETTINGS_FILE or ~/.pkgreporc, and may be
/// overridden with PKGREPO_PACKAGES_PATH, PKGREPO_LOCAL_PACKAGES_PATH and
/// PKGREPO_WARN_UNTIMESTAMPED.
///
/// Examples:
///   pkgrepo packages python          # List python packages
///   pkgrepo expand 'python-2.*'      # Expand to the latest python 2 release
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGREPO_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Package root to search (repeatable, replaces the configured search path)
    #[arg(long = "path", short = 'p', value_name = "PATH", global = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List package families and where they are defined
    Families(FamiliesArgs),

    /// List packages by short name
    Packages(PackagesArgs),

    /// Expand wildcards in a package request
    Expand(ExpandArgs),

    /// Show the versions of a family in preference order
    Order(OrderArgs),

    /// Install every variant of a developer package into a repository
    Install(InstallArgs),
}

#[derive(clap::Args, Debug)]
pub struct FamiliesArgs {
    /// Only show families with this name
    pub name: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PackagesArgs {
    /// Only show packages of this family
    pub name: Option<String>,

    /// Include packages shadowed by an earlier root
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExpandArgs {
    /// Package request, e.g. "python-2.6.*+<**"
    #[arg(value_name = "REQUEST")]
    pub request: String,
}

#[derive(clap::Args, Debug)]
pub struct OrderArgs {
    /// Package family name
    pub name: String,

    /// JSON or YAML file with one orderer or a list of orderers
    #[arg(long, value_name = "FILE")]
    pub orderers: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Directory holding the developer package definition
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target repository root
    #[arg(long, value_name = "PATH")]
    pub repo: PathBuf,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::load(pkgrepo::runtime::RealRuntime, cli.paths)?;

    match cli.command {
        Commands::Families(args) => commands::families(&config, args.name.as_deref())?,
        Commands::Packages(args) => commands::packages(&config, args.name.as_deref(), args.all)?,
        Commands::Expand(args) => commands::expand(&config, &args.request)?,
        Commands::Order(args) => commands::order(&config, &args.name, args.orderers.as_deref())?,
        Commands::Install(args) => {
            commands::install(&config, &args.source, &args.repo, args.dry_run)?
        }
    }
    Ok(())
}
