use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod config;
mod error;
mod overrides;
mod render;
mod reserved;
mod runtime;
mod selector;
mod template;
mod values;

#[cfg(test)]
mod testutil;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "confgen")]
#[command(about = "Job config generator", long_about = None)]
struct Cli {
    /// Project root holding the template, override and output trees.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Settings file (default: <root>/confgen.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render configs for every job with an override under the selector.
    Build {
        /// env=<prod|test|experiment|all> [exp=..] [group=..] [job=..]
        #[arg(value_name = "KEY=VALUE", value_parser = args::parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Resolve run-time values into generated configs and upload them.
    Runtime {
        /// env=.. [exp=..] [group=..] [job=..] run_date=<YYYYMMDD> [key=value ...]
        #[arg(value_name = "KEY=VALUE", value_parser = args::parse_key_val)]
        params: Vec<(String, String)>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "confgen=info",
        1 => "confgen=debug",
        _ => "confgen=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = config::Settings::load(&cli.root, cli.config.as_deref())
        .with_context(|| format!("loading settings for {}", cli.root.display()))?;

    match cli.cmd {
        Commands::Build { params } => {
            let mut params = args::Params::new(params)?;
            let raw = params.selector();
            params.finish()?;
            let selector = selector::validate(&raw)?;

            let report = render::build(&settings, &selector, &overrides::FsLister)
                .with_context(|| format!("build failed for {}", selector))?;
            println!("Generated {} files for {} jobs", report.files.len(), report.jobs);
        }
        Commands::Runtime { params } => {
            let mut params = args::Params::new(params)?;
            let raw = params.selector();
            let run_date = params.take(reserved::RUN_DATE);
            let selector = selector::validate(&raw)?;
            let request =
                runtime::RuntimeRequest::new(selector, run_date.as_deref(), &params.into_rest())?;

            let store = runtime::LocalObjectStore::new(&settings.remote.store_root);
            let report = runtime::resolve(&settings, &request, &overrides::FsLister, &store)
                .with_context(|| format!("runtime resolution failed for {}", request.selector))?;
            for job in &report.jobs {
                println!(
                    "{} -> {} ({} files in {})",
                    job.item,
                    job.hash,
                    job.files.len(),
                    job.dir.display()
                );
            }
        }
    }

    Ok(())
}
