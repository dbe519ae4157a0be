/// Image matrix generator
use crate::Error::*;
use clap::{Parser, Subcommand};
use imgmatrix::config;
use imgmatrix::matrix;
use imgmatrix::variant::Variant;
use log::{debug, error, info};
use std::path::PathBuf;
use thiserror::Error;

/// Generate Dockerfiles, publish hooks and entrypoints for every
/// runtime version and variant of a release.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. Defaults to ./matrix.toml if it exists.
    #[arg(long)]
    config: Option<String>,

    /// Upstream release version, e.g. 5.15.0.
    #[arg(long)]
    release_version: Option<String>,

    /// Checksum of the upstream release archive.
    #[arg(long)]
    checksum: Option<String>,

    /// Directory holding the templates.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Root of the generated directory tree.
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a Dockerfile, hook and entrypoint for every runtime and variant.
    Generate,
    /// Print the tags each runtime and variant will be published as.
    Tags {
        /// Print as JSON instead of one line per directory.
        #[arg(long)]
        json: bool,
    },
    /// Render the Dockerfile of a single runtime and variant to standard output.
    Dockerfile {
        #[arg(long)]
        runtime: String,
        #[arg(long)]
        variant: Variant,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration file: {0}")]
    ConfigParse(#[from] config::file::Error),

    #[error("configuration: {0}")]
    Config(#[from] config::runtime::Error),

    #[error("{0}")]
    Matrix(#[from] matrix::Error),

    #[error(transparent)]
    UnknownCell(#[from] matrix::UnknownCell),

    #[error("serialize tags: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read configuration file from disk and merge it with the
/// `default.toml` built-in config.
///
/// If a configuration file name is not set explicitly, this function will
/// detect whether a config file with the default file name exists in the
/// working directory. If it does, it is used implicitly.
fn read_config(args: &Cli) -> Result<config::file::File, Error> {
    const DEFAULT_CONFIG_FILE: &str = "matrix.toml";

    let config_file = match &args.config {
        None => {
            if std::fs::metadata(DEFAULT_CONFIG_FILE)
                .map(|metadata| metadata.is_file())
                .unwrap_or(false)
            {
                Some(DEFAULT_CONFIG_FILE.to_string())
            } else {
                None
            }
        }
        Some(c) => Some(c.clone()),
    };

    Ok(if let Some(config_file) = config_file {
        debug!("using configuration file {config_file}");
        config::file::File::default_with_user_config_file(&config_file)?
    } else {
        config::file::File::default()
    })
}

fn main() {
    match run() {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            error!("fatal: {}", err.to_string());
            std::process::exit(1)
        }
    }
}

fn run() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let cfg_file = read_config(&args)?;

    let cfg = config::runtime::Config::new(
        &cfg_file,
        config::runtime::Overrides {
            release_version: args.release_version.clone(),
            checksum: args.checksum.clone(),
            templates: args.templates.clone(),
            output: args.output.clone(),
        },
    )
    .map_err(Config)?;

    info!("Release {}", cfg.release.version);

    match args.command {
        Commands::Generate => {
            let report = matrix::run(&cfg)?;
            info!(
                "{} directories generated under {}, {} files written, {} unchanged",
                report.directories.len(),
                cfg.output_dir.display(),
                report.written,
                report.unchanged
            );
            Ok(())
        }
        Commands::Tags { json } => {
            let jobs = matrix::plan(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                for job in &jobs {
                    println!("{}: {}", job.directory.display(), job.tags.join(" "));
                }
            }
            Ok(())
        }
        Commands::Dockerfile { runtime, variant } => {
            let jobs = matrix::plan(&cfg)?;
            let job = matrix::find_job(&jobs, &runtime, variant)?;
            let templates = matrix::Templates::load(&cfg.templates, [job])?;
            print!("{}", templates.render_recipe(job, &cfg.release)?);
            info!("Docker image tags: {}", job.tags.join(" "));
            Ok(())
        }
    }
}
