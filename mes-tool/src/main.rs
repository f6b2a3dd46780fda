use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser as ClapParser, Subcommand};
use log::LevelFilter;
use mes_nls::{Codec, Encoding};

mod batch;
mod config;
mod listing;

use crate::batch::{build_file, collect_scripts, export_file, load_script, run_batch};
use crate::config::{LoggerConfig, ToolConfig};
use crate::listing::Listing;

#[derive(ClapParser, Debug)]
#[command(version, about = "Export and reinsert the dialogue text of MES scripts", long_about = None)]
struct Args {
    /// Config file (default: ./mestool.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the text of a script, or of every script in a folder, next to it
    Export {
        #[arg(short, long)]
        encoding: Option<Encoding>,
        path: PathBuf,
    },
    /// Reinsert edited text and write rebuilt scripts into the rebuild folder
    Build {
        #[arg(short, long)]
        encoding: Option<Encoding>,
        path: PathBuf,
    },
    /// Print the decoded instruction list of a script as YAML
    Dump {
        #[arg(short, long)]
        encoding: Option<Encoding>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        path: PathBuf,
    },
}

fn init_logger(config: &LoggerConfig, verbose: u8) {
    let app_level = match verbose {
        0 => config.app_level_filter,
        1 => config.app_level_filter.max(LevelFilter::Debug),
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(config.level_filter)
        .filter_module("mestool", app_level)
        .filter_module("mes_script", app_level)
        .filter_module("mes_nls", app_level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn codec_for(encoding: Option<Encoding>, config: &ToolConfig) -> Result<Codec> {
    let enc = match encoding {
        Some(e) => e,
        None => config.encoding()?,
    };
    log::debug!("text encoding: {}", enc);
    Ok(Codec::new(enc))
}

fn dump(path: &Path, output: Option<&Path>, codec: &Codec) -> Result<()> {
    let script = load_script(path)?;
    let listing = Listing::new(&script, codec);

    match output {
        Some(out) => {
            let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
            let mut writer = BufWriter::new(file);
            listing.write(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            listing.write(stdout.lock())?;
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = ToolConfig::load(args.config.as_deref())?;
    init_logger(&config.logger, args.verbose);

    let summary = match args.command {
        Command::Export { encoding, path } => {
            let codec = codec_for(encoding, &config)?;
            let files = collect_scripts(&path, &config.script_extension)?;
            run_batch(&files, |f| {
                log::info!("exporting text from {}", f.display());
                export_file(f, &codec, &config)
            })
        }
        Command::Build { encoding, path } => {
            let codec = codec_for(encoding, &config)?;
            let files = collect_scripts(&path, &config.script_extension)?;
            run_batch(&files, |f| {
                log::info!("rebuilding {}", f.display());
                build_file(f, &codec, &config)
            })
        }
        Command::Dump {
            encoding,
            output,
            path,
        } => {
            let codec = codec_for(encoding, &config)?;
            dump(&path, output.as_deref(), &codec)?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    log::info!(
        "{} written, {} skipped, {} failed",
        summary.written,
        summary.skipped,
        summary.failed.len()
    );

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
