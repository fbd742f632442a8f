//! vopsctl: exercise the cachefs control files without a mount.
//!
//! Builds an in-process control plane from a settings file and runs the
//! same open/read/write/release sequence a mounted filesystem would.
//!
//! ## Usage
//!
//! ```bash
//! vopsctl ls
//! vopsctl cat read_state
//! vopsctl write read_state full
//! vopsctl --config vops.ron shell
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use cachefs_vops::{ControlPlane, Settings};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Read and write cachefs control files.
#[derive(Parser, Debug)]
#[command(name = "vopsctl")]
#[command(about = "Read and write cachefs control files")]
struct Args {
    /// Settings file (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the control files
    Ls,
    /// Print a control file
    Cat { name: String },
    /// Write a value to a control file
    Write { name: String, value: String },
    /// Interactive session over one control plane
    Shell,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vopsctl: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let plane = ControlPlane::new(&settings).context("building control plane")?;
    let mut out = io::stdout().lock();

    match args.command {
        Command::Ls => ls(&plane, &mut out),
        Command::Cat { name } => cat(&plane, &name, &mut out),
        Command::Write { name, value } => write(&plane, &name, &value),
        Command::Shell => shell(&plane, io::stdin().lock(), &mut out),
    }
}

fn file_path(plane: &ControlPlane, name: &str) -> PathBuf {
    Path::new(plane.dir().resolver().prefix()).join(name)
}

fn ls(plane: &ControlPlane, out: &mut impl Write) -> Result<()> {
    let dir = plane.dir();
    let prefix = dir.resolver().prefix();
    for entry in dir.readdir(Path::new(prefix))? {
        let attr = dir.getattr(&file_path(plane, &entry.name))?;
        writeln!(out, "{:o} {}", attr.perm, entry.name)?;
    }
    Ok(())
}

fn cat(plane: &ControlPlane, name: &str, out: &mut impl Write) -> Result<()> {
    let bytes = plane
        .dir()
        .read_file(&file_path(plane, name))
        .with_context(|| format!("reading {name}"))?;
    out.write_all(&bytes)?;
    Ok(())
}

fn write(plane: &ControlPlane, name: &str, value: &str) -> Result<()> {
    let line = format!("{value}\n");
    plane
        .dir()
        .write_file(&file_path(plane, name), line.as_bytes())
        .with_context(|| format!("writing {name}"))?;
    Ok(())
}

/// Line-oriented loop: `ls`, `cat NAME`, `write NAME VALUE`, `quit`.
///
/// Errors are reported and the session continues.
fn shell(plane: &ControlPlane, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next()) {
            (None, _) => Ok(()),
            (Some("quit" | "exit"), _) => break,
            (Some("ls"), None) => ls(plane, out),
            (Some("cat"), Some(name)) => cat(plane, name, out),
            (Some("write"), Some(name)) => {
                let value: Vec<&str> = words.collect();
                write(plane, name, &value.join(" "))
            }
            (Some(other), _) => Err(anyhow::anyhow!("unknown command: {other}")),
        };
        if let Err(e) = result {
            writeln!(out, "error: {e:#}")?;
        }
    }
    Ok(())
}
