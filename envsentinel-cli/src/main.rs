//! EnvSentinel CLI - back up .env files into an encrypted snapshot store.

mod output;
mod select;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use envsentinel_core::{platform, CloseMode, Config, Feature, Features, Store, TrackedFile};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Keep your .env files backed up into a local, encrypted snapshot
#[derive(Parser)]
#[command(name = "envsentinel", version)]
#[command(
    about = "Back up and restore .env files through an encrypted snapshot store",
    long_about = "envsentinel keeps your .env files synced into a local, age-encrypted\n\
                  snapshot, so your secrets survive machine loss or repository\n\
                  re-cloning.\n\n\
                  Getting started:\n\n\
                  1. `envsentinel init` to choose encryption keys and write the config\n\
                  2. `envsentinel scan` to find and select existing .env files\n\
                  3. `envsentinel sync` after editing any tracked file\n\
                  4. `envsentinel restore <path>` after re-cloning a repository"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the configuration and choose encryption keys
    Init,

    /// Find and select untracked .env files to back up
    Scan,

    /// View your tracked files
    List,

    /// Reconcile every tracked file with the filesystem
    Sync,

    /// Import a .env file into the snapshot
    Backup {
        /// File to start tracking
        path: PathBuf,
    },

    /// Install a tracked file from the snapshot into the filesystem
    Restore {
        /// Tracked file to write back to disk
        path: PathBuf,
    },

    /// Stop tracking a file
    Remove {
        /// Tracked file to forget
        path: PathBuf,
    },

    /// Check whether .env files are backed up
    Check {
        /// File or directory to check (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Report which external tools are available
    Deps,

    /// Open the config file in $EDITOR
    EditConfig,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Scan => cmd_scan(),
        Commands::List => cmd_list(),
        Commands::Sync => cmd_sync(),
        Commands::Backup { path } => cmd_backup(&path),
        Commands::Restore { path } => cmd_restore(&path),
        Commands::Remove { path } => cmd_remove(&path),
        Commands::Check { path } => cmd_check(path.as_deref()),
        Commands::Deps => cmd_deps(),
        Commands::EditConfig => cmd_edit_config(),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

#[derive(Serialize)]
struct ListEntry {
    directory: String,
    file: String,
}

#[derive(Serialize)]
struct SyncRow {
    path: String,
    status: String,
}

fn cmd_init() -> Result<()> {
    if Config::load().is_ok() {
        bail!("envsentinel is already initialized");
    }

    let keys = ssh_private_keys()?;
    if keys.is_empty() {
        bail!("no SSH private keys found in ~/.ssh");
    }

    let labels: Vec<String> = keys.iter().map(|key| key.display().to_string()).collect();
    let chosen = select::multi_select("Select private keys to encrypt snapshots with", &labels)?;
    if chosen.is_empty() {
        bail!("no keys selected; config not created");
    }

    let selected: Vec<PathBuf> = chosen.into_iter().map(|index| keys[index].clone()).collect();
    let config = Config::new(&selected);
    let path = config.save()?;

    println!(
        "Config written to {} with {} key(s).",
        path.display(),
        config.keys.len()
    );
    println!("Keep a remote copy of every selected key: losing them all makes the snapshot unrecoverable.");
    Ok(())
}

fn cmd_scan() -> Result<()> {
    let mut store = Store::open()?;
    store.can_scan()?;

    let untracked = store.scan(None)?;
    if untracked.is_empty() {
        store.close(CloseMode::ReadOnly)?;
        println!("No untracked files found.");
        return Ok(());
    }

    if !output::stdout_is_terminal() {
        output::print_json(&untracked)?;
        store.close(CloseMode::ReadOnly)?;
        return Ok(());
    }

    let labels: Vec<String> = untracked
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    let chosen = select::multi_select("Select files to back up", &labels)?;

    let mut added = 0;
    for index in chosen {
        let path = &untracked[index];
        match TrackedFile::from_disk(path) {
            Ok(record) => {
                store.insert(&record)?;
                added += 1;
            }
            Err(e) => eprintln!("skipping {}: {e}", path.display()),
        }
    }

    if added > 0 {
        store.close(CloseMode::Write)?;
        println!("Backed up {added} file(s).");
    } else {
        store.close(CloseMode::ReadOnly)?;
        println!("No files were added.");
    }
    Ok(())
}

fn cmd_list() -> Result<()> {
    let store = Store::open()?;
    let records = store.list()?;
    store.close(CloseMode::ReadOnly)?;

    let entries: Vec<ListEntry> = records
        .iter()
        .map(|record| {
            let file = record
                .path()
                .strip_prefix(record.directory())
                .unwrap_or(record.path())
                .display()
                .to_string();
            ListEntry {
                directory: format!("{}/", record.directory().display()),
                file,
            }
        })
        .collect();

    if output::stdout_is_terminal() {
        let rows: Vec<[String; 2]> = entries
            .iter()
            .map(|entry| [entry.directory.clone(), entry.file.clone()])
            .collect();
        output::print_table(["Directory", "File"], &rows);
    } else {
        output::print_json(&entries)?;
    }
    Ok(())
}

fn cmd_sync() -> Result<()> {
    let mut store = Store::open()?;

    let mut rows = Vec::new();
    for mut record in store.list()? {
        let status = match store.sync_record(&mut record) {
            Ok(outcome) => {
                if store.update_required(&outcome) {
                    store.insert(&record)?;
                }
                output::status_label(&outcome)
            }
            // A single record's failure is reported in its row; the rest of
            // the batch still runs.
            Err(err) => err.to_string(),
        };
        rows.push(SyncRow {
            path: record.path().display().to_string(),
            status,
        });
    }

    if output::stdout_is_terminal() {
        let table: Vec<[String; 2]> = rows
            .iter()
            .map(|row| [row.path.clone(), row.status.clone()])
            .collect();
        output::print_table(["File", "Status"], &table);
    } else {
        output::print_json(&rows)?;
    }

    store.close(CloseMode::Write)?;
    Ok(())
}

fn cmd_backup(path: &Path) -> Result<()> {
    let mut store = Store::open()?;
    let record = TrackedFile::from_disk(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    store.insert(&record)?;
    store.close(CloseMode::Write)?;

    println!("Saved {} into the snapshot.", record.path().display());
    Ok(())
}

fn cmd_restore(path: &Path) -> Result<()> {
    let store = Store::open()?;
    let mut record = store.fetch(&std::path::absolute(path)?)?;
    record.restore()?;
    store.close(CloseMode::ReadOnly)?;

    println!("Restored {}.", record.path().display());
    Ok(())
}

fn cmd_remove(path: &Path) -> Result<()> {
    let mut store = Store::open()?;
    let abs = std::path::absolute(path)?;
    store.delete(&abs)?;
    store.close(CloseMode::Write)?;

    println!("Removed {} from the snapshot.", abs.display());
    Ok(())
}

fn cmd_check(path: Option<&Path>) -> Result<()> {
    let target = match path {
        Some(path) => std::path::absolute(path)?,
        None => std::env::current_dir()?,
    };
    if !target.exists() {
        bail!("no such path: {}", target.display());
    }

    let store = Store::open()?;

    if target.is_file() {
        let tracked = store.fetch(&target).is_ok();
        store.close(CloseMode::ReadOnly)?;

        if tracked {
            println!("{} is backed up.", target.display());
        } else {
            println!("{} is not backed up.", target.display());
            println!("Run `envsentinel backup {}` to track it.", target.display());
        }
        return Ok(());
    }

    let untracked = store.scan(Some(&target))?;
    store.close(CloseMode::ReadOnly)?;

    if untracked.is_empty() {
        println!("All .env files under {} are backed up.", target.display());
    } else {
        println!("Found {} file(s) that are not backed up:", untracked.len());
        for file in &untracked {
            println!("  {}", file.display());
        }
        println!();
        println!("Run `envsentinel scan` to back them up.");
    }
    Ok(())
}

fn cmd_deps() -> Result<()> {
    let features = Features::detect();

    let rows: Vec<[String; 2]> = Feature::ALL
        .iter()
        .map(|feature| {
            let status = if features.has(*feature) {
                "✓ available"
            } else {
                "✗ missing"
            };
            [feature.to_string(), status.to_string()]
        })
        .collect();

    output::print_table(["Tool", "Status"], &rows);
    Ok(())
}

fn cmd_edit_config() -> Result<()> {
    let editor = std::env::var("EDITOR").context("$EDITOR is not set")?;

    let config_path = platform::get_config_file_path();
    if !config_path.exists() {
        bail!(
            "no config file at {}; run `envsentinel init` first",
            config_path.display()
        );
    }

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .with_context(|| format!("could not launch {editor}"))?;
    if !status.success() {
        bail!("{editor} exited with {status}");
    }
    Ok(())
}

fn cmd_completions(shell: Shell) -> Result<()> {
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "envsentinel",
        &mut std::io::stdout(),
    );
    Ok(())
}

// Everything in ~/.ssh that is not a public key or ssh housekeeping file is
// offered as a candidate private key.
fn ssh_private_keys() -> Result<Vec<PathBuf>> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let ssh_dir = home.join(".ssh");

    let entries = fs::read_dir(&ssh_dir)
        .with_context(|| format!("could not read {}", ssh_dir.display()))?;

    let mut keys = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".pub") || name.contains("known_hosts") || name.contains("config") {
            continue;
        }
        keys.push(ssh_dir.join(name));
    }

    keys.sort();
    Ok(keys)
}
