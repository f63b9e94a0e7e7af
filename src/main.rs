// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! ArchiComm CLI entrypoint.
//!
//! Applies instruction batches to stored designs and inspects them. Designs live under the
//! configured storage root (`.archicomm` by default).

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use archicomm::autosave::AutoSaveScheduler;
use archicomm::config::ArchiConfig;
use archicomm::engine::{decode_batch_str, instruction_batch_schema, SequentialIds, UuidIds};
use archicomm::state::VersionedStateStore;
use archicomm::store::{
    export_design, DesignFolder, PersistenceGateway, ProjectMeta, WriteDurability,
};

#[derive(Debug, Parser)]
#[command(name = "archicomm", version, about = "Architecture canvas state tool")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sync files and directories to disk on every write.
    #[arg(long, global = true)]
    durable_writes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply an instruction batch (JSON array) to a project and save it.
    Apply {
        #[arg(long)]
        project: Option<String>,
        /// Batch file, or `-` for stdin.
        #[arg(long)]
        batch: PathBuf,
        /// Print the outcome without saving.
        #[arg(long)]
        dry_run: bool,
        /// Allocate random ids instead of sequential ones.
        #[arg(long)]
        uuid_ids: bool,
    },
    /// Check a stored design for integrity problems.
    Validate {
        #[arg(long)]
        project: Option<String>,
        /// Save the repaired design when problems were found.
        #[arg(long)]
        repair: bool,
    },
    /// Print the project and its design as JSON.
    Export {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON schema of an instruction.
    Schema,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("archicomm=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_folder(
    config: &ArchiConfig,
    project: Option<String>,
    durable: bool,
) -> Result<DesignFolder, Box<dyn Error>> {
    let project = project.unwrap_or_else(|| config.storage.default_project.clone());
    let folder = DesignFolder::open(&config.storage.root, &project)?;
    Ok(if durable {
        folder.with_durability(WriteDurability::Durable)
    } else {
        folder
    })
}

fn read_batch(path: &Path) -> Result<String, Box<dyn Error>> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    Ok(std::fs::read_to_string(path)?)
}

async fn apply(
    config: &ArchiConfig,
    folder: DesignFolder,
    batch: &Path,
    dry_run: bool,
    uuid_ids: bool,
) -> Result<(), Box<dyn Error>> {
    let instructions = decode_batch_str(&read_batch(batch)?)?;
    let folder = Arc::new(folder);
    let snapshot = folder.load_design(None).await?.unwrap_or_default();

    let mut store = VersionedStateStore::new(snapshot, config.store_config());
    let scheduler = AutoSaveScheduler::spawn_on_current(
        folder.clone(),
        store.subscribe(),
        config.autosave,
    )?;
    if !dry_run {
        store.attach_autosave(scheduler.clone());
    }

    let result = if uuid_ids {
        store.apply_batch_with(&instructions, &mut UuidIds)
    } else {
        store.apply_batch_with(&instructions, &mut SequentialIds::default())
    };

    println!("{}", result.summary());
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
    for (alias, id) in &result.alias_map {
        println!("{alias} -> {id}");
    }

    if !dry_run && result.has_changes() {
        scheduler.force_save().await?;
        println!("saved {}", folder.project());
    }
    scheduler.shutdown();
    Ok(())
}

async fn validate(
    folder: DesignFolder,
    repair: bool,
    config: &ArchiConfig,
) -> Result<bool, Box<dyn Error>> {
    let Some(envelope) = folder.read_envelope(folder.project()).await? else {
        println!("no design stored for {}", folder.project());
        return Ok(true);
    };

    let report = folder.validate_data(&envelope.snapshot);
    for error in &report.errors {
        println!("error: {error}");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    if report.is_clean() {
        println!("{} is valid", folder.project());
        return Ok(true);
    }

    if repair {
        let repaired = folder.repair_data(envelope.snapshot);
        folder.save_design(&repaired, &config.autosave.save).await?;
        println!("repaired {}", folder.project());
        return Ok(true);
    }
    Ok(report.is_valid())
}

async fn export(folder: DesignFolder, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let project = folder.project().clone();
    let snapshot = folder.load_design(None).await?.unwrap_or_default();
    let meta = match folder.load_meta(&project).await? {
        Some(meta) => meta,
        None => ProjectMeta::new(project.clone(), project.as_str()),
    };
    let json = export_design(&meta, &snapshot)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Runs a storage command. Returns `false` when the command found problems.
async fn run(
    command: Command,
    config: ArchiConfig,
    durable: bool,
) -> Result<bool, Box<dyn Error>> {
    match command {
        Command::Apply {
            project,
            batch,
            dry_run,
            uuid_ids,
        } => {
            let folder = open_folder(&config, project, durable)?;
            apply(&config, folder, &batch, dry_run, uuid_ids).await?;
            Ok(true)
        }
        Command::Validate { project, repair } => {
            let folder = open_folder(&config, project, durable)?;
            validate(folder, repair, &config).await
        }
        Command::Export { project, output } => {
            let folder = open_folder(&config, project, durable)?;
            export(folder, output.as_deref()).await?;
            Ok(true)
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&instruction_batch_schema())?);
            Ok(true)
        }
    }
}

fn main() {
    let result = (|| -> Result<bool, Box<dyn Error>> {
        let cli = Cli::parse();
        init_tracing();

        let config = match &cli.config {
            Some(path) => ArchiConfig::load(path)?,
            None => ArchiConfig::default(),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(run(cli.command, config, cli.durable_writes))
    })();

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
