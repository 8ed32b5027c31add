mod commands;
mod logging;
mod progress;
mod prompt;

use std::io;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, RunArgs};
use consolidator_core::{
    format_size, worker, ConsolidationEngine, FolderInfo, Job, RunKind, RunOutcome,
    Session,
};
use dotenv::dotenv;
use progress::CliProgress;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Cli::parse();

    let _guard = logging::init_logger(&logging::LogSettings::from_env(args.verbose));

    let config = match consolidator_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let engine = Arc::new(ConsolidationEngine::new(config));

    match args.command {
        Some(Commands::Merge { run, name }) => {
            let mut session = build_session(&run)?;
            session.output_name = name;
            if !confirm_delete(&session, run.yes)? {
                return Ok(());
            }
            if let Err(err) = run_job(&engine, &mut session, RunKind::Merge) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Compress { run, output }) => {
            let mut session = build_session(&run)?;
            session.output_name = output;
            if !confirm_delete(&session, run.yes)? {
                return Ok(());
            }
            if let Err(err) = run_job(&engine, &mut session, RunKind::Compress) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Inspect { folders }) => {
            let mut session = Session::new();
            for folder in &folders {
                session.add_folder(
                    FolderInfo::scan(folder)
                        .with_context(|| format!("Could not inspect {}", folder.display()))?,
                );
            }
            print_folders(&session);
        }
        Some(Commands::History) => print_history(&engine),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", engine.config());
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn build_session(run: &RunArgs) -> anyhow::Result<Session> {
    let mut session = Session::new();
    for source in &run.sources {
        let folder = FolderInfo::scan(source)
            .with_context(|| format!("Could not read source folder {}", source.display()))?;
        if !session.add_folder(folder) {
            info!("{} was given twice, using it once", source.display());
        }
    }
    session.destination = Some(run.dest.clone());
    session.delete_originals = run.delete_originals;
    print_folders(&session);
    Ok(session)
}

fn print_folders(session: &Session) {
    for folder in session.folders() {
        println!(
            "  {}  {}  {} files",
            folder.name().bold(),
            format_size(folder.size).cyan(),
            folder.file_count
        );
    }
    println!(
        "Total size of selected folders: {}",
        format_size(session.total_source_size()).green()
    );
}

fn confirm_delete(session: &Session, assume_yes: bool) -> io::Result<bool> {
    if !session.delete_originals || assume_yes {
        return Ok(true);
    }
    println!("{}", "These folders will be deleted after the run:".yellow());
    for folder in session.folders() {
        println!("    {}", folder.path.display());
    }
    prompt::confirm(
        &mut io::stdin().lock(),
        &mut io::stdout(),
        "Continue?",
        false,
    )
}

fn run_job(
    engine: &Arc<ConsolidationEngine>,
    session: &mut Session,
    kind: RunKind,
) -> Result<RunOutcome, consolidator_core::Error> {
    let job = match kind {
        RunKind::Merge => Job::Merge(session.merge_request(engine.config())?),
        RunKind::Compress => Job::Compress(session.archive_request(engine.config())?),
    };

    session.begin(kind)?;
    let handle = worker::spawn(Arc::clone(engine), job)?;

    let mut progress = CliProgress::new(kind);
    let result = handle.drain(|event| {
        session.apply(event);
        progress.handle(event);
    });

    match &result {
        Ok(_) => println!("{}", session.status_message().green()),
        Err(_) => println!("{}", session.status_message().red()),
    }
    result
}

fn print_history(engine: &ConsolidationEngine) {
    let operations = engine.history().recent_first();
    if operations.is_empty() {
        println!("No consolidations recorded yet.");
        return;
    }

    for operation in operations {
        println!(
            "{}",
            operation
                .date
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bold()
        );
        println!("  Destination: {}", operation.destination_folder);
        println!("  Items Consolidated: {}", operation.item_count);
        println!("  Total Size: {}", format_size(operation.total_size));
        println!("  Source Folders:");
        for folder in &operation.source_folders {
            println!("    - {}", folder);
        }
    }
}
