//! Command-line interface module for dirsweep.
//!
//! Parses arguments, loads the configuration and runs the selected passes in
//! a fixed order: consolidation first, then identical content, empty files,
//! same-name files, temporary files, attributes and finally filenames.

use crate::config::{ConfigError, SweepConfig};
use crate::engine::{Engine, EngineError, PassReport};
use crate::output::OutputFormatter;
use crate::policy::{ConsolidateMode, LinePrompter, Prompter, ResolutionPolicy};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Organize and tidy up files in directories.
#[derive(Debug, Clone, Parser)]
#[command(name = "dirsweep", version, about)]
pub struct Args {
    /// Configuration file (created with defaults if missing)
    pub configuration: PathBuf,

    /// Main directory
    pub main_directory: PathBuf,

    /// Other directories to include
    #[arg(required = true, num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Move or copy files from the other directories into the main one
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub move_or_copy: ConsolidateMode,

    /// Files with identical content: keep the oldest
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub identical: ResolutionPolicy,

    /// Empty files: delete
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub empty: ResolutionPolicy,

    /// Files with the same name: keep the newest
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub samename: ResolutionPolicy,

    /// Temporary files: delete
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub temporary: ResolutionPolicy,

    /// Files whose permissions differ from the configured ones: reset them
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub unusual_attributes: ResolutionPolicy,

    /// Filenames with troublesome characters: substitute them
    #[arg(long, value_enum, default_value = "do_nothing")]
    pub troublesome_characters: ResolutionPolicy,

    /// Show what would change without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Increase diagnostic output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Runs every pass selected in `args`, prompting on stdin when asked to.
pub fn run_cli(args: &Args) -> Result<Vec<PassReport>, CliError> {
    run_with_prompter(args, LinePrompter::stdio())
}

/// Runs every pass selected in `args` with the given prompter.
///
/// Passes run in a fixed order and each uses its own policy. The reports of
/// all passes that ran are returned and printed as a summary table.
pub fn run_with_prompter<P: Prompter>(
    args: &Args,
    prompter: P,
) -> Result<Vec<PassReport>, CliError> {
    let settings = SweepConfig::load_or_create(&args.configuration)?.into_settings()?;

    if args.dry_run {
        OutputFormatter::dry_run_notice("No files will be modified.");
    }
    OutputFormatter::info(&format!(
        "Tidying {} with {} other director{}",
        args.main_directory.display(),
        args.directories.len(),
        if args.directories.len() == 1 { "y" } else { "ies" }
    ));

    let mut engine = Engine::new(
        settings,
        args.main_directory.clone(),
        args.directories.clone(),
        prompter,
    )
    .with_dry_run(args.dry_run);

    let mut reports = Vec::new();

    if args.move_or_copy != ConsolidateMode::DoNothing {
        OutputFormatter::header("Consolidating into main directory");
        reports.push(engine.consolidate(args.move_or_copy)?);
    }

    type PassFn<E> = fn(&mut E, ResolutionPolicy) -> Result<PassReport, EngineError>;
    let passes: [(&str, ResolutionPolicy, PassFn<Engine<P>>); 6] = [
        ("Files with identical content", args.identical, Engine::leave_old_identical),
        ("Empty files", args.empty, Engine::delete_empty),
        ("Files with the same name", args.samename, Engine::leave_new_samename),
        ("Temporary files", args.temporary, Engine::delete_temporary),
        ("Unusual attributes", args.unusual_attributes, Engine::change_unusual_attributes),
        (
            "Troublesome characters",
            args.troublesome_characters,
            Engine::change_troublesome_characters,
        ),
    ];

    for (title, policy, pass) in passes {
        if policy == ResolutionPolicy::Skip {
            continue;
        }
        OutputFormatter::header(title);
        reports.push(pass(&mut engine, policy)?);
    }

    OutputFormatter::summary_table(&reports);
    Ok(reports)
}
