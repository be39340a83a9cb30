//! The resolution engine: one method per tidying pass.
//!
//! Each pass re-scans the main and auxiliary directories, decides per file
//! what should happen, and routes every change through [`Engine::resolve`],
//! which owns prompting, dry-run handling and error reporting.
//!
//! Filesystem failures never end a pass: they are reported, counted in the
//! [`PassReport`] and the pass moves on to the next file. Only a failure to
//! read the operator's answer aborts the pass.

use crate::action::Action;
use crate::config::Settings;
use crate::hash::hash_records;
use crate::output::OutputFormatter;
use crate::policy::{ConsolidateMode, Decider, Prompter, ResolutionPolicy};
use crate::resolver::{
    IdentityIndex, matches_temporary, needs_chmod, newer_wins, older_wins, renamed_file_name,
};
use crate::scanner::{FileRecord, TreeScanner};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end a pass early.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operator's answer could not be read.
    #[error("Failed to read answer: {0}")]
    Prompt(#[source] std::io::Error),
    /// The main directory does not exist and could not be created.
    #[error("Cannot prepare main directory {path}: {source}")]
    MainDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for engine passes.
pub type EngineResult<T> = Result<T, EngineError>;

/// Identifies a pass in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Move,
    Copy,
    Identical,
    Empty,
    SameName,
    Temporary,
    Attributes,
    TroublesomeCharacters,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Pass::Move => "move to main",
            Pass::Copy => "copy to main",
            Pass::Identical => "identical content",
            Pass::Empty => "empty files",
            Pass::SameName => "same name",
            Pass::Temporary => "temporary files",
            Pass::Attributes => "unusual attributes",
            Pass::TroublesomeCharacters => "troublesome characters",
        };
        f.write_str(label)
    }
}

/// What a pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: Pass,
    /// Files looked at.
    pub examined: usize,
    /// Actions carried out (or, in a dry run, that would have been).
    pub applied: usize,
    /// Actions the policy or the operator turned down.
    pub declined: usize,
    /// Actions that were approved but failed.
    pub failed: usize,
    /// Consolidation only: destination files that got replaced.
    pub overwritten: usize,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            examined: 0,
            applied: 0,
            declined: 0,
            failed: 0,
            overwritten: 0,
        }
    }
}

/// Runs tidying passes over a main directory and its auxiliary directories.
pub struct Engine<P> {
    settings: Settings,
    main_dir: PathBuf,
    aux_dirs: Vec<PathBuf>,
    prompter: P,
    dry_run: bool,
}

impl<P: Prompter> Engine<P> {
    pub fn new(settings: Settings, main_dir: PathBuf, aux_dirs: Vec<PathBuf>, prompter: P) -> Self {
        Self {
            settings,
            main_dir,
            aux_dirs,
            prompter,
            dry_run: false,
        }
    }

    /// Report planned changes instead of making them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Main directory first, then the auxiliary directories in order.
    fn scanner(&self) -> TreeScanner {
        let roots = std::iter::once(self.main_dir.clone())
            .chain(self.aux_dirs.iter().cloned())
            .collect();
        TreeScanner::new(roots, self.settings.exclude.clone())
    }

    /// Keeps the oldest of every group of files with identical content.
    pub fn leave_old_identical(&mut self, policy: ResolutionPolicy) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::Identical);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);

        let records: Vec<FileRecord> = self.scanner().records().collect();
        let mut index = IdentityIndex::new(older_wins);

        for (hash, record) in hash_records(records) {
            report.examined += 1;
            let Some(collision) = index.offer(hash, record) else {
                continue;
            };
            if same_file(&collision.survivor.path, &collision.loser.path) {
                continue;
            }

            let question = format!(
                "Delete newer file {} ({}, kept {})?",
                collision.loser.path.display(),
                modified_label(&collision.loser),
                modified_label(&collision.survivor)
            );
            let done = format!(
                "Leaving older file: {}, deleting: {}",
                collision.survivor.path.display(),
                collision.loser.path.display()
            );
            self.resolve(
                &mut decider,
                &mut report,
                &question,
                Action::Delete(collision.loser.path),
                &done,
            )?;
        }

        Ok(report)
    }

    /// Keeps the newest of every group of files sharing a file name.
    pub fn leave_new_samename(&mut self, policy: ResolutionPolicy) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::SameName);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);

        let scanner = self.scanner();
        let mut index = IdentityIndex::new(newer_wins);

        for record in scanner.records() {
            report.examined += 1;
            let Some(collision) = index.offer(record.name.clone(), record) else {
                continue;
            };
            if same_file(&collision.survivor.path, &collision.loser.path) {
                continue;
            }

            let question = format!(
                "Delete older file {} ({}, kept {})?",
                collision.loser.path.display(),
                modified_label(&collision.loser),
                modified_label(&collision.survivor)
            );
            let done = format!(
                "Leaving newer file: {}, deleting: {}",
                collision.survivor.path.display(),
                collision.loser.path.display()
            );
            self.resolve(
                &mut decider,
                &mut report,
                &question,
                Action::Delete(collision.loser.path),
                &done,
            )?;
        }

        Ok(report)
    }

    /// Removes zero-byte files.
    pub fn delete_empty(&mut self, policy: ResolutionPolicy) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::Empty);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);

        let scanner = self.scanner();
        for record in scanner.records() {
            report.examined += 1;
            if record.size != 0 {
                continue;
            }
            let path = record.path.display().to_string();
            self.resolve(
                &mut decider,
                &mut report,
                &format!("Delete empty file {}?", path),
                Action::Delete(record.path),
                &format!("Deleting empty file: {}", path),
            )?;
        }

        Ok(report)
    }

    /// Removes files whose name ends with a configured temporary suffix.
    pub fn delete_temporary(&mut self, policy: ResolutionPolicy) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::Temporary);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);

        let scanner = self.scanner();
        for record in scanner.records() {
            report.examined += 1;
            if !matches_temporary(&record.name, &self.settings.temporary_suffixes) {
                continue;
            }
            let path = record.path.display().to_string();
            self.resolve(
                &mut decider,
                &mut report,
                &format!("Delete temporary file {}?", path),
                Action::Delete(record.path),
                &format!("Deleting temporary file: {}", path),
            )?;
        }

        Ok(report)
    }

    /// Resets permission bits that differ from the configured mode.
    pub fn change_unusual_attributes(
        &mut self,
        policy: ResolutionPolicy,
    ) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::Attributes);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);
        let mode = self.settings.mode;

        let scanner = self.scanner();
        for record in scanner.records() {
            report.examined += 1;
            if !needs_chmod(record.mode, mode) {
                continue;
            }
            let path = record.path.display().to_string();
            self.resolve(
                &mut decider,
                &mut report,
                &format!("Change attributes for: {} ({:o})?", path, record.mode),
                Action::Chmod {
                    path: record.path,
                    mode,
                },
                &format!("Changing attributes for: {} to {:o}", path, mode),
            )?;
        }

        Ok(report)
    }

    /// Replaces troublesome characters in file names, keeping extensions.
    pub fn change_troublesome_characters(
        &mut self,
        policy: ResolutionPolicy,
    ) -> EngineResult<PassReport> {
        let mut report = PassReport::new(Pass::TroublesomeCharacters);
        if policy == ResolutionPolicy::Skip {
            return Ok(report);
        }
        let mut decider = Decider::new(policy);

        // Collected up front so renamed files are not visited again.
        let records: Vec<FileRecord> = self.scanner().records().collect();
        for record in records {
            report.examined += 1;
            let Some(new_name) = renamed_file_name(
                &record,
                &self.settings.troublesome,
                self.settings.substitute,
            ) else {
                continue;
            };

            let old_path = record.path;
            let new_path = record.parent.join(new_name);
            let question = format!("Rename {}?", old_path.display());
            let done = format!("Renaming {} to {}", old_path.display(), new_path.display());
            self.resolve(
                &mut decider,
                &mut report,
                &question,
                Action::Rename {
                    from: old_path,
                    to: new_path,
                },
                &done,
            )?;
        }

        Ok(report)
    }

    /// Moves every file of the auxiliary directories into the main directory.
    pub fn move_to_main(&mut self) -> EngineResult<PassReport> {
        self.consolidate(ConsolidateMode::Move)
    }

    /// Copies every file of the auxiliary directories into the main directory.
    pub fn copy_to_main(&mut self) -> EngineResult<PassReport> {
        self.consolidate(ConsolidateMode::Copy)
    }

    /// Runs the consolidation selected by `mode`.
    ///
    /// Destinations are flattened to `main/<file name>`. When two sources share
    /// a name, the one processed last replaces the earlier one; every such
    /// replacement is reported and counted in `overwritten`.
    pub fn consolidate(&mut self, mode: ConsolidateMode) -> EngineResult<PassReport> {
        let pass = match mode {
            ConsolidateMode::DoNothing => return Ok(PassReport::new(Pass::Move)),
            ConsolidateMode::Move => Pass::Move,
            ConsolidateMode::Copy => Pass::Copy,
        };
        let mut report = PassReport::new(pass);

        if !self.dry_run {
            fs::create_dir_all(&self.main_dir).map_err(|source| EngineError::MainDirectory {
                path: self.main_dir.clone(),
                source,
            })?;
        }

        // Consolidation has no per-file question.
        let mut decider = Decider::new(ResolutionPolicy::ApplyToAll);
        let scanner = TreeScanner::new(self.aux_dirs.clone(), self.settings.exclude.clone());
        let records: Vec<FileRecord> = scanner.records().collect();
        let mut placed: HashMap<String, PathBuf> = HashMap::new();

        for record in records {
            report.examined += 1;
            let target = self.main_dir.join(&record.name);
            if same_file(&record.path, &target) {
                debug!("Already in main directory: {}", target.display());
                continue;
            }

            if let Some(previous) = placed.get(&record.name) {
                OutputFormatter::warning(&replacement_notice(&record.path, &target, previous));
                report.overwritten += 1;
            } else if target.exists() {
                OutputFormatter::warning(&format!(
                    "{} replaces existing {}",
                    record.path.display(),
                    target.display()
                ));
                report.overwritten += 1;
            }

            let (action, verb) = match mode {
                ConsolidateMode::Copy => (
                    Action::Copy {
                        from: record.path.clone(),
                        to: target.clone(),
                    },
                    "Copying",
                ),
                _ => (
                    Action::Move {
                        from: record.path.clone(),
                        to: target.clone(),
                    },
                    "Moving",
                ),
            };
            let done = format!("{} {} to {}", verb, record.path.display(), target.display());
            if self.resolve(&mut decider, &mut report, "", action, &done)? {
                placed.insert(record.name, record.path);
            }
        }

        Ok(report)
    }

    /// Asks (per policy), then applies one action and records the outcome.
    ///
    /// Returns whether the action went ahead.
    fn resolve(
        &mut self,
        decider: &mut Decider,
        report: &mut PassReport,
        question: &str,
        action: Action,
        done: &str,
    ) -> EngineResult<bool> {
        if self.dry_run {
            OutputFormatter::dry_run_notice(&format!("Would {}", action));
            report.applied += 1;
            return Ok(true);
        }

        let approved = decider
            .approve(&mut self.prompter, question)
            .map_err(EngineError::Prompt)?;
        if !approved {
            debug!("Declined: {}", action);
            report.declined += 1;
            return Ok(false);
        }

        match action.apply() {
            Ok(()) => {
                info!("{}", action);
                OutputFormatter::success(done);
                report.applied += 1;
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to {}: {}", action, e);
                OutputFormatter::error(&format!("Failed to {}: {}", action, e));
                report.failed += 1;
                Ok(false)
            }
        }
    }
}

/// Local modification time, as shown in prompts.
fn modified_label(record: &FileRecord) -> String {
    DateTime::<Local>::from(record.modified)
        .format("modified %Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Warning for a consolidation source that replaces an earlier one.
fn replacement_notice(source: &Path, target: &Path, previous: &Path) -> String {
    format!(
        "{} replaces {} (placed from {})",
        source.display(),
        target.display(),
        previous.display()
    )
}

/// True if both paths name the same file on disk.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Answer;
    use std::collections::VecDeque;
    use std::io;
    use tempfile::TempDir;

    /// Replays canned answers and records every question.
    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<Answer>,
        questions: Vec<String>,
    }

    impl Prompter for Scripted {
        fn ask(&mut self, question: &str) -> io::Result<Answer> {
            self.questions.push(question.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
        }
    }

    fn engine(main: &Path, answers: &[Answer]) -> Engine<Scripted> {
        Engine::new(
            Settings::default(),
            main.to_path_buf(),
            Vec::new(),
            Scripted {
                answers: answers.iter().copied().collect(),
                questions: Vec::new(),
            },
        )
    }

    #[test]
    fn test_skip_policy_does_not_scan() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty"), "").unwrap();

        let mut engine = engine(temp_dir.path(), &[]);
        let report = engine.delete_empty(ResolutionPolicy::Skip).unwrap();

        assert_eq!(report, PassReport::new(Pass::Empty));
        assert!(temp_dir.path().join("empty").exists());
    }

    #[test]
    fn test_declined_action_is_counted() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty"), "").unwrap();

        let mut engine = engine(temp_dir.path(), &[Answer::No]);
        let report = engine.delete_empty(ResolutionPolicy::AskEach).unwrap();

        assert_eq!(report.declined, 1);
        assert_eq!(report.applied, 0);
        assert!(temp_dir.path().join("empty").exists());
        assert_eq!(engine.prompter().questions.len(), 1);
        assert!(engine.prompter().questions[0].starts_with("Delete empty file"));
    }

    #[test]
    fn test_prompt_failure_aborts_pass() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty"), "").unwrap();

        let mut engine = engine(temp_dir.path(), &[]);
        let result = engine.delete_empty(ResolutionPolicy::AskEach);

        assert!(matches!(result, Err(EngineError::Prompt(_))));
        assert!(temp_dir.path().join("empty").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing_and_never_prompts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty"), "").unwrap();
        fs::write(temp_dir.path().join("draft.tmp"), "x").unwrap();

        let mut engine = engine(temp_dir.path(), &[]).with_dry_run(true);
        let empty = engine.delete_empty(ResolutionPolicy::AskEach).unwrap();
        let temporary = engine.delete_temporary(ResolutionPolicy::ApplyToAll).unwrap();

        assert_eq!(empty.applied, 1);
        assert_eq!(temporary.applied, 1);
        assert!(temp_dir.path().join("empty").exists());
        assert!(temp_dir.path().join("draft.tmp").exists());
        assert!(engine.prompter().questions.is_empty());
    }

    #[test]
    fn test_overlapping_roots_never_delete_the_only_copy() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("only.txt"), "unique").unwrap();
        fs::write(nested.join("a:b.txt"), "odd name").unwrap();

        let mut engine = Engine::new(
            Settings::default(),
            temp_dir.path().to_path_buf(),
            vec![nested.clone()],
            Scripted::default(),
        );
        let identical = engine.leave_old_identical(ResolutionPolicy::ApplyToAll).unwrap();
        let samename = engine.leave_new_samename(ResolutionPolicy::ApplyToAll).unwrap();
        let renamed = engine
            .change_troublesome_characters(ResolutionPolicy::ApplyToAll)
            .unwrap();

        assert_eq!(identical.applied, 0);
        assert_eq!(samename.applied, 0);
        assert_eq!(renamed.examined, 2);
        assert_eq!(renamed.applied, 1);
        assert_eq!(renamed.failed, 0);
        assert!(nested.join("only.txt").exists());
        assert!(nested.join("a_b.txt").exists());
        assert!(!nested.join("a:b.txt").exists());
    }

    #[test]
    fn test_replacement_notice_names_both_sources() {
        let notice = replacement_notice(
            Path::new("/aux2/report.txt"),
            Path::new("/main/report.txt"),
            Path::new("/aux1/report.txt"),
        );

        assert_eq!(
            notice,
            "/aux2/report.txt replaces /main/report.txt (placed from /aux1/report.txt)"
        );
        assert!(!notice.contains("copied"));
    }

    #[test]
    fn test_pass_labels() {
        assert_eq!(Pass::Identical.to_string(), "identical content");
        assert_eq!(Pass::TroublesomeCharacters.to_string(), "troublesome characters");
    }
}
