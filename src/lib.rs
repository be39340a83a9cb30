//! dirsweep - tidy a main directory together with its companion directories
//!
//! This library finds and resolves common file-hygiene problems across a set
//! of directories: duplicate content, files sharing a name, empty and
//! temporary files, unusual permissions and troublesome characters in
//! filenames. It can also consolidate auxiliary directories into the main one.

pub mod action;
pub mod cli;
pub mod config;
pub mod engine;
pub mod hash;
pub mod logging;
pub mod output;
pub mod policy;
pub mod resolver;
pub mod scanner;

pub use action::Action;
pub use config::{ConfigError, Settings, SweepConfig};
pub use engine::{Engine, EngineError, Pass, PassReport};
pub use policy::{Answer, ConsolidateMode, Decider, LinePrompter, Prompter, ResolutionPolicy};
pub use scanner::{FileRecord, TreeScanner};

pub use cli::{Args, run_cli};
