//! Shared CLI definitions for csvboard.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How columns pick their dataset.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PickerKind {
    /// Three flat selects: class, scaling, mode (file is `<class>.csv`)
    Triple,
    /// Nested menu built from a folder-structure document or the data directory
    Tree,
}

impl PickerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triple => "triple",
            Self::Tree => "tree",
        }
    }
}

/// Log verbosity for the log file
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Command-line arguments for csvboard
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "csvboard",
    version,
    about = "Side-by-side CSV comparison board in the terminal"
)]
pub struct Args {
    /// Permalink to restore on startup (the `#...` fragment, leading `#` optional)
    #[arg(value_name = "PERMALINK")]
    pub permalink: Option<String>,

    /// Directory or http(s) URL that contains the `data/` tree
    #[arg(long = "data-root", value_name = "ROOT")]
    pub data_root: Option<String>,

    /// Dataset picker to use
    #[arg(long = "picker", value_enum)]
    pub picker: Option<PickerKind>,

    /// Folder-structure JSON document for the tree picker (default: scan `<ROOT>/data`)
    #[arg(long = "folder-structure", value_name = "FILE")]
    pub folder_structure: Option<PathBuf>,

    /// Start in aggregate highlight mode
    #[arg(long = "aggregate", action)]
    pub aggregate: bool,

    /// Write logs to this file (default: cache directory)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log verbosity (RUST_LOG takes precedence when set)
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write a commented default configuration file and exit
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Overwrite an existing configuration file (with --generate-config)
    #[arg(long = "force", action, requires = "generate_config")]
    pub force: bool,

    /// Scan `<ROOT>/data` and write its folder-structure JSON document to FILE, then exit
    #[arg(long = "write-folder-structure", value_name = "FILE")]
    pub write_folder_structure: Option<PathBuf>,
}
