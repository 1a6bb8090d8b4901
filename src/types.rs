//! Core type definitions for goastdb
//!
//! Defines the shapes that flow through the indexing pipeline:
//! - FileMeta: a discovered source file (path, size, mtime)
//! - FileRow / NodeRow: the persisted relational form of a parsed file
//! - Options / RunResult: configuration and outcome of a run

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Run mode: build the database, query it, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Build,
    Query,
    Both,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Build => "build",
            Mode::Query => "query",
            Mode::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "build" => Some(Mode::Build),
            "query" => Some(Mode::Query),
            "both" | "" => Some(Mode::Both),
            _ => None,
        }
    }
}

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root directory to scan
    pub repo_root: String,
    /// Optional subdirectory under the root; must not escape it
    pub subdir: String,
    /// Cap on the number of .go files (0 = unlimited)
    pub max_files: usize,
    /// Parser worker count; defaults to available parallelism, and an
    /// explicit 0 is coerced to 1
    pub workers: usize,
    /// Output database path
    pub duckdb_path: String,
    pub mode: Mode,
    /// Reuse the existing database when the fingerprint matches
    pub reuse: bool,
    pub force_rebuild: bool,
    /// Run the built-in query benchmarks
    pub query_bench: bool,
    pub query_warmup: usize,
    pub query_iters: usize,
    /// Keep the database file when the run finishes
    pub keep_output_files: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            repo_root: ".".to_string(),
            subdir: String::new(),
            max_files: 0,
            workers: default_workers(),
            duckdb_path: "./.tmp/goastdb/ast.duckdb".to_string(),
            mode: Mode::Both,
            reuse: true,
            force_rebuild: false,
            query_bench: true,
            query_warmup: 2,
            query_iters: 8,
            keep_output_files: true,
        }
    }
}

/// Available parallelism, floored at one worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// A source file found by the scanner. Paths are relative to the repo
/// root and forward-slash normalized; ordering is by `rel_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub rel_path: String,
    pub size: u64,
    pub mod_unix_nano: i64,
}

/// One row of the `files` table.
#[derive(Debug, Clone, Default)]
pub struct FileRow {
    pub file_id: i64,
    pub path: String,
    pub pkg_name: String,
    /// Empty when the file parsed cleanly
    pub parse_error: String,
    pub bytes: i64,
}

/// One row of the `nodes` table. `ordinal` is the 1-based pre-order
/// index within the file; `parent_ordinal` is None for the file root.
#[derive(Debug, Clone)]
pub struct NodeRow {
    pub file_id: i64,
    pub ordinal: i32,
    pub parent_ordinal: Option<i32>,
    pub kind: String,
    pub node_text: String,
    pub pos: i32,
    pub end: i32,
    pub start_line: i32,
    pub start_col: i32,
    pub end_line: i32,
    pub end_col: i32,
    pub start_offset: i32,
    pub end_offset: i32,
}

/// State read back from an existing database. A missing or unreadable
/// database is reported as `exists: false`, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspect {
    pub exists: bool,
    pub schema_version: String,
    pub source_fingerprint: String,
    pub files_count: i64,
    pub nodes_count: i64,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub scan_files: usize,
    #[serde(serialize_with = "ser_millis")]
    pub scan_elapsed: Duration,
    pub subdir: String,
    pub max_files: usize,
    pub sync: SyncStats,
    pub query_warmup: usize,
    pub query_iters: usize,
    pub query_results: Vec<QueryBench>,
}

/// Statistics for the build-or-reuse stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStats {
    pub action: String,
    pub reason: String,
    pub changed: usize,
    pub parse_errors: usize,
    #[serde(serialize_with = "ser_millis")]
    pub parse_elapsed: Duration,
    #[serde(serialize_with = "ser_millis")]
    pub load_elapsed: Duration,
    pub files_count: i64,
    pub nodes_count: i64,
}

/// Elapsed time for one benchmarked query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBench {
    pub name: String,
    #[serde(serialize_with = "ser_millis")]
    pub elapsed: Duration,
}

fn ser_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
