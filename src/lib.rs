//! goastdb: index Go source trees into DuckDB
//!
//! Builds a queryable relational snapshot of a Go codebase: one row per
//! source file and one row per AST node, loaded into a single-file
//! DuckDB database. Uses tree-sitter for parsing and the engine's
//! appender path for bulk loading.
//!
//! ## Pipeline
//!
//! - Scan: enumerate `.go` files deterministically, fingerprint the set
//! - Decide: reuse the existing database when fingerprint and schema
//!   version match, rebuild otherwise
//! - Parse: a worker pool linearizes each file's AST into rows
//! - Load: bulk-append rows and run metadata in one transaction
//!
//! On top of the database sit ad-hoc SQL, a registry of exploration
//! queries, and a governance runner that turns stored SQL rules into
//! violation streams.

pub mod bench;
pub mod cancel;
pub mod db;
pub mod explore;
pub mod fingerprint;
pub mod governance;
pub mod parse;
pub mod scan;
pub mod sync;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

pub use cancel::Cancellation;
pub use types::{Mode, Options, QueryBench, RunResult, SyncStats};

/// Run the indexing pipeline and, depending on mode, the built-in query
/// benchmarks. This is the single entry point behind the CLI.
pub fn run(opts: Options, cancel: &Cancellation) -> Result<RunResult> {
    let opts = normalize_options(opts)?;

    let repo_root = fs::canonicalize(Path::new(&opts.repo_root))
        .with_context(|| format!("resolve repo root {:?}", opts.repo_root))?;
    let root_meta = fs::metadata(&repo_root).context("stat repo root")?;
    if !root_meta.is_dir() {
        bail!("repo root is not a directory: {}", repo_root.display());
    }
    if !opts.subdir.is_empty() {
        scan::validate_subdir(&opts.subdir)?;
    }

    let db_path = PathBuf::from(&opts.duckdb_path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("create db dir")?;
        }
    }

    let scan_start = Instant::now();
    let metas = scan::collect_go_files(&repo_root, &opts.subdir, opts.max_files, cancel)?;
    if metas.is_empty() {
        bail!("no .go files found");
    }
    let scan_elapsed = scan_start.elapsed();
    info!("scan found {} files in {:?}", metas.len(), scan_elapsed);

    let fingerprint = fingerprint::source_fingerprint(&metas);
    let state = db::inspect(&db_path);
    let decision = sync::decide(opts.force_rebuild, opts.reuse, &state, &fingerprint);

    let mut result = RunResult {
        scan_files: metas.len(),
        scan_elapsed,
        subdir: opts.subdir.clone(),
        max_files: opts.max_files,
        ..Default::default()
    };

    if !decision.rebuild {
        info!("reusing database: {}", decision.reason);
        result.sync = SyncStats {
            action: decision.action().to_string(),
            reason: decision.reason.to_string(),
            files_count: state.files_count,
            nodes_count: state.nodes_count,
            ..Default::default()
        };
    } else {
        info!("rebuilding database: {}", decision.reason);
        let parse_start = Instant::now();
        let parsed = parse::parse_files(&repo_root, &metas, opts.workers, cancel)?;
        let parse_elapsed = parse_start.elapsed();

        let load_start = Instant::now();
        db::write_database(&db_path, &parsed.files, &parsed.nodes, &fingerprint, cancel)?;
        let load_elapsed = load_start.elapsed();

        let counts = db::inspect(&db_path);
        result.sync = SyncStats {
            action: decision.action().to_string(),
            reason: decision.reason.to_string(),
            changed: metas.len(),
            parse_errors: parsed.parse_errors,
            parse_elapsed,
            load_elapsed,
            files_count: counts.files_count,
            nodes_count: counts.nodes_count,
        };
    }

    if opts.query_bench && matches!(opts.mode, Mode::Both | Mode::Query) {
        let benches = bench::benchmark_queries(
            &db_path,
            bench::default_queries(),
            opts.query_warmup,
            opts.query_iters,
            cancel,
        )?;
        result.query_warmup = opts.query_warmup;
        result.query_iters = opts.query_iters.max(1);
        result.query_results = benches;
    }

    if !opts.keep_output_files {
        db::remove_db_files(&db_path);
    }

    Ok(result)
}

/// Fill defaults and reject invalid combinations before any I/O.
fn normalize_options(mut opts: Options) -> Result<Options> {
    if opts.repo_root.trim().is_empty() {
        opts.repo_root = ".".to_string();
    }
    if opts.duckdb_path.trim().is_empty() {
        opts.duckdb_path = Options::default().duckdb_path;
    }
    if opts.workers == 0 {
        opts.workers = 1;
    }
    if opts.query_iters == 0 {
        bail!("query-iters must be > 0");
    }
    opts.subdir = clean_subdir(&opts.subdir);
    Ok(opts)
}

// A leading separator is dropped so the scanner always joins the
// subdir under the repo root instead of replacing it.
fn clean_subdir(subdir: &str) -> String {
    let trimmed = subdir.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed == "." {
        return String::new();
    }
    trimmed.to_string()
}

/// Split possibly comma-separated values into trimmed, de-duplicated
/// ids, preserving first-seen order.
pub fn parse_ids<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        for part in value.as_ref().split(',') {
            let id = part.trim();
            if id.is_empty() {
                continue;
            }
            if out.iter().any(|seen| seen == id) {
                continue;
            }
            out.push(id.to_string());
        }
    }
    out
}
