//! DuckDB storage layer
//!
//! Owns the two sides of the database lifecycle:
//! - the inspector, which reads version/fingerprint/counts from an
//!   existing database without ever failing (absence means rebuild)
//! - the writer, which rebuilds the database atomically from sorted
//!   rows using the engine's appender bulk-load path
//!
//! Every operation opens its own connection and closes it on exit; the
//! writer and the governance runner never share a handle.

mod schema;

pub use schema::{SCHEMA, SCHEMA_VERSION};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use duckdb::{params, Connection};
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::types::{default_workers, FileRow, Inspect, NodeRow};

// =========================================================================
// Inspection
// =========================================================================

/// Read the state of an existing database. A missing file, an
/// unopenable file, or unreadable core tables all yield the zero value
/// with `exists: false`; that is a signal to rebuild, not an error.
pub fn inspect(path: &Path) -> Inspect {
    if !path.is_file() {
        return Inspect::default();
    }
    let Ok(conn) = Connection::open(path) else {
        return Inspect::default();
    };

    let Ok(files_count) = conn.query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0)) else {
        return Inspect::default();
    };
    let Ok(nodes_count) = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0)) else {
        return Inspect::default();
    };

    let mut state = Inspect {
        exists: true,
        files_count,
        nodes_count,
        ..Default::default()
    };
    let Ok(mut stmt) = conn.prepare("SELECT key, value FROM run_meta") else {
        return Inspect::default();
    };
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    });
    let Ok(rows) = rows else {
        return Inspect::default();
    };
    for row in rows.flatten() {
        match row.0.as_str() {
            "schema_version" => state.schema_version = row.1,
            "source_fingerprint" => state.source_fingerprint = row.1,
            _ => {}
        }
    }
    state
}

// =========================================================================
// Writing
// =========================================================================

/// Rebuild the database at `path` from sorted rows. The previous file
/// and its side files are removed first; all appends and the metadata
/// upsert happen inside one transaction, so a failure leaves no
/// half-written database behind.
pub fn write_database(
    path: &Path,
    files: &[FileRow],
    nodes: &[NodeRow],
    fingerprint: &str,
    cancel: &Cancellation,
) -> Result<()> {
    remove_db_files(path);
    let mut conn = Connection::open(path)
        .with_context(|| format!("open duckdb at {}", path.display()))?;
    conn.execute_batch(&format!("PRAGMA threads={};", default_workers()))
        .context("set engine threads")?;
    conn.execute_batch(SCHEMA).context("create schema")?;

    let result = append_all(&mut conn, files, nodes, fingerprint, cancel);
    if result.is_err() {
        // The file was freshly created; take it down with the failure.
        drop(conn);
        remove_db_files(path);
    }
    result
}

fn append_all(
    conn: &mut Connection,
    files: &[FileRow],
    nodes: &[NodeRow],
    fingerprint: &str,
    cancel: &Cancellation,
) -> Result<()> {
    let tx = conn.transaction().context("begin transaction")?;

    {
        let mut appender = tx.appender("files").context("open files appender")?;
        for (i, f) in files.iter().enumerate() {
            if i % 4096 == 0 {
                cancel.check()?;
            }
            let parse_error = if f.parse_error.is_empty() {
                None
            } else {
                Some(f.parse_error.as_str())
            };
            appender
                .append_row(params![f.file_id, f.path, f.pkg_name, parse_error, f.bytes])
                .with_context(|| format!("append file row {}", f.path))?;
        }
        appender.flush().context("flush files appender")?;
    }

    {
        let mut appender = tx.appender("nodes").context("open nodes appender")?;
        for (i, n) in nodes.iter().enumerate() {
            if i % 4096 == 0 {
                cancel.check()?;
            }
            appender
                .append_row(params![
                    n.file_id,
                    n.ordinal,
                    n.parent_ordinal,
                    n.kind,
                    n.node_text,
                    n.pos,
                    n.end,
                    n.start_line,
                    n.start_col,
                    n.end_line,
                    n.end_col,
                    n.start_offset,
                    n.end_offset,
                ])
                .with_context(|| format!("append node row {}:{}", n.file_id, n.ordinal))?;
        }
        appender.flush().context("flush nodes appender")?;
    }

    write_meta(&tx, fingerprint)?;
    tx.commit().context("commit")?;
    debug!("loaded {} files and {} nodes", files.len(), nodes.len());
    Ok(())
}

fn write_meta(conn: &Connection, fingerprint: &str) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut stmt = conn
        .prepare(
            "INSERT INTO run_meta (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        )
        .context("prepare run_meta upsert")?;
    for (key, value) in [
        ("schema_version", SCHEMA_VERSION.to_string()),
        ("source_fingerprint", fingerprint.to_string()),
        ("updated_unix", now.to_string()),
    ] {
        stmt.execute(params![key, value])
            .with_context(|| format!("upsert run_meta {key}"))?;
    }
    Ok(())
}

/// Remove a database file and the engine side files it may have left.
pub fn remove_db_files(path: &Path) {
    let mut targets = vec![path.to_path_buf()];
    for suffix in [".wal", "-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        targets.push(PathBuf::from(side));
    }
    for target in targets {
        if let Err(err) = fs::remove_file(&target) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove {}: {}", target.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file_row(id: i64, path: &str) -> FileRow {
        FileRow {
            file_id: id,
            path: path.to_string(),
            pkg_name: "main".to_string(),
            parse_error: String::new(),
            bytes: 42,
        }
    }

    fn node_row(file_id: i64, ordinal: i32, parent: Option<i32>, kind: &str) -> NodeRow {
        NodeRow {
            file_id,
            ordinal,
            parent_ordinal: parent,
            kind: kind.to_string(),
            node_text: String::new(),
            pos: ordinal,
            end: ordinal + 1,
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: 2,
            start_offset: 0,
            end_offset: 1,
        }
    }

    #[test]
    fn inspect_missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let state = inspect(&dir.path().join("nope.db"));
        assert_eq!(state, Inspect::default());
    }

    #[test]
    fn inspect_garbage_file_reports_nonexistent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        fs::write(&path, b"this is not a database").unwrap();
        let state = inspect(&path);
        assert!(!state.exists);
    }

    #[test]
    fn write_then_inspect_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ast.db");
        let files = vec![file_row(1, "main.go")];
        let nodes = vec![
            node_row(1, 1, None, "*ast.File"),
            node_row(1, 2, Some(1), "*ast.Ident"),
        ];

        write_database(&path, &files, &nodes, "deadbeef", &Cancellation::new()).unwrap();

        let state = inspect(&path);
        assert!(state.exists);
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.source_fingerprint, "deadbeef");
        assert_eq!(state.files_count, 1);
        assert_eq!(state.nodes_count, 2);
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ast.db");
        let nodes = vec![node_row(1, 1, None, "*ast.File")];
        write_database(&path, &[file_row(1, "a.go")], &nodes, "v1", &Cancellation::new()).unwrap();

        let files = vec![file_row(1, "a.go"), file_row(2, "b.go")];
        let nodes = vec![
            node_row(1, 1, None, "*ast.File"),
            node_row(2, 1, None, "*ast.File"),
        ];
        write_database(&path, &files, &nodes, "v2", &Cancellation::new()).unwrap();

        let state = inspect(&path);
        assert_eq!(state.files_count, 2);
        assert_eq!(state.nodes_count, 2);
        assert_eq!(state.source_fingerprint, "v2");
    }

    #[test]
    fn cancelled_write_leaves_no_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ast.db");
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = write_database(
            &path,
            &[file_row(1, "a.go")],
            &[node_row(1, 1, None, "*ast.File")],
            "fp",
            &cancel,
        );
        assert!(err.is_err());
        assert!(!path.exists());
    }
}
