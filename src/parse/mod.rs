//! Parallel parsing stage
//!
//! A bounded worker pool reads and parses each discovered file and
//! emits one `FileRow` plus its linearized `NodeRow`s. Workers are
//! independent; each owns its tree-sitter parser and shares nothing but
//! the two channels. Arrival order is unspecified, so the pool re-sorts
//! its output (files by path, nodes by file id then ordinal) before
//! handing rows to the writer. Per-file failures are recorded in the
//! row and counted; they never abort the run.

mod kinds;
mod linearize;

pub use linearize::{linearize, Linearized};

use std::fs;
use std::path::Path;

use anyhow::Result;
use crossbeam_channel::bounded;
use tracing::debug;
use tree_sitter::Parser;

use crate::cancel::Cancellation;
use crate::fingerprint::file_id_for_path;
use crate::types::{FileMeta, FileRow, NodeRow};

/// Sorted output of the pool.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub files: Vec<FileRow>,
    pub nodes: Vec<NodeRow>,
    pub parse_errors: usize,
}

struct ParsedFile {
    file: FileRow,
    nodes: Vec<NodeRow>,
}

/// Parse every file in `metas` with `workers` threads.
pub fn parse_files(
    repo_root: &Path,
    metas: &[FileMeta],
    workers: usize,
    cancel: &Cancellation,
) -> Result<ParseOutput> {
    let workers = workers.max(1);
    let (job_tx, job_rx) = bounded::<FileMeta>(workers * 2);
    // Sized to the whole batch so workers never block on the way out.
    let (out_tx, out_rx) = bounded::<ParsedFile>(metas.len().max(1));

    let mut out = ParseOutput::default();
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                let mut parser = go_parser();
                // Keep draining after cancellation so the feeder never
                // blocks on a full channel.
                for meta in job_rx.iter() {
                    if cancel.is_cancelled() {
                        continue;
                    }
                    let parsed = parse_file(parser.as_mut(), repo_root, &meta);
                    if out_tx.send(parsed).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        for meta in metas {
            if cancel.is_cancelled() {
                break;
            }
            if job_tx.send(meta.clone()).is_err() {
                break;
            }
        }
        drop(job_tx);

        for parsed in out_rx.iter() {
            if !parsed.file.parse_error.is_empty() {
                out.parse_errors += 1;
            }
            out.files.push(parsed.file);
            out.nodes.extend(parsed.nodes);
        }
    });
    cancel.check()?;

    out.files.sort_by(|a, b| a.path.cmp(&b.path));
    out.nodes.sort_by_key(|n| (n.file_id, n.ordinal));
    debug!(
        "parsed {} files into {} nodes ({} parse errors)",
        out.files.len(),
        out.nodes.len(),
        out.parse_errors
    );
    Ok(out)
}

fn go_parser() -> Option<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .ok()?;
    Some(parser)
}

fn parse_file(parser: Option<&mut Parser>, repo_root: &Path, meta: &FileMeta) -> ParsedFile {
    let file_id = file_id_for_path(&meta.rel_path);
    let mut row = FileRow {
        file_id,
        path: meta.rel_path.clone(),
        ..Default::default()
    };

    let abs = repo_root.join(&meta.rel_path);
    let source = match fs::read(&abs) {
        Ok(bytes) => bytes,
        Err(err) => {
            row.parse_error = format!("read {}: {}", meta.rel_path, err);
            return ParsedFile { file: row, nodes: Vec::new() };
        }
    };
    row.bytes = source.len() as i64;

    let Some(parser) = parser else {
        row.parse_error = "go grammar unavailable".to_string();
        return ParsedFile { file: row, nodes: Vec::new() };
    };
    let Some(tree) = parser.parse(&source, None) else {
        row.parse_error = format!("parse {}: parser produced no tree", meta.rel_path);
        return ParsedFile { file: row, nodes: Vec::new() };
    };

    let lin = linearize(file_id, &meta.rel_path, &source, &tree);
    row.pkg_name = lin.pkg_name;
    if let Some(err) = lin.parse_error {
        row.parse_error = err;
    }
    ParsedFile { file: row, nodes: lin.rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) -> FileMeta {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        FileMeta {
            rel_path: rel.to_string(),
            size: content.len() as u64,
            mod_unix_nano: 0,
        }
    }

    #[test]
    fn parses_files_and_sorts_output() {
        let dir = tempdir().unwrap();
        let mut metas = vec![
            write(dir.path(), "z.go", "package z\n\nfunc Z() {}\n"),
            write(dir.path(), "a.go", "package a\n\nfunc A() {}\n"),
        ];
        // Feed unsorted on purpose; the pool must re-sort.
        metas.reverse();

        let out = parse_files(dir.path(), &metas, 2, &Cancellation::new()).unwrap();
        assert_eq!(out.parse_errors, 0);
        let paths: Vec<_> = out.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.go", "z.go"]);
        let keys: Vec<_> = out.nodes.iter().map(|n| (n.file_id, n.ordinal)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn broken_file_is_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let metas = vec![
            write(dir.path(), "good.go", "package good\n\nfunc OK() {}\n"),
            write(dir.path(), "bad.go", "package bad\n\nfunc broken( {\n"),
        ];

        let out = parse_files(dir.path(), &metas, 2, &Cancellation::new()).unwrap();
        assert_eq!(out.parse_errors, 1);
        assert_eq!(out.files.len(), 2);

        let bad = out.files.iter().find(|f| f.path == "bad.go").unwrap();
        assert!(bad.parse_error.contains("syntax error"));
        let good = out.files.iter().find(|f| f.path == "good.go").unwrap();
        assert!(good.parse_error.is_empty());
        assert_eq!(good.pkg_name, "good");
        // The broken file still contributes best-effort rows.
        assert!(out.nodes.iter().any(|n| n.file_id == bad.file_id));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let metas = vec![FileMeta {
            rel_path: "ghost.go".to_string(),
            size: 0,
            mod_unix_nano: 0,
        }];
        let out = parse_files(dir.path(), &metas, 1, &Cancellation::new()).unwrap();
        assert_eq!(out.parse_errors, 1);
        assert!(out.files[0].parse_error.starts_with("read ghost.go"));
        assert!(out.nodes.is_empty());
    }

    #[test]
    fn cancellation_surfaces_after_draining() {
        let dir = tempdir().unwrap();
        let metas = vec![write(dir.path(), "a.go", "package a\n")];
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(parse_files(dir.path(), &metas, 2, &cancel).is_err());
    }
}
