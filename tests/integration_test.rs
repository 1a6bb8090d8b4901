//! Integration tests for goastdb
//!
//! These tests drive the full pipeline end to end: scan a temp repo,
//! build the database, reuse it, and query it through the governance
//! runner and the bundled exploration queries.

use std::fs;
use std::path::{Path, PathBuf};

use goastdb::governance::{Rule, RunOptions, Runner};
use goastdb::{explore, parse_ids, run, Cancellation, Mode, Options};
use tempfile::tempdir;

fn write_go_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn test_options(root: &Path, db_path: &Path) -> Options {
    Options {
        repo_root: root.display().to_string(),
        duckdb_path: db_path.display().to_string(),
        mode: Mode::Build,
        query_bench: false,
        ..Default::default()
    }
}

fn db_path_for(root: &Path) -> PathBuf {
    root.join(".tmp").join("goastdb").join("ast.duckdb")
}

#[test]
fn test_build_then_reuse() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let mut opts = test_options(root, &db_path);
    let first = run(opts.clone(), &Cancellation::new()).unwrap();
    assert_eq!(first.sync.action, "rebuild");
    assert_eq!(first.sync.files_count, 1);
    assert!(first.sync.nodes_count > 0);

    opts.mode = Mode::Query;
    let second = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(second.sync.action, "reuse");
    assert_eq!(second.sync.reason, "up-to-date");
    assert_eq!(second.sync.files_count, 1);
    assert!(second.sync.nodes_count > 0);
}

#[test]
fn test_build_twice_reuses() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let opts = test_options(root, &db_path);
    let first = run(opts.clone(), &Cancellation::new()).unwrap();
    let second = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(first.sync.action, "rebuild");
    assert_eq!(second.sync.action, "reuse");
    assert_eq!(first.sync.files_count, second.sync.files_count);
    assert_eq!(first.sync.nodes_count, second.sync.nodes_count);
}

#[test]
fn test_source_change_triggers_rebuild() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let opts = test_options(root, &db_path);
    run(opts.clone(), &Cancellation::new()).unwrap();

    // Growing the file changes its size, which changes the fingerprint.
    write_go_file(
        root,
        "main.go",
        "package main\n\nfunc main() {}\n\nfunc helper() {}\n",
    );
    let second = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(second.sync.action, "rebuild");
    assert_eq!(second.sync.reason, "source changed");
}

#[test]
fn test_force_rebuild_wins() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let mut opts = test_options(root, &db_path);
    run(opts.clone(), &Cancellation::new()).unwrap();

    opts.force_rebuild = true;
    let second = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(second.sync.action, "rebuild");
    assert_eq!(second.sync.reason, "force rebuild enabled");
}

#[test]
fn test_subdir_escape_rejected() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let mut opts = test_options(root, &db_path_for(root));
    opts.subdir = "../outside".to_string();
    let err = run(opts, &Cancellation::new()).unwrap_err();
    assert!(err.to_string().contains("escapes repo root"));
}

#[test]
fn test_empty_tree_is_fatal() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("README.md"), "no go here").unwrap();

    let err = run(test_options(root, &db_path_for(root)), &Cancellation::new()).unwrap_err();
    assert!(err.to_string().contains("no .go files found"));
}

#[test]
fn test_parse_error_isolation() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "good.go", "package good\n\nfunc OK() {}\n");

    let opts = test_options(root, &db_path);
    let clean = run(opts.clone(), &Cancellation::new()).unwrap();
    assert_eq!(clean.sync.parse_errors, 0);

    let runner = Runner::new(&db_path);
    let before = runner
        .adhoc_query(
            "SELECT COUNT(*) AS n FROM nodes n JOIN files f ON f.file_id = n.file_id \
             WHERE f.path = 'good.go'",
        )
        .unwrap();

    write_go_file(root, "broken.go", "package broken\n\nfunc oops( {\n");
    let with_bad = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(with_bad.sync.action, "rebuild");
    assert_eq!(with_bad.sync.parse_errors, 1);
    assert_eq!(with_bad.sync.files_count, 2);

    let after = runner
        .adhoc_query(
            "SELECT COUNT(*) AS n FROM nodes n JOIN files f ON f.file_id = n.file_id \
             WHERE f.path = 'good.go'",
        )
        .unwrap();
    assert_eq!(before[0]["n"], after[0]["n"]);

    let errors = runner
        .adhoc_query("SELECT path, parse_error FROM files WHERE parse_error IS NOT NULL AND parse_error <> ''")
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], serde_json::json!("broken.go"));
}

#[test]
fn test_ordinals_are_dense_in_the_database() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(
        root,
        "a.go",
        "package a\n\nimport \"fmt\"\n\nfunc A(x int) {\n\tif x > 0 {\n\t\tfmt.Println(x)\n\t}\n}\n",
    );
    write_go_file(root, "b.go", "package b\n\ntype T struct {\n\tX int\n}\n");

    run(test_options(root, &db_path), &Cancellation::new()).unwrap();

    let runner = Runner::new(&db_path);
    let density = runner
        .adhoc_query(
            "SELECT file_id, COUNT(*) AS n, MIN(ordinal) AS lo, MAX(ordinal) AS hi \
             FROM nodes GROUP BY file_id",
        )
        .unwrap();
    assert_eq!(density.len(), 2);
    for row in &density {
        assert_eq!(row["lo"], serde_json::json!(1));
        assert_eq!(row["hi"], row["n"]);
    }

    let bad_parents = runner
        .adhoc_query(
            "SELECT COUNT(*) AS n FROM nodes \
             WHERE parent_ordinal IS NOT NULL AND parent_ordinal >= ordinal",
        )
        .unwrap();
    assert_eq!(bad_parents[0]["n"], serde_json::json!(0));

    let roots = runner
        .adhoc_query(
            "SELECT COUNT(*) AS n FROM nodes WHERE ordinal = 1 AND parent_ordinal IS NULL",
        )
        .unwrap();
    assert_eq!(roots[0]["n"], serde_json::json!(2));
}

#[test]
fn test_file_ids_are_stable_across_rebuilds() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "stable.go", "package stable\n\nfunc F() {}\n");

    let mut opts = test_options(root, &db_path);
    opts.force_rebuild = true;
    run(opts.clone(), &Cancellation::new()).unwrap();

    let runner = Runner::new(&db_path);
    let first = runner
        .adhoc_query("SELECT file_id FROM files WHERE path = 'stable.go'")
        .unwrap();

    run(opts, &Cancellation::new()).unwrap();
    let second = runner
        .adhoc_query("SELECT file_id FROM files WHERE path = 'stable.go'")
        .unwrap();
    assert_eq!(first[0]["file_id"], second[0]["file_id"]);
}

#[test]
fn test_governance_rule_flags_identifier() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(
        root,
        "svc.go",
        "package svc\n\nfunc testProdReadyFunction() {}\n",
    );

    run(test_options(root, &db_path), &Cancellation::new()).unwrap();

    let runner = Runner::new(&db_path);
    runner
        .upsert_rules(&[Rule {
            id: "NO_SCAFFOLD_NAMES".to_string(),
            category: "naming".to_string(),
            severity: "error".to_string(),
            description: "flag scaffolding identifiers left in production code".to_string(),
            query_sql: "SELECT f.path AS file_path, n.node_text AS symbol, \
                        'scaffolding identifier' AS detail, n.start_line AS line \
                        FROM nodes n JOIN files f ON f.file_id = n.file_id \
                        WHERE n.kind = '*ast.Ident' AND n.node_text = 'testProdReadyFunction'"
                .to_string(),
            enabled: true,
        }])
        .unwrap();

    let violations = runner
        .run(
            &RunOptions {
                rule_ids: vec!["NO_SCAFFOLD_NAMES".to_string()],
            },
            &Cancellation::new(),
        )
        .unwrap();
    assert!(!violations.is_empty());
    assert_eq!(violations[0].rule_id, "NO_SCAFFOLD_NAMES");
    assert_eq!(violations[0].file_path, "svc.go");
    assert_eq!(violations[0].symbol, "testProdReadyFunction");
}

#[test]
fn test_kind_distribution_helper() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(
        root,
        "main.go",
        "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
    );

    run(test_options(root, &db_path), &Cancellation::new()).unwrap();

    let query = explore::select_queries(&["AST_KIND_DISTRIBUTION".to_string()]).unwrap()[0];
    let runner = Runner::new(&db_path);
    let table = runner.query_table(query.sql).unwrap();
    assert_eq!(table.columns, vec!["kind", "n"]);
    assert!(!table.rows.is_empty());
    assert!(table.rows.len() <= 50);

    // Counts are ordered descending.
    let counts: Vec<i64> = table
        .rows
        .iter()
        .map(|row| row[1].as_i64().unwrap())
        .collect();
    let mut sorted = counts.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(counts, sorted);
}

#[test]
fn test_query_bench_reports_all_queries() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let mut opts = test_options(root, &db_path);
    opts.mode = Mode::Both;
    opts.query_bench = true;
    opts.query_warmup = 1;
    opts.query_iters = 2;
    let result = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(result.query_iters, 2);
    let names: Vec<_> = result
        .query_results
        .iter()
        .map(|q| q.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["count_nodes", "group_by_kind_top20", "funcdecl_join_files"]
    );
}

#[test]
fn test_discarding_output_removes_the_database() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "main.go", "package main\n\nfunc main() {}\n");

    let mut opts = test_options(root, &db_path);
    opts.keep_output_files = false;
    run(opts, &Cancellation::new()).unwrap();
    assert!(!db_path.exists());
}

#[test]
fn test_subdir_restricts_scan_but_keeps_root_relative_paths() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let db_path = db_path_for(root);
    write_go_file(root, "top.go", "package top\n");
    write_go_file(root, "inner/lib.go", "package inner\n\nfunc L() {}\n");

    let mut opts = test_options(root, &db_path);
    opts.subdir = "inner".to_string();
    let result = run(opts, &Cancellation::new()).unwrap();
    assert_eq!(result.scan_files, 1);
    assert_eq!(result.subdir, "inner");

    let runner = Runner::new(&db_path);
    let rows = runner.adhoc_query("SELECT path FROM files").unwrap();
    assert_eq!(rows[0]["path"], serde_json::json!("inner/lib.go"));
}

#[test]
fn test_parse_ids_contract() {
    let ids = parse_ids(&[" A,B ", "A", "", " C "]);
    assert_eq!(ids, vec!["A", "B", "C"]);
}
