//! Built-in query benchmarks
//!
//! Times a small fixed set of queries against the finished database.
//! Results are drained fully so the measurement covers materialization,
//! not just statement preparation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::cancel::Cancellation;
use crate::types::QueryBench;

/// A named benchmark query.
#[derive(Debug, Clone, Copy)]
pub struct BenchQuery {
    pub name: &'static str,
    pub sql: &'static str,
}

pub fn default_queries() -> &'static [BenchQuery] {
    &[
        BenchQuery {
            name: "count_nodes",
            sql: "SELECT COUNT(*) FROM nodes",
        },
        BenchQuery {
            name: "group_by_kind_top20",
            sql: "SELECT kind, COUNT(*) AS n FROM nodes GROUP BY kind ORDER BY n DESC LIMIT 20",
        },
        BenchQuery {
            name: "funcdecl_join_files",
            sql: "SELECT f.path, COUNT(*) AS n FROM nodes n JOIN files f ON f.file_id=n.file_id \
                  WHERE n.kind='*ast.FuncDecl' GROUP BY f.path ORDER BY n DESC LIMIT 50",
        },
    ]
}

/// Run each query `warmup` times untimed, then `iters` times timed.
pub fn benchmark_queries(
    db_path: &Path,
    queries: &[BenchQuery],
    warmup: usize,
    iters: usize,
    cancel: &Cancellation,
) -> Result<Vec<QueryBench>> {
    let iters = iters.max(1);
    let conn = Connection::open(db_path)
        .with_context(|| format!("open duckdb at {}", db_path.display()))?;

    let mut out = Vec::with_capacity(queries.len());
    for q in queries {
        cancel.check()?;
        for _ in 0..warmup {
            execute_query(&conn, q.sql).with_context(|| format!("warmup query {}", q.name))?;
        }
        let start = Instant::now();
        for _ in 0..iters {
            execute_query(&conn, q.sql).with_context(|| format!("benchmark query {}", q.name))?;
        }
        out.push(QueryBench {
            name: q.name.to_string(),
            elapsed: start.elapsed(),
        });
    }
    Ok(out)
}

fn execute_query(conn: &Connection, sql: &str) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let count = row.as_ref().column_count();
        for i in 0..count {
            let _ = row.get_ref(i)?;
        }
    }
    Ok(())
}
