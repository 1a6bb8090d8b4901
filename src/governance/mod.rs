//! Governance rule engine
//!
//! Rules live in the `governance_rules` table; each rule is a SQL query
//! whose result rows are violations. The runner validates and upserts
//! rules, executes the enabled set sequentially, and projects the
//! recognized output columns (`file_path`, `symbol`, `detail`, `line`)
//! into `Violation`s while preserving the full row.
//!
//! The runner holds only the database path; every operation opens a
//! fresh connection and drops it on exit.

mod default_rules;

pub use default_rules::default_rules;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use duckdb::types::ValueRef;
use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cancel::Cancellation;

/// Accepted rule severities, stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Severity::Critical),
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

/// A stored governance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub category: String,
    pub severity: String,
    pub description: String,
    pub query_sql: String,
    pub enabled: bool,
}

/// One result row of a rule query, projected onto the recognized
/// columns with the raw row preserved.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule_id: String,
    pub category: String,
    pub severity: String,
    pub file_path: String,
    pub symbol: String,
    pub detail: String,
    pub line: i64,
    pub raw_values: serde_json::Map<String, Value>,
}

/// A result row in map form.
pub type Row = serde_json::Map<String, Value>;

/// A result set in positional form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<Value>>,
}

/// Selection for a governance run; empty means all enabled rules.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub rule_ids: Vec<String>,
}

/// Trim every field, lowercase the severity.
pub fn normalize_rule(rule: &Rule) -> Rule {
    Rule {
        id: rule.id.trim().to_string(),
        category: rule.category.trim().to_string(),
        severity: rule.severity.trim().to_lowercase(),
        description: rule.description.trim().to_string(),
        query_sql: rule.query_sql.trim().to_string(),
        enabled: rule.enabled,
    }
}

/// Validate a rule after normalization.
pub fn validate_rule(rule: &Rule) -> Result<()> {
    let rule = normalize_rule(rule);
    if rule.id.is_empty() {
        bail!("rule id is required");
    }
    if rule.category.is_empty() {
        bail!("rule {}: category is required", rule.id);
    }
    if rule.description.is_empty() {
        bail!("rule {}: description is required", rule.id);
    }
    if rule.query_sql.is_empty() {
        bail!("rule {}: query_sql is required", rule.id);
    }
    if Severity::from_str(&rule.severity).is_none() {
        bail!("rule {}: invalid severity {:?}", rule.id, rule.severity);
    }
    Ok(())
}

pub struct Runner {
    db_path: PathBuf,
}

impl Runner {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("open duckdb at {}", self.db_path.display()))
    }

    /// Validate and upsert rules by id; `updated_unix` is set to now.
    pub fn upsert_rules(&self, rules: &[Rule]) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }
        let conn = self.open()?;
        conn.execute_batch(RULES_TABLE_DDL)
            .context("ensure governance_rules table")?;

        let mut stmt = conn
            .prepare(
                "INSERT INTO governance_rules \
                 (rule_id, category, severity, description, query_sql, enabled, updated_unix) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(rule_id) DO UPDATE SET \
                 category=excluded.category, \
                 severity=excluded.severity, \
                 description=excluded.description, \
                 query_sql=excluded.query_sql, \
                 enabled=excluded.enabled, \
                 updated_unix=excluded.updated_unix",
            )
            .context("prepare rule upsert")?;

        let now = unix_now();
        for rule in rules {
            let rule = normalize_rule(rule);
            validate_rule(&rule)?;
            stmt.execute(params![
                rule.id,
                rule.category,
                rule.severity,
                rule.description,
                rule.query_sql,
                rule.enabled,
                now,
            ])
            .with_context(|| format!("upsert rule {}", rule.id))?;
        }
        Ok(())
    }

    /// Idempotently install the built-in rule set.
    pub fn ensure_default_rules(&self) -> Result<()> {
        self.upsert_rules(&default_rules())
    }

    /// All rules, defaults included, ordered by id.
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        self.ensure_default_rules()?;
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT rule_id, category, severity, description, query_sql, enabled \
             FROM governance_rules ORDER BY rule_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Rule {
                id: row.get(0)?,
                category: row.get(1)?,
                severity: row.get(2)?,
                description: row.get(3)?,
                query_sql: row.get(4)?,
                enabled: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for rule in rows {
            out.push(rule?);
        }
        Ok(out)
    }

    /// Execute the enabled rules sequentially. A failing rule aborts the
    /// run with an error naming the rule; no partial violations are
    /// returned in that case.
    pub fn run(&self, opts: &RunOptions, cancel: &Cancellation) -> Result<Vec<Violation>> {
        let rules = self.list_rules()?;
        let selected: Vec<&Rule> = if opts.rule_ids.is_empty() {
            rules.iter().collect()
        } else {
            rules
                .iter()
                .filter(|r| opts.rule_ids.iter().any(|id| id == &r.id))
                .collect()
        };

        let conn = self.open()?;
        let mut out = Vec::new();
        for rule in selected {
            if !rule.enabled {
                continue;
            }
            cancel.check()?;
            debug!("running governance rule {}", rule.id);
            let (columns, rows) = collect_rows(&conn, &rule.query_sql)
                .map_err(|e| anyhow!("rule {}: {}", rule.id, e))?;
            for values in rows {
                let mut raw = serde_json::Map::with_capacity(columns.len());
                for (col, value) in columns.iter().zip(values) {
                    raw.insert(col.clone(), value);
                }
                out.push(Violation {
                    rule_id: rule.id.clone(),
                    category: rule.category.clone(),
                    severity: rule.severity.clone(),
                    file_path: string_field(raw.get("file_path")),
                    symbol: string_field(raw.get("symbol")),
                    detail: string_field(raw.get("detail")),
                    line: line_field(raw.get("line")),
                    raw_values: raw,
                });
            }
        }
        Ok(out)
    }

    /// Execute arbitrary SQL, returning rows in map form.
    pub fn adhoc_query(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.open()?;
        let (columns, rows) = collect_rows(&conn, sql)?;
        Ok(rows
            .into_iter()
            .map(|values| {
                let mut row = Row::with_capacity(columns.len());
                for (col, value) in columns.iter().zip(values) {
                    row.insert(col.clone(), value);
                }
                row
            })
            .collect())
    }

    /// Execute arbitrary SQL, returning columns and positional rows.
    pub fn query_table(&self, sql: &str) -> Result<Table> {
        let conn = self.open()?;
        let (columns, rows) = collect_rows(&conn, sql)?;
        Ok(Table { columns, rows })
    }
}

const RULES_TABLE_DDL: &str = "
CREATE TABLE IF NOT EXISTS governance_rules (
    rule_id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    description TEXT NOT NULL,
    query_sql TEXT NOT NULL,
    enabled BOOLEAN NOT NULL DEFAULT true,
    updated_unix BIGINT NOT NULL
);
";

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Run one query and materialize every row as JSON values. Column names
/// are read from the executed statement so they are present even for
/// empty result sets.
fn collect_rows(conn: &Connection, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut stmt = conn.prepare(sql)?;
    let mut out = Vec::new();
    {
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let count = row.as_ref().column_count();
            let mut values = Vec::with_capacity(count);
            for i in 0..count {
                values.push(value_to_json(row.get_ref(i)?));
            }
            out.push(values);
        }
    }
    let columns = stmt
        .column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    Ok((columns, out))
}

/// Normalize an engine value: bytes become strings, NULL stays null,
/// numbers keep their numeric shape.
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        ValueRef::UTinyInt(u) => Value::from(u),
        ValueRef::USmallInt(u) => Value::from(u),
        ValueRef::UInt(u) => Value::from(u),
        ValueRef::UBigInt(u) => Value::from(u),
        ValueRef::Float(f) => Value::from(f),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Value::String(format!("{other:?}")),
    }
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn line_field(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
