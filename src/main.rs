//! goastdb: index Go source trees into DuckDB
//!
//! Usage:
//!   goastdb                          Index the current repo and report
//!   goastdb query "<sql>"            Index, then run ad-hoc SQL
//!   goastdb helper list              List bundled exploration queries
//!   goastdb helper <id>[,<id>...]    Run selected exploration queries
//!   goastdb rules list               List governance rules
//!   goastdb rules run [--rules a,b]  Run enabled governance rules

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use goastdb::explore::{self, ExploreQuery};
use goastdb::governance::{Rule, RunOptions, Runner, Violation};
use goastdb::{parse_ids, run, Cancellation, Mode, Options, RunResult};

#[derive(Parser)]
#[command(
    name = "goastdb",
    version,
    about = "Index Go source trees into DuckDB and query them with SQL"
)]
struct Cli {
    /// Repository root to scan
    #[arg(long, default_value = ".")]
    repo: String,

    /// Optional subdirectory under the repo root
    #[arg(long, default_value = "")]
    subdir: String,

    /// Cap on the number of .go files (0 = all)
    #[arg(long, default_value_t = 0)]
    max_files: usize,

    /// Parser worker count
    #[arg(long, default_value_t = goastdb::types::default_workers())]
    workers: usize,

    /// DuckDB output path (default: <repo>/.goast/ast.db)
    #[arg(long)]
    duckdb: Option<String>,

    /// Run mode: build, query, or both
    #[arg(long, default_value = "both", value_parser = parse_mode)]
    mode: Mode,

    /// Reuse the existing DB when the fingerprint matches
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    reuse: bool,

    /// Force a full rebuild
    #[arg(long)]
    force_rebuild: bool,

    /// Run the built-in query benchmarks
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    query_bench: bool,

    /// Warmup runs per benchmarked query
    #[arg(long, default_value_t = 2)]
    query_warmup: usize,

    /// Measured iterations per benchmarked query
    #[arg(long, default_value_t = 8)]
    query_iters: usize,

    /// Keep the output DB file
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    keep: bool,

    /// Optional run timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format: text or json
    #[arg(long, default_value = "text", value_parser = parse_format)]
    format: Format,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run an ad-hoc SQL query after indexing
    Query {
        /// SQL to execute against the database
        sql: String,
    },
    /// List bundled exploration queries or run a selection of them
    Helper {
        /// "list", or query ids (comma separation allowed)
        ids: Vec<String>,
    },
    /// Manage and run governance rules
    Rules {
        #[command(subcommand)]
        action: RulesCommand,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List governance rules, defaults included
    List,
    /// Run enabled governance rules
    Run {
        /// Comma-separated rule ids (default: all enabled)
        #[arg(long)]
        rules: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::from_str(s).ok_or_else(|| format!("invalid mode {s:?} (expected build, query, or both)"))
}

fn parse_format(s: &str) -> Result<Format, String> {
    match s {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        _ => Err(format!("invalid format {s:?} (expected text or json)")),
    }
}

/// Everything a run can produce, for the JSON output mode.
#[derive(Serialize)]
struct Envelope<'a> {
    result: &'a RunResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    adhoc_rows: Vec<goastdb::governance::Row>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rules: Vec<Rule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    helpers: Vec<HelperOutput>,
}

#[derive(Serialize)]
struct HelperOutput {
    id: String,
    description: String,
    #[serde(flatten)]
    table: goastdb::governance::Table,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn run_cli(cli: Cli) -> Result<()> {
    let cancel = match cli.timeout {
        Some(secs) => Cancellation::with_timeout(Duration::from_secs(secs)),
        None => Cancellation::new(),
    };

    let duckdb_path = cli
        .duckdb
        .clone()
        .unwrap_or_else(|| default_db_path(&cli.repo));
    let opts = Options {
        repo_root: cli.repo.clone(),
        subdir: cli.subdir.clone(),
        max_files: cli.max_files,
        workers: cli.workers,
        duckdb_path: duckdb_path.clone(),
        mode: cli.mode,
        reuse: cli.reuse,
        force_rebuild: cli.force_rebuild,
        query_bench: cli.query_bench,
        query_warmup: cli.query_warmup,
        query_iters: cli.query_iters,
        keep_output_files: cli.keep,
    };

    let result = run(opts, &cancel)?;
    let runner = Runner::new(&duckdb_path);

    let mut adhoc_rows = Vec::new();
    let mut violations = Vec::new();
    let mut rules = Vec::new();
    let mut helpers = Vec::new();

    match &cli.command {
        None => {}
        Some(Command::Query { sql }) => {
            adhoc_rows = runner.adhoc_query(sql)?;
        }
        Some(Command::Helper { ids }) => {
            let ids = parse_ids(ids);
            if ids.is_empty() || (ids.len() == 1 && ids[0] == "list") {
                print_helper_list(&cli, explore::default_queries())?;
                return Ok(());
            }
            for query in explore::select_queries(&ids)? {
                let table = runner.query_table(query.sql)?;
                helpers.push(HelperOutput {
                    id: query.id.to_string(),
                    description: query.description.to_string(),
                    table,
                });
            }
        }
        Some(Command::Rules { action }) => match action {
            RulesCommand::List => {
                rules = runner.list_rules()?;
            }
            RulesCommand::Run { rules: selected } => {
                let rule_ids = selected
                    .as_deref()
                    .map(|csv| parse_ids(&[csv]))
                    .unwrap_or_default();
                violations = runner.run(&RunOptions { rule_ids }, &cancel)?;
            }
        },
    }

    match cli.format {
        Format::Json => {
            let envelope = Envelope {
                result: &result,
                adhoc_rows,
                violations,
                rules,
                helpers,
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Format::Text => {
            print_result(&result);
            print_helpers(&helpers);
            print_rules(&rules);
            print_violations(&cli, &violations);
            print_adhoc(&cli, &adhoc_rows);
        }
    }
    Ok(())
}

fn default_db_path(repo: &str) -> String {
    PathBuf::from(repo)
        .join(".goast")
        .join("ast.db")
        .display()
        .to_string()
}

fn print_result(result: &RunResult) {
    println!(
        "scan: files={} subdir={:?} max_files={} scan_ms={}",
        result.scan_files,
        result.subdir,
        result.max_files,
        result.scan_elapsed.as_millis()
    );
    println!(
        "build: action={} reason={:?} changed={} parse_errors={} parse_ms={} load_ms={}",
        result.sync.action,
        result.sync.reason,
        result.sync.changed,
        result.sync.parse_errors,
        result.sync.parse_elapsed.as_millis(),
        result.sync.load_elapsed.as_millis()
    );
    println!(
        "db: files={} nodes={}",
        result.sync.files_count, result.sync.nodes_count
    );

    if !result.query_results.is_empty() {
        println!(
            "queries: warmup={} iters={}",
            result.query_warmup, result.query_iters
        );
        for (i, q) in result.query_results.iter().enumerate() {
            let total_ms = q.elapsed.as_millis();
            let avg_ms = total_ms as f64 / result.query_iters.max(1) as f64;
            println!(
                "query[{}] {}: total_ms={} avg_ms={:.3}",
                i + 1,
                q.name,
                total_ms,
                avg_ms
            );
        }
    }
}

fn print_helper_list(cli: &Cli, queries: &[ExploreQuery]) -> Result<()> {
    if cli.format == Format::Json {
        println!("{}", serde_json::to_string_pretty(queries)?);
        return Ok(());
    }
    println!("helpers: total={}", queries.len());
    for q in queries {
        println!("helper={} desc={:?}", q.id, q.description);
    }
    Ok(())
}

fn print_helpers(helpers: &[HelperOutput]) {
    for helper in helpers {
        println!(
            "helper {} ({}): rows={}",
            helper.id,
            helper.description,
            helper.table.rows.len()
        );
        println!("  columns={}", helper.table.columns.join(", "));
        for row in &helper.table.rows {
            let cells: Vec<String> = row.iter().map(render_value).collect();
            println!("  {}", cells.join(" | "));
        }
    }
}

fn print_rules(rules: &[Rule]) {
    if rules.is_empty() {
        return;
    }
    println!("rules: total={}", rules.len());
    for rule in rules {
        println!(
            "rule={} enabled={} severity={} category={} desc={:?}",
            rule.id, rule.enabled, rule.severity, rule.category, rule.description
        );
    }
}

fn print_violations(cli: &Cli, violations: &[Violation]) {
    let ran_rules = matches!(
        cli.command,
        Some(Command::Rules {
            action: RulesCommand::Run { .. }
        })
    );
    if !ran_rules {
        return;
    }
    println!("governance violations={}", violations.len());
    for (i, v) in violations.iter().enumerate() {
        println!(
            "violation[{}] rule={} severity={} file={} line={} detail={:?}",
            i + 1,
            v.rule_id,
            v.severity,
            v.file_path,
            v.line,
            v.detail
        );
    }
}

fn print_adhoc(cli: &Cli, rows: &[goastdb::governance::Row]) {
    if !matches!(cli.command, Some(Command::Query { .. })) {
        return;
    }
    println!("adhoc rows={}", rows.len());
    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|(k, v)| format!("{}={}", k, render_value(v)))
            .collect();
        println!("row[{}] {}", i + 1, cells.join(" "));
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
