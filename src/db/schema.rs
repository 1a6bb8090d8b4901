//! Database schema definition

/// Version stored in `run_meta`; bumping it invalidates every existing
/// database because the kind-label family is part of the schema.
pub const SCHEMA_VERSION: &str = "1";

pub const SCHEMA: &str = r#"
-- Files table: one row per scanned source file
CREATE TABLE IF NOT EXISTS files (
    file_id BIGINT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    pkg_name TEXT,
    parse_error TEXT,
    bytes BIGINT
);

-- Nodes table: one row per AST node, keyed by (file_id, ordinal)
CREATE TABLE IF NOT EXISTS nodes (
    file_id BIGINT NOT NULL,
    ordinal INTEGER NOT NULL,
    parent_ordinal INTEGER,
    kind TEXT NOT NULL,
    node_text TEXT,
    pos INTEGER,
    "end" INTEGER,
    start_line INTEGER,
    start_col INTEGER,
    end_line INTEGER,
    end_col INTEGER,
    start_offset INTEGER,
    end_offset INTEGER,
    PRIMARY KEY (file_id, ordinal)
);

-- Run metadata: schema version, source fingerprint, update time
CREATE TABLE IF NOT EXISTS run_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Governance rules: each rule is a stored SQL query over files/nodes
CREATE TABLE IF NOT EXISTS governance_rules (
    rule_id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    description TEXT NOT NULL,
    query_sql TEXT NOT NULL,
    enabled BOOLEAN NOT NULL DEFAULT true,
    updated_unix BIGINT NOT NULL
);
"#;
