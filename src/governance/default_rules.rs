//! Built-in governance rules

use super::Rule;

/// The shipped rule set. Kept minimal and project-agnostic; teams add
/// stricter rules through the same table.
pub fn default_rules() -> Vec<Rule> {
    vec![Rule {
        id: "EXAMPLE_IMPORTS_INTERNAL_ONLY".to_string(),
        category: "example".to_string(),
        severity: "warning".to_string(),
        description: "Example rule: list internal package imports".to_string(),
        enabled: false,
        query_sql: "
SELECT
  f.path AS file_path,
  f.path AS symbol,
  ('imports ' || replace(coalesce(n.node_text, ''), '\"', '')) AS detail,
  n.start_line AS line
FROM nodes n
JOIN files f ON f.file_id = n.file_id
WHERE n.kind = '*ast.ImportSpec'
  AND replace(coalesce(n.node_text, ''), '\"', '') LIKE '%/internal/%'
ORDER BY f.path, n.start_line
"
        .to_string(),
    }]
}
