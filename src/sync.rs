//! Reuse-or-rebuild decision
//!
//! Compares the current fingerprint and compiled schema version against
//! the inspected database state. The reason string is chosen by the
//! first matching predicate, so an explicit force wins over a missing
//! database in the reported explanation.

use crate::db::SCHEMA_VERSION;
use crate::types::Inspect;

/// Outcome of comparing the inspected database with the current scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub rebuild: bool,
    pub reason: &'static str,
}

impl Decision {
    pub fn action(&self) -> &'static str {
        if self.rebuild {
            "rebuild"
        } else {
            "reuse"
        }
    }
}

pub fn decide(force_rebuild: bool, reuse: bool, state: &Inspect, fingerprint: &str) -> Decision {
    let fingerprint_changed =
        !state.source_fingerprint.is_empty() && state.source_fingerprint != fingerprint;
    let rebuild = force_rebuild
        || !reuse
        || !state.exists
        || state.schema_version != SCHEMA_VERSION
        || fingerprint_changed;

    let reason = if force_rebuild {
        "force rebuild enabled"
    } else if !reuse {
        "reuse disabled"
    } else if !state.exists {
        "database missing"
    } else if state.schema_version != SCHEMA_VERSION {
        "schema changed"
    } else if fingerprint_changed {
        "source changed"
    } else {
        "up-to-date"
    };

    Decision { rebuild, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_state(fp: &str) -> Inspect {
        Inspect {
            exists: true,
            schema_version: SCHEMA_VERSION.to_string(),
            source_fingerprint: fp.to_string(),
            files_count: 3,
            nodes_count: 30,
        }
    }

    #[test]
    fn matching_state_reuses() {
        let d = decide(false, true, &current_state("abc"), "abc");
        assert!(!d.rebuild);
        assert_eq!(d.reason, "up-to-date");
        assert_eq!(d.action(), "reuse");
    }

    #[test]
    fn missing_database_rebuilds() {
        let d = decide(false, true, &Inspect::default(), "abc");
        assert!(d.rebuild);
        assert_eq!(d.reason, "database missing");
    }

    #[test]
    fn schema_bump_rebuilds() {
        let mut state = current_state("abc");
        state.schema_version = "0".to_string();
        let d = decide(false, true, &state, "abc");
        assert!(d.rebuild);
        assert_eq!(d.reason, "schema changed");
    }

    #[test]
    fn fingerprint_change_rebuilds() {
        let d = decide(false, true, &current_state("abc"), "def");
        assert!(d.rebuild);
        assert_eq!(d.reason, "source changed");
    }

    #[test]
    fn empty_stored_fingerprint_does_not_trip_source_changed() {
        let mut state = current_state("");
        state.source_fingerprint = String::new();
        let d = decide(false, true, &state, "abc");
        assert!(!d.rebuild);
        assert_eq!(d.reason, "up-to-date");
    }

    #[test]
    fn force_wins_over_every_other_reason() {
        let d = decide(true, true, &Inspect::default(), "abc");
        assert!(d.rebuild);
        assert_eq!(d.reason, "force rebuild enabled");
    }

    #[test]
    fn disabled_reuse_wins_over_missing() {
        let d = decide(false, false, &Inspect::default(), "abc");
        assert!(d.rebuild);
        assert_eq!(d.reason, "reuse disabled");
    }
}
