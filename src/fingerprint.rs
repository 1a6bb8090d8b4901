//! Source-set fingerprinting
//!
//! The fingerprint is a 64-bit FNV-1a hash over the ordered
//! `(relative path, size, mtime)` tuples of the scanned file set. Size
//! and mtime stand in for content hashing; a touched but byte-identical
//! file invalidates the fingerprint. Callers that need content-level
//! stability can swap this module without touching the pipeline.

use crate::types::FileMeta;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

struct Fnv64(u64);

impl Fnv64 {
    fn new() -> Self {
        Fnv64(FNV_OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Hash the sorted file set into a lowercase hex fingerprint.
pub fn source_fingerprint(files: &[FileMeta]) -> String {
    let mut h = Fnv64::new();
    for f in files {
        h.write(f.rel_path.as_bytes());
        h.write(&[0]);
        h.write(f.size.to_string().as_bytes());
        h.write(&[0]);
        h.write(f.mod_unix_nano.to_string().as_bytes());
        h.write(&[0]);
    }
    format!("{:x}", h.0)
}

/// Derive a stable non-negative file id from a relative path.
pub fn file_id_for_path(path: &str) -> i64 {
    let mut h = Fnv64::new();
    h.write(path.as_bytes());
    (h.0 & 0x7fff_ffff_ffff_ffff) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(path: &str, size: u64, mtime: i64) -> FileMeta {
        FileMeta {
            rel_path: path.to_string(),
            size,
            mod_unix_nano: mtime,
        }
    }

    #[test]
    fn empty_set_is_offset_basis() {
        assert_eq!(source_fingerprint(&[]), "cbf29ce484222325");
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let files = vec![meta("a.go", 10, 111), meta("b/c.go", 20, 222)];
        assert_eq!(source_fingerprint(&files), source_fingerprint(&files));
    }

    #[test]
    fn fingerprint_tracks_every_field() {
        let base = vec![meta("a.go", 10, 111)];
        let fp = source_fingerprint(&base);
        assert_ne!(fp, source_fingerprint(&[meta("b.go", 10, 111)]));
        assert_ne!(fp, source_fingerprint(&[meta("a.go", 11, 111)]));
        assert_ne!(fp, source_fingerprint(&[meta("a.go", 10, 112)]));
    }

    #[test]
    fn file_id_is_stable_and_non_negative() {
        let id = file_id_for_path("pkg/astdb/runner.go");
        assert_eq!(id, file_id_for_path("pkg/astdb/runner.go"));
        assert!(id >= 0);
        assert_ne!(id, file_id_for_path("pkg/astdb/runner_test.go"));
    }
}
