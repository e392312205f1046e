//! Schema fingerprinting
//!
//! A fingerprint is a 32-bit rolling hash of the schema definition text,
//! rendered as lowercase hex. It only has to be stable and cheap, so it is
//! not a cryptographic digest.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Marker stored when the schema source could not be read
pub const UNKNOWN_FINGERPRINT: &str = "unknown";

/// Hex fingerprint of a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    /// Fingerprint `schema_text`
    ///
    /// Hashes UTF-16 code units with `h = h * 31 + unit` in wrapping `i32`
    /// arithmetic and formats the absolute value as hex.
    pub fn compute(schema_text: &str) -> Self {
        let hash = schema_text
            .encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));

        Self(format!("{:x}", hash.unsigned_abs()))
    }

    /// The sentinel used when the schema could not be read
    pub fn unknown() -> Self {
        Self(UNKNOWN_FINGERPRINT.to_string())
    }

    /// Fingerprint the schema file at `path`, falling back to the sentinel
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::compute(&text),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not read schema file, using unknown fingerprint"
                );
                Self::unknown()
            }
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_FINGERPRINT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deterministic() {
        let schema = "model User { id Int }";
        assert_eq!(
            SchemaFingerprint::compute(schema),
            SchemaFingerprint::compute(schema)
        );
    }

    #[test]
    fn test_known_values() {
        // "a" = 97, "ab" = 97 * 31 + 98
        assert_eq!(SchemaFingerprint::compute("").as_str(), "0");
        assert_eq!(SchemaFingerprint::compute("a").as_str(), "61");
        assert_eq!(SchemaFingerprint::compute("ab").as_str(), "c21");
    }

    #[test]
    fn test_differs_on_schema_change() {
        let before = SchemaFingerprint::compute("model User { id Int }");
        let after = SchemaFingerprint::compute("model User { id Int name String }");
        assert_ne!(before, after);
    }

    #[test]
    fn test_wraparound_is_stable() {
        let long = "model Appointment { id Int }\n".repeat(500);
        let first = SchemaFingerprint::compute(&long);
        assert_eq!(first, SchemaFingerprint::compute(&long));
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(first.as_str().len() <= 8);
    }

    #[test]
    fn test_non_ascii_schema() {
        let fp = SchemaFingerprint::compute("// Patiënt — 患者");
        assert!(!fp.is_unknown());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schema.prisma");
        std::fs::write(&path, "model User { id Int }").unwrap();

        assert_eq!(
            SchemaFingerprint::from_file(&path),
            SchemaFingerprint::compute("model User { id Int }")
        );
    }

    #[test]
    fn test_missing_file_yields_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let fp = SchemaFingerprint::from_file(&temp_dir.path().join("missing.prisma"));
        assert!(fp.is_unknown());
        assert_eq!(fp.to_string(), UNKNOWN_FINGERPRINT);
    }
}
