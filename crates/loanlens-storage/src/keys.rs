//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{user_id}/{epoch_millis}.jpg`.

use loanlens_core::constants::{ANONYMOUS_USER_ID, EVIDENCE_EXTENSION};

/// Reduce a user id to a single safe path segment.
fn sanitize_segment(segment: &str) -> String {
    const MAX: usize = 128;
    let s: String = segment
        .trim()
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace("..", "__");
    match s.as_str() {
        "" => ANONYMOUS_USER_ID.to_string(),
        "." => "_".to_string(),
        _ => s,
    }
}

/// Generate the storage key for an evidence photo.
///
/// All backends must use this format so evidence for one user stays under
/// one prefix regardless of where it is stored.
pub fn evidence_key(prefix: &str, user_id: &str, epoch_millis: i64) -> String {
    format!(
        "{}/{}/{}.{}",
        prefix.trim_matches('/'),
        sanitize_segment(user_id),
        epoch_millis,
        EVIDENCE_EXTENSION
    )
}

/// Reject keys that could escape a backend's root.
pub(crate) fn validate_key(storage_key: &str) -> bool {
    !storage_key.is_empty() && !storage_key.contains("..") && !storage_key.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_namespaced_key() {
        assert_eq!(
            evidence_key("loan-evidence", "u1", 1_700_000_000_000),
            "loan-evidence/u1/1700000000000.jpg"
        );
        assert_eq!(
            evidence_key("/loan-evidence/", "u1", 5),
            "loan-evidence/u1/5.jpg"
        );
    }

    #[test]
    fn user_id_cannot_escape_prefix() {
        assert_eq!(
            evidence_key("loan-evidence", "../etc", 1),
            "loan-evidence/___etc/1.jpg"
        );
        assert_eq!(
            evidence_key("loan-evidence", "jane..doe", 1),
            "loan-evidence/jane__doe/1.jpg"
        );
        assert_eq!(evidence_key("loan-evidence", ".", 1), "loan-evidence/_/1.jpg");
        assert!(validate_key(&evidence_key("loan-evidence", "...", 1)));
        assert_eq!(
            evidence_key("loan-evidence", "a/b c", 1),
            "loan-evidence/a_b_c/1.jpg"
        );
        assert_eq!(evidence_key("loan-evidence", "", 1), "loan-evidence/anonymous/1.jpg");
    }

    #[test]
    fn validates_keys() {
        assert!(validate_key("loan-evidence/u1/1.jpg"));
        assert!(!validate_key("/abs/path"));
        assert!(!validate_key("a/../b"));
        assert!(!validate_key(""));
    }
}
