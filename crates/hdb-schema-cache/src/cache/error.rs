//! Cache backend errors

use thiserror::Error;

/// Failure of a cache backend or of value encoding
///
/// A miss is never an error: backends return `Ok(None)` for absent keys.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Connection(String),

    #[error("Failed to encode cached value: {0}")]
    Serialization(String),

    /// Stored bytes are not a value of the expected kind
    #[error("Failed to decode cached value: {0}")]
    Deserialization(String),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cached value of {size} bytes exceeds the {max} byte limit")]
    ValueTooLarge { size: usize, max: usize },

    /// The backend files entries by the tag inside their key
    #[error("Entry keyed under {key_tag} cannot be written under {tag}")]
    TagMismatch { key_tag: String, tag: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_detail() {
        let cases = [
            (CacheError::Connection("refused".into()), "refused"),
            (CacheError::Serialization("bad float".into()), "encode"),
            (CacheError::Deserialization("APP.T: eof".into()), "APP.T"),
            (CacheError::Timeout, "timed out"),
            (
                CacheError::TagMismatch {
                    key_tag: "tag:a".into(),
                    tag: "tag:shared".into(),
                },
                "tag:shared",
            ),
        ];

        for (err, needle) in cases {
            assert!(err.to_string().contains(needle), "{err}");
        }
    }

    #[test]
    fn test_value_too_large_reports_both_sizes() {
        let msg = CacheError::ValueTooLarge {
            size: 2_000_000,
            max: 1_048_576,
        }
        .to_string();

        assert!(msg.contains("2000000"));
        assert!(msg.contains("1048576"));
    }
}
