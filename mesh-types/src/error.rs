//! Error types for the docmesh wire format.

use thiserror::Error;

/// Errors that can occur while encoding or decoding broadcast frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WireError>();
    }

    #[test]
    fn decode_error_display_is_prefixed() {
        let err = rmp_serde::from_slice::<u8>(&[]).unwrap_err();
        let wire = WireError::Deserialization(err);
        assert!(wire.to_string().starts_with("deserialization failed"));
    }
}
