//! Error types for the streaming relay and control plane.
//!
//! ## Error Categories
//!
//! - **BadRequest**: malformed client input (query values); mapped to HTTP 400
//!   and guaranteed to have caused no hardware side effect
//! - **Hardware**: a driver command failed after validation
//! - **Transcoder**: spawning or feeding the external transcoding process failed
//! - **Capture**: the frame source could not produce a frame
//! - **Listener**: a control or stream listener could not bind or serve
//! - **Config**: configuration file could not be read or parsed

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Main error type for the relay.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("invalid value for '{field}': {details}")]
    BadRequest { field: String, details: String },

    #[error("hardware command failed: {operation}")]
    Hardware {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("transcoder error: {context}")]
    Transcoder {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("capture error: {context}")]
    Capture {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("listener error: {context}")]
    Listener {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file error: {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RelayError {
    /// Returns whether this error was caused by client input.
    ///
    /// Client errors surface as HTTP 400 responses; everything else is a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::BadRequest { .. })
    }

    /// Helper constructor for client input errors.
    pub fn bad_request(field: impl Into<String>, details: impl Into<String>) -> Self {
        RelayError::BadRequest { field: field.into(), details: details.into() }
    }

    /// Helper constructor for hardware command errors.
    pub fn hardware(operation: impl Into<String>) -> Self {
        RelayError::Hardware { operation: operation.into(), source: None }
    }

    /// Helper constructor for hardware command errors with a driver source.
    pub fn hardware_with_source(
        operation: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RelayError::Hardware { operation: operation.into(), source: Some(source) }
    }

    /// Helper constructor for transcoder process errors.
    pub fn transcoder(context: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Transcoder { context: context.into(), source: Some(source) }
    }

    /// Helper constructor for capture errors.
    pub fn capture(context: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Capture { context: context.into(), source: Some(source) }
    }

    /// Helper constructor for listener bind/serve errors.
    pub fn listener(context: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Listener { context: context.into(), source }
    }

    /// Helper constructor for config file errors.
    pub fn config(path: PathBuf, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        RelayError::Config { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_contain_their_context(
                field in "\\w+",
                details in "\\PC*",
                operation in "\\PC*"
            ) {
                let bad = RelayError::bad_request(field.clone(), details.clone());
                let msg = bad.to_string();
                prop_assert!(msg.contains(&field));
                prop_assert!(msg.contains(&details));

                let hw = RelayError::hardware(operation.clone());
                prop_assert!(hw.to_string().contains(&operation));
                prop_assert!(!hw.to_string().is_empty());
            }

            #[test]
            fn only_bad_request_classifies_as_client_error(
                text in "\\PC*"
            ) {
                prop_assert!(RelayError::bad_request("f", text.clone()).is_client_error());
                prop_assert!(!RelayError::hardware(text.clone()).is_client_error());
                prop_assert!(
                    !RelayError::transcoder(
                        text.clone(),
                        std::io::Error::other("x")
                    ).is_client_error()
                );
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        // Compile-time check: RelayError must be Send + Sync + 'static
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RelayError>();

        let error = RelayError::bad_request("pan", "not an integer");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::other("broken pipe");
        let err = RelayError::transcoder("writing frame", io);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("broken pipe"));
    }
}
