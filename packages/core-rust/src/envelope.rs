use serde::{Deserialize, Serialize};

/// Value of the `error` field when the store could not be initialized.
pub const STORE_NOT_INITIALIZED: &str = "Database not initialized";

/// Failure message used when the initializer fails without a usable message.
pub const UNKNOWN_INIT_ERROR: &str = "Unknown database initialization error";

/// Legacy client error model nested inside [`ErrorEnvelope`].
///
/// Field names are PascalCase on the wire for compatibility with older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorModel {
    pub message: String,
    pub object: String,
}

/// JSON body returned when a request cannot be served because the store
/// failed to initialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable error code.
    pub error: String,
    /// The initializer's failure message, verbatim.
    pub error_description: String,
    #[serde(rename = "ErrorModel")]
    pub error_model: ErrorModel,
}

impl ErrorEnvelope {
    /// Builds the envelope for a failed store initialization.
    #[must_use]
    pub fn store_not_initialized(message: &str) -> Self {
        Self {
            error: STORE_NOT_INITIALIZED.to_string(),
            error_description: message.to_string(),
            error_model: ErrorModel {
                message: message.to_string(),
                object: "error".to_string(),
            },
        }
    }
}
