//! `vaultgate` core — request classification rules and error envelopes.

pub mod classify;
pub mod envelope;

pub use classify::{
    ClassifyRule, MethodFilter, PathClassifier, PathPattern, StoreRequirement, SKIP_RULES,
};
pub use envelope::{ErrorEnvelope, ErrorModel, STORE_NOT_INITIALIZED, UNKNOWN_INIT_ERROR};
