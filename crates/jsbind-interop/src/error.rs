//! Bridge error types

use std::rc::Rc;

use jsbind_engine::EngineError;
use jsbind_sdk::HostException;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while converting values or dispatching members
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// Member lookup failed with "reject unknown properties" enabled
    #[error("Unknown member: {name}")]
    UnknownMember {
        /// Requested member name
        name: String,
    },

    /// No overload (or no delegate signature) accepts the supplied arguments
    #[error("{}", argument_mismatch_message(.method))]
    ArgumentMismatch {
        /// Method name; `None` for delegates, whose message stays generic
        method: Option<String>,
    },

    /// A host member raised
    #[error("{0}")]
    HostException(Rc<HostException>),

    /// A numeric value cannot be represented exactly as an engine number
    #[error("{value} cannot be represented exactly as {target}")]
    ConversionLoss {
        /// The source value
        value: String,
        /// The target representation
        target: &'static str,
    },

    /// Execution is terminating; nothing may be raised
    #[error("execution is terminating")]
    TerminationInProgress,

    /// A wrapper token no longer resolves in its context
    #[error("wrapped object is no longer available")]
    StaleHandle,

    /// A script function was used with a context other than its own
    #[error("script function belongs to a different context")]
    ContextMismatch,

    /// A script exception or termination propagating through the bridge
    #[error("{0}")]
    Engine(#[from] EngineError),
}

fn argument_mismatch_message(method: &Option<String>) -> String {
    match method {
        Some(name) => format!("Argument mismatch for method \"{name}\"."),
        None => "Argument mismatch".to_string(),
    }
}

impl From<Rc<HostException>> for BridgeError {
    fn from(e: Rc<HostException>) -> Self {
        BridgeError::HostException(e)
    }
}

/// Errors loading bridge configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
