//! Bridge configuration
//!
//! `BridgeOptions` is installed per context; `WrapOptions` can override the
//! per-wrapper subset when a single object is wrapped.
//!
//! ```toml
//! reject_unknown_properties = true
//! reject_lossy_numbers = false
//! to_string_alias = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Context-wide bridge options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeOptions {
    /// Reading or writing a member the host type does not declare raises
    /// `Unknown member: <name>` instead of falling back to script semantics
    pub reject_unknown_properties: bool,

    /// Host numbers that lose precision as engine numbers (wide integers,
    /// decimals) fail with a conversion error instead of being narrowed
    pub reject_lossy_numbers: bool,

    /// `toString` on a wrapped object resolves to the host `ToString`
    pub to_string_alias: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            reject_unknown_properties: false,
            reject_lossy_numbers: false,
            to_string_alias: true,
        }
    }
}

impl BridgeOptions {
    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Default options for wrappers created in this context
    pub fn wrap_options(&self) -> WrapOptions {
        WrapOptions {
            reject_unknown_properties: self.reject_unknown_properties,
        }
    }
}

/// Options fixed at wrap time for one wrapped object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WrapOptions {
    /// See `BridgeOptions::reject_unknown_properties`
    pub reject_unknown_properties: bool,
}
