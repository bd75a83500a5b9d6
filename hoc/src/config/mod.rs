//! Session configuration
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! precision = 8      # significant digits printed
//! max_stack = 256    # operand stack depth
//! max_steps = 100000 # instruction budget per line (absent = unbounded)
//! history = true     # keep REPL history in ~/.hoc_history
//! ```

use crate::error::HocError;
use crate::machine::{Limits, DEFAULT_MAX_STACK};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub precision: usize,
    pub max_stack: usize,
    pub max_steps: Option<u64>,
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            precision: 8,
            max_stack: DEFAULT_MAX_STACK,
            max_steps: None,
            history: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, HocError> {
        let config: Config = toml::from_str(source).map_err(|e| HocError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, HocError> {
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading config");
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), HocError> {
        if self.precision == 0 || self.precision > 17 {
            return Err(HocError::config(format!(
                "precision must be between 1 and 17, got {}",
                self.precision
            )));
        }
        if self.max_stack == 0 {
            return Err(HocError::config("max_stack must be positive"));
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_stack: self.max_stack,
            max_steps: self.max_steps,
        }
    }
}
