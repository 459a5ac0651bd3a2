//! KDL configuration for the script bridge
//!
//! # Example
//!
//! ```kdl
//! bridge {
//!     globals naming=#true markup=#true json=#false
//!     verbatim "Update" "Draw"
//! }
//! ```
//!
//! Every node is optional. Missing nodes keep the defaults: all script
//! globals registered and no verbatim names.

use crate::{Error, Result};
use std::path::Path;

/// Which script globals the engine registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalsConfig {
    /// `to_camel`
    pub naming: bool,
    /// `markup`
    pub markup: bool,
    /// `json_decode` and `json_get`
    pub json: bool,
}

impl Default for GlobalsConfig {
    fn default() -> Self {
        Self {
            naming: true,
            markup: true,
            json: true,
        }
    }
}

/// Script bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub globals: GlobalsConfig,
    /// Member names every installed proxy forwards without translation
    pub verbatim_names: Vec<String>,
}

impl BridgeConfig {
    /// Parse a KDL file into a BridgeConfig
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading bridge config from {}", path.display());
        Self::from_string(&content)
    }

    /// Parse a KDL string into a BridgeConfig
    pub fn from_string(content: &str) -> Result<Self> {
        let doc: kdl::KdlDocument = content.parse()?;
        let mut config = Self::default();

        let Some(bridge) = doc.nodes().iter().find(|n| n.name().value() == "bridge") else {
            return Ok(config);
        };
        let Some(children) = bridge.children() else {
            return Ok(config);
        };

        for node in children.nodes() {
            match node.name().value() {
                "globals" => config.globals = Self::parse_globals(node)?,
                "verbatim" => {
                    for entry in node.entries() {
                        if entry.name().is_some() {
                            return Err(Error::InvalidConfig(
                                "verbatim takes names as arguments, not properties".to_string(),
                            ));
                        }
                        match entry.value() {
                            kdl::KdlValue::String(s) => config.verbatim_names.push(s.clone()),
                            other => {
                                return Err(Error::InvalidConfig(format!(
                                    "verbatim name must be a string, got {}",
                                    other
                                )))
                            }
                        }
                    }
                }
                other => {
                    tracing::warn!("Ignoring unknown bridge config node {}", other);
                }
            }
        }

        Ok(config)
    }

    fn parse_globals(node: &kdl::KdlNode) -> Result<GlobalsConfig> {
        let mut globals = GlobalsConfig::default();

        for entry in node.entries() {
            let Some(name) = entry.name() else {
                return Err(Error::InvalidConfig(
                    "globals takes properties such as markup=#true".to_string(),
                ));
            };
            let enabled = match entry.value() {
                kdl::KdlValue::Bool(b) => *b,
                other => {
                    return Err(Error::InvalidConfig(format!(
                        "globals.{} must be a boolean, got {}",
                        name.value(),
                        other
                    )))
                }
            };
            match name.value() {
                "naming" => globals.naming = enabled,
                "markup" => globals.markup = enabled,
                "json" => globals.json = enabled,
                other => {
                    return Err(Error::InvalidConfig(format!("unknown global set {}", other)))
                }
            }
        }

        Ok(globals)
    }
}
