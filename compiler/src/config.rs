use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::FieldGenError;

pub const DEFAULT_INPUT:  &str = "struct_parser.h";
pub const DEFAULT_HEADER: &str = "enum.h";
pub const DEFAULT_SOURCE: &str = "enum.c";

/// Naming convention and vocabulary used when parsing and emitting.
///
/// Every key is optional in a JSON config file; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Module namespace stripped from structure names to derive the short
    /// name (`evfs_inode` -> `inode`) and the enum prefix (`INODE_`).
    pub namespace_prefix: String,
    /// Extra primitive type names the classifier accepts, e.g. `kuid_t`.
    pub extra_types:      Vec<String>,
    /// File name of the generated enum header, included by the source artifact.
    pub header_name:      String,
    /// File name of the parsed structure header, included by the source artifact.
    pub struct_header:    String,
    /// Additional include targets for the source artifact, with their delimiters.
    pub includes:         Vec<String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            namespace_prefix: "evfs_".to_string(),
            extra_types:      Vec::new(),
            header_name:      DEFAULT_HEADER.to_string(),
            struct_header:    DEFAULT_INPUT.to_string(),
            includes:         vec!["<errno.h>".to_string()],
        }
    }
}

impl GenConfig {
    pub fn from_json(text: &str) -> Result<Self, FieldGenError> {
        let config: GenConfig = serde_json::from_str(text)
            .map_err(|e| FieldGenError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, FieldGenError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), FieldGenError> {
        if self.header_name.trim().is_empty() {
            return Err(FieldGenError::Config("header_name must not be empty".to_string()));
        }
        if let Some(bad) = self
            .extra_types
            .iter()
            .find(|t| !t.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
                || !t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(FieldGenError::Config(format!(
                "extra type {:?} is not a C identifier",
                bad
            )));
        }
        Ok(())
    }
}
