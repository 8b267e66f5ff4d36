//! Field catalog: the injected schema lookup the matcher consults.
//!
//! How a field is compared (exact, analyzed, wildcard-optimized) is a
//! property of the search index, not of the query, so the catalog is an
//! explicit input everywhere. The matcher never hardcodes a mode; a field
//! missing from the catalog falls back to exact keyword semantics.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// How stored values of a field are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldMode {
    /// Case-sensitive literal comparison.
    Exact,
    /// Tokenized, case-insensitive comparison.
    Analyzed,
    /// Exact semantics on a wildcard-optimized index.
    WildcardOptimized,
}

/// The declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDataType {
    Keyword,
    Text,
    Wildcard,
    Long,
    Float,
    Boolean,
    Date,
    Ip,
}

/// Catalog entry for one field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub mode: FieldMode,
    pub data_type: FieldDataType,
}

impl FieldSpec {
    pub fn new(mode: FieldMode, data_type: FieldDataType) -> Self {
        FieldSpec { mode, data_type }
    }
}

/// Read-only lookup from dotted field path to [`FieldSpec`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: BTreeMap<String, FieldSpec>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        FieldCatalog::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, spec: FieldSpec) {
        self.fields.insert(path.into(), spec);
    }

    pub fn get(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Load a catalog from a YAML or JSON file, keyed on the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|e| e == "json");
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| EvalError::Rule {
            path: path.display().to_string(),
            message,
        })
    }

    /// The ECS subset provisioned on the reference test index.
    ///
    /// `process.name` and `process.command_line` are wildcard-optimized,
    /// `message` is analyzed text, everything else is exact.
    pub fn ecs_subset() -> Self {
        use FieldDataType::*;
        use FieldMode::*;

        let mut catalog = FieldCatalog::new();
        for path in [
            "event.code",
            "event.category",
            "event.type",
            "event.action",
            "event.module",
            "event.provider",
            "event.outcome",
        ] {
            catalog.insert(path, FieldSpec::new(Exact, Keyword));
        }
        catalog.insert("@timestamp", FieldSpec::new(Exact, Date));
        catalog.insert("process.name", FieldSpec::new(WildcardOptimized, Wildcard));
        catalog.insert(
            "process.command_line",
            FieldSpec::new(WildcardOptimized, Wildcard),
        );
        catalog.insert("process.executable", FieldSpec::new(Exact, Keyword));
        catalog.insert("process.pid", FieldSpec::new(Exact, Long));
        catalog.insert("process.parent.name", FieldSpec::new(Exact, Keyword));
        catalog.insert(
            "process.parent.command_line",
            FieldSpec::new(Exact, Keyword),
        );
        catalog.insert("file.name", FieldSpec::new(Exact, Keyword));
        catalog.insert("file.path", FieldSpec::new(Exact, Keyword));
        catalog.insert("file.extension", FieldSpec::new(Exact, Keyword));
        catalog.insert("user.name", FieldSpec::new(Exact, Keyword));
        catalog.insert("user.domain", FieldSpec::new(Exact, Keyword));
        catalog.insert("host.name", FieldSpec::new(Exact, Keyword));
        catalog.insert("source.ip", FieldSpec::new(Exact, Ip));
        catalog.insert("destination.ip", FieldSpec::new(Exact, Ip));
        catalog.insert("cloud.provider", FieldSpec::new(Exact, Keyword));
        catalog.insert("cloud.account.id", FieldSpec::new(Exact, Keyword));
        catalog.insert("message", FieldSpec::new(Analyzed, Text));
        catalog
    }
}
