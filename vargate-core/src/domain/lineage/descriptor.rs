// vargate-core/src/domain/lineage/descriptor.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Warehouse layer. Ordinals must not decrease from upstream to downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Raw,
    Staging,
    Fact,
    Intermediate,
    Mart,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Raw,
        Layer::Staging,
        Layer::Fact,
        Layer::Intermediate,
        Layer::Mart,
    ];

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Layer::Raw => "raw",
            Layer::Staging => "staging",
            Layer::Fact => "fact",
            Layer::Intermediate => "intermediate",
            Layer::Mart => "mart",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub layer: Layer,
    #[serde(default)]
    pub description: String,
    pub grain: String,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub measure_columns: Vec<String>,
    #[serde(default)]
    pub upstream: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, layer: Layer, grain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer,
            description: String::new(),
            grain: grain.into(),
            key_columns: Vec::new(),
            measure_columns: Vec::new(),
            upstream: Vec::new(),
            transformations: Vec::new(),
        }
    }

    pub fn with_upstream(mut self, upstream: &[&str]) -> Self {
        self.upstream = upstream.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn is_root(&self) -> bool {
        self.upstream.is_empty()
    }
}

/// On-disk shape of a lineage catalog (`tables:` list, declaration order kept).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageCatalog {
    #[serde(default)]
    pub tables: Vec<TableDescriptor>,
}
