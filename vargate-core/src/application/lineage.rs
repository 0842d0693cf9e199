// vargate-core/src/application/lineage.rs
//
// Lineage report: the DAG (or one table's upstream slice of it) as nodes,
// edges and traversal layers, rendered to JSON or Mermaid.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::error::DomainError;
use crate::domain::lineage::{Layer, LineageRegistry, TableDescriptor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageReport {
    /// Table the report was focused on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    /// Kahn layers: every table appears after all of its upstreams.
    pub layers: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub name: String,
    pub layer: Layer,
    pub grain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from: String,
    pub to: String,
}

impl LineageReport {
    pub fn full(registry: &LineageRegistry) -> Result<Self, DomainError> {
        Ok(Self::from_tables(None, registry.list_all().iter().collect(), registry.plan_layers()?))
    }

    /// `name` and everything upstream of it.
    pub fn upstream_of(registry: &LineageRegistry, name: &str) -> Result<Self, DomainError> {
        let root = registry.describe(name)?;
        let mut tables = vec![root];
        tables.extend(registry.upstream_chain(name)?);

        let keep: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let layers = registry
            .plan_layers()?
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .filter(|t| keep.contains(t.as_str()))
                    .collect::<Vec<_>>()
            })
            .filter(|layer| !layer.is_empty())
            .collect();

        // Declaration order reads better than BFS order in a report.
        let ordered = registry
            .list_all()
            .iter()
            .filter(|t| keep.contains(t.name.as_str()))
            .collect();
        Ok(Self::from_tables(Some(name.to_string()), ordered, layers))
    }

    fn from_tables(
        focus: Option<String>,
        tables: Vec<&TableDescriptor>,
        layers: Vec<Vec<String>>,
    ) -> Self {
        let nodes = tables
            .iter()
            .map(|t| LineageNode {
                name: t.name.clone(),
                layer: t.layer,
                grain: t.grain.clone(),
            })
            .collect();
        let edges = tables
            .iter()
            .flat_map(|t| {
                t.upstream.iter().map(|up| LineageEdge {
                    from: up.clone(),
                    to: t.name.clone(),
                })
            })
            .collect();
        Self {
            focus,
            nodes,
            edges,
            layers,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["graph LR".to_string()];
        for node in &self.nodes {
            lines.push(format!("    {}[\"{} ({})\"]", node.name, node.name, node.layer));
        }
        for edge in &self.edges {
            lines.push(format!("    {} --> {}", edge.from, edge.to));
        }
        if let Some(focus) = &self.focus {
            lines.push(format!("    style {focus} fill:#ffd166,stroke:#b08900"));
        }
        lines.join("\n")
    }
}
