// vargate-core/src/domain/lineage/registry.rs

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::error::DomainError;
use crate::domain::lineage::dag::GraphSolver;
use crate::domain::lineage::{Layer, TableDescriptor};

/// Immutable table dependency graph, validated at construction.
#[derive(Debug, Clone)]
pub struct LineageRegistry {
    tables: Vec<TableDescriptor>,
    index: HashMap<String, usize>,
    downstream: Vec<Vec<usize>>,
}

impl LineageRegistry {
    pub fn new(tables: Vec<TableDescriptor>) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(tables.len());
        for (i, table) in tables.iter().enumerate() {
            if index.insert(table.name.clone(), i).is_some() {
                return Err(DomainError::DuplicateTable(table.name.clone()));
            }
        }

        for table in &tables {
            for upstream in &table.upstream {
                if !index.contains_key(upstream) {
                    return Err(DomainError::UnknownUpstream {
                        table: table.name.clone(),
                        upstream: upstream.clone(),
                    });
                }
            }
        }

        if let Some(path) = GraphSolver::find_cycle(&tables) {
            return Err(DomainError::CycleDetected(path.join(" -> ")));
        }

        let mut downstream = vec![Vec::new(); tables.len()];
        for (i, table) in tables.iter().enumerate() {
            for upstream in &table.upstream {
                let up = index[upstream];
                if tables[up].layer > table.layer {
                    return Err(DomainError::LayerViolation {
                        table: table.name.clone(),
                        table_layer: table.layer.to_string(),
                        upstream: upstream.clone(),
                        upstream_layer: tables[up].layer.to_string(),
                    });
                }
                downstream[up].push(i);
            }
        }

        tracing::debug!(tables = tables.len(), "Lineage registry loaded");

        Ok(Self {
            tables,
            index,
            downstream,
        })
    }

    pub fn describe(&self, name: &str) -> Result<&TableDescriptor, DomainError> {
        self.index
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| DomainError::TableNotFound(name.to_string()))
    }

    /// All tables in declaration order.
    pub fn list_all(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn by_layer(&self, layer: Layer) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter().filter(move |t| t.layer == layer)
    }

    /// Every transitive upstream table, nearest first, each once.
    pub fn upstream_chain(&self, name: &str) -> Result<Vec<&TableDescriptor>, DomainError> {
        let start = self.position(name)?;
        Ok(self.breadth_first(start, |i| {
            self.tables[i]
                .upstream
                .iter()
                .filter_map(|u| self.index.get(u).copied())
                .collect()
        }))
    }

    /// Every transitive downstream table, nearest first, each once.
    pub fn downstream_of(&self, name: &str) -> Result<Vec<&TableDescriptor>, DomainError> {
        let start = self.position(name)?;
        Ok(self.breadth_first(start, |i| self.downstream[i].clone()))
    }

    /// Topological layers (Kahn). Roots first.
    pub fn plan_layers(&self) -> Result<Vec<Vec<String>>, DomainError> {
        GraphSolver::plan_layers(&self.tables)
    }

    fn position(&self, name: &str) -> Result<usize, DomainError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DomainError::TableNotFound(name.to_string()))
    }

    fn breadth_first<F>(&self, start: usize, neighbors: F) -> Vec<&TableDescriptor>
    where
        F: Fn(usize) -> Vec<usize>,
    {
        let mut seen: HashSet<usize> = HashSet::from([start]);
        let mut queue: VecDeque<usize> = VecDeque::from([start]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            for next in neighbors(current) {
                if seen.insert(next) {
                    out.push(&self.tables[next]);
                    queue.push_back(next);
                }
            }
        }
        out
    }
}
