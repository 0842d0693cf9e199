// vargate-core/src/domain/lineage/dag.rs

use crate::domain::error::DomainError;
use crate::domain::lineage::TableDescriptor;
use std::collections::{HashMap, VecDeque};

pub struct GraphSolver;

impl GraphSolver {
    /// Groups tables into dependency layers (Topological Sort with Layers).
    /// Layer N only reads from layers 0..N-1. Within a layer, declaration order is kept.
    pub fn plan_layers(tables: &[TableDescriptor]) -> Result<Vec<Vec<String>>, DomainError> {
        let position: HashMap<&str, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut in_degree: Vec<usize> = vec![0; tables.len()];
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];

        // 1. Graph Construction (upstream -> downstream)
        for (idx, table) in tables.iter().enumerate() {
            for upstream in &table.upstream {
                if let Some(&up) = position.get(upstream.as_str()) {
                    adj_list[up].push(idx);
                    in_degree[idx] += 1;
                }
            }
        }

        // 2. Kahn's Algorithm (Layered)
        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut queue: VecDeque<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut total_resolved = 0;

        while !queue.is_empty() {
            let layer_size = queue.len();
            let mut current_layer = Vec::with_capacity(layer_size);

            for _ in 0..layer_size {
                if let Some(current) = queue.pop_front() {
                    current_layer.push(current);
                    total_resolved += 1;

                    for &neighbor in &adj_list[current] {
                        in_degree[neighbor] -= 1;
                        if in_degree[neighbor] == 0 {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }

            current_layer.sort_unstable();
            let mut next: Vec<usize> = queue.drain(..).collect();
            next.sort_unstable();
            queue.extend(next);

            layers.push(
                current_layer
                    .into_iter()
                    .map(|i| tables[i].name.clone())
                    .collect(),
            );
        }

        // 3. Cycle Detection
        if total_resolved != tables.len() {
            let path = Self::find_cycle(tables)
                .map(|p| p.join(" -> "))
                .unwrap_or_else(|| format!("resolved {}/{} tables", total_resolved, tables.len()));
            return Err(DomainError::CycleDetected(path));
        }

        Ok(layers)
    }

    /// Depth-first search over upstream edges. Returns the first cycle found,
    /// closed on its starting table (`a -> b -> a`).
    pub fn find_cycle(tables: &[TableDescriptor]) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let position: HashMap<&str, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();
        let mut marks = vec![Mark::Unvisited; tables.len()];

        for root in 0..tables.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // Explicit stack of (table, next upstream index to explore).
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::InProgress;

            while let Some(&(node, cursor)) = stack.last() {
                let upstream = &tables[node].upstream;
                if cursor >= upstream.len() {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                }
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let next_name = &upstream[cursor];

                let Some(&next) = position.get(next_name.as_str()) else {
                    continue;
                };
                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        stack.push((next, 0));
                    }
                    Mark::InProgress => {
                        let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                        let mut path: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(n, _)| tables[n].name.clone())
                            .collect();
                        path.push(tables[next].name.clone());
                        return Some(path);
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }
}
