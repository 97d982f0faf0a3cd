//! # Image Adjacency Graph
//!
//! Undirected multigraph over image serial numbers. Each vertex records the
//! points that have a measure in that image; each edge carries a strength
//! equal to the number of non-ignored measure pairs (in non-ignored points)
//! joining the two images.
//!
//! The graph never looks at points itself. `ControlNet` drives it through
//! `attach_measure` / `detach_measure` and `add_edge` / `remove_edge`, one
//! unit of strength per co-observing measure pair.
//!
//! ## Determinism
//!
//! - `serials()` and `connected_components()` follow vertex insertion order.
//! - `adjacent()`, `edges()` and the per-vertex point lists are sorted.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hashbrown::{HashMap, HashSet};

use crate::{Error, Result};

// ============================================================================
// Vertex
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Vertex {
    /// Ids of points with a measure in this image.
    points: BTreeSet<String>,
    /// neighbor serial → strength (always > 0)
    edges: BTreeMap<String, u32>,
}

// ============================================================================
// AdjacencyGraph
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjacencyGraph {
    order: Vec<String>,
    vertices: HashMap<String, Vertex>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the vertex was created.
    pub fn add_vertex(&mut self, serial: &str) -> bool {
        if self.vertices.contains_key(serial) {
            return false;
        }
        self.vertices.insert(serial.to_string(), Vertex::default());
        self.order.push(serial.to_string());
        true
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.vertices.contains_key(serial)
    }

    /// Record that `point_id` has a measure in `serial`. Edges are untouched.
    pub fn attach_measure(&mut self, serial: &str, point_id: &str) {
        self.add_vertex(serial);
        if let Some(vertex) = self.vertices.get_mut(serial) {
            vertex.points.insert(point_id.to_string());
        }
    }

    /// Forget the measure of `point_id` in `serial`. The vertex stays even
    /// when it becomes empty.
    pub fn detach_measure(&mut self, serial: &str, point_id: &str) -> bool {
        self.vertices
            .get_mut(serial)
            .is_some_and(|vertex| vertex.points.remove(point_id))
    }

    /// Re-key every attachment of `old_id` under `new_id`.
    pub fn rename_point<'s>(
        &mut self,
        old_id: &str,
        new_id: &str,
        serials: impl IntoIterator<Item = &'s str>,
    ) {
        for serial in serials {
            if let Some(vertex) = self.vertices.get_mut(serial) {
                if vertex.points.remove(old_id) {
                    vertex.points.insert(new_id.to_string());
                }
            }
        }
    }

    /// Add one unit of strength between `u` and `v`. Returns `true` when the
    /// edge is newly created.
    pub fn add_edge(&mut self, u: &str, v: &str) -> Result<bool> {
        if u == v {
            return Err(Error::programmer(format!(
                "Cannot connect image [{u}] to itself"
            )));
        }
        self.add_vertex(u);
        self.add_vertex(v);
        let created = Self::bump(&mut self.vertices, u, v);
        Self::bump(&mut self.vertices, v, u);
        if created {
            tracing::trace!(u, v, "edge created");
        }
        Ok(created)
    }

    /// Remove one unit of strength between `u` and `v`, floored at zero.
    /// Returns `true` when the edge disappears.
    pub fn remove_edge(&mut self, u: &str, v: &str) -> Result<bool> {
        if u == v {
            return Err(Error::programmer(format!(
                "Cannot disconnect image [{u}] from itself"
            )));
        }
        let removed = Self::drop_one(&mut self.vertices, u, v);
        Self::drop_one(&mut self.vertices, v, u);
        if removed {
            tracing::trace!(u, v, "edge removed");
        }
        Ok(removed)
    }

    fn bump(vertices: &mut HashMap<String, Vertex>, from: &str, to: &str) -> bool {
        let Some(vertex) = vertices.get_mut(from) else {
            return false;
        };
        let strength = vertex.edges.entry(to.to_string()).or_insert(0);
        *strength += 1;
        *strength == 1
    }

    fn drop_one(vertices: &mut HashMap<String, Vertex>, from: &str, to: &str) -> bool {
        let Some(vertex) = vertices.get_mut(from) else {
            return false;
        };
        match vertex.edges.get_mut(to) {
            Some(strength) if *strength > 1 => {
                *strength -= 1;
                false
            }
            Some(_) => {
                vertex.edges.remove(to);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Vertex serials in insertion order.
    pub fn serials(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    /// Ids of points with a measure in `serial`, sorted.
    pub fn points_in(&self, serial: &str) -> Vec<&str> {
        self.vertices
            .get(serial)
            .map(|v| v.points.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Neighbors of `serial` with non-zero strength, sorted.
    pub fn adjacent(&self, serial: &str) -> Vec<&str> {
        self.vertices
            .get(serial)
            .map(|v| v.edges.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn edge_strength(&self, u: &str, v: &str) -> u32 {
        self.vertices
            .get(u)
            .and_then(|vertex| vertex.edges.get(v))
            .copied()
            .unwrap_or(0)
    }

    /// Number of unordered pairs with non-zero strength.
    pub fn edge_count(&self) -> usize {
        self.vertices.values().map(|v| v.edges.len()).sum::<usize>() / 2
    }

    /// `(u, v, strength)` with `u < v`, sorted.
    pub fn edges(&self) -> Vec<(&str, &str, u32)> {
        let mut edges: Vec<_> = self
            .vertices
            .iter()
            .flat_map(|(u, vertex)| {
                vertex
                    .edges
                    .iter()
                    .filter(move |(v, _)| u.as_str() < v.as_str())
                    .map(move |(v, s)| (u.as_str(), v.as_str(), *s))
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Islands of mutually reachable serials.
    ///
    /// Members of an island are sorted; islands are ordered by the insertion
    /// position of their earliest vertex. Isolated vertices form singleton
    /// islands.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.order.len());
        let mut islands = Vec::new();

        for start in &self.order {
            if !visited.insert(start.as_str()) {
                continue;
            }
            let mut island = vec![start.clone()];
            let mut queue = VecDeque::from([start.as_str()]);
            while let Some(serial) = queue.pop_front() {
                let Some(vertex) = self.vertices.get(serial) else {
                    continue;
                };
                for neighbor in vertex.edges.keys() {
                    if visited.insert(neighbor.as_str()) {
                        island.push(neighbor.clone());
                        queue.push_back(neighbor.as_str());
                    }
                }
            }
            island.sort_unstable();
            islands.push(island);
        }
        islands
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.vertices.clear();
    }
}
