//! Shared-prefix tree of every candidate cycle.
//!
//! Cycles are stored as a trie of [`PathNode`]s; nodes point into an arena of
//! [`Vertex`]es keyed by `(venue, pair, side)`, so a direction that shows up in many
//! cycles is quoted once per generation. The structure is built once and only the
//! quotes attached to the arena change afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use tracing::{debug, info, warn};
use triarb_core::{Currency, Order, Result, TriArbError};

use crate::mashup::Mashup;
use crate::path::{Hop, Path};
use crate::vertex::{Vertex, VertexId, VertexKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct PathNode {
    vertex: VertexId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    closes_cycle: bool,
}

impl PathNode {
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Zero-based hop index of this node within its cycles.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The node's vertex leads back into the base currency.
    pub fn closes_cycle(&self) -> bool {
        self.closes_cycle
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    base: Currency,
    max_depth: usize,
    vertices: Vec<Vertex>,
    index: HashMap<VertexKey, VertexId>,
    nodes: Vec<PathNode>,
    roots: Vec<NodeId>,
    levels: Vec<Vec<VertexId>>,
    level_nodes: Vec<Vec<NodeId>>,
}

pub struct PathFinder;

impl PathFinder {
    /// Enumerates every simple cycle of at most `depth` hops through `base` and folds
    /// them into a [`Tree`].
    pub fn build_tree(mashup: &Mashup, base: &Currency, depth: usize) -> Result<Tree> {
        if depth < 2 {
            return Err(TriArbError::InvalidData(format!(
                "Traversal depth must be at least 2, got {}",
                depth
            )));
        }
        if !mashup.contains(base) {
            return Err(TriArbError::UnknownCurrency(base.clone()));
        }

        let mut cycles = Vec::new();
        let mut partial = Vec::with_capacity(depth);
        let mut visited = HashSet::from([base.clone()]);
        Self::extend(mashup, base, base, depth, &mut partial, &mut visited, &mut cycles);

        let mut tree = Tree {
            base: base.clone(),
            max_depth: depth,
            vertices: Vec::new(),
            index: HashMap::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
            levels: Vec::new(),
            level_nodes: Vec::new(),
        };
        for cycle in &cycles {
            tree.insert_cycle(cycle);
        }
        tree.index_levels();

        info!(
            "Path finder: {} cycles from {} (depth {}), {} nodes over {} distinct vertices",
            cycles.len(),
            base,
            depth,
            tree.nodes.len(),
            tree.vertices.len()
        );

        Ok(tree)
    }

    fn extend<'a>(
        mashup: &'a Mashup,
        base: &Currency,
        current: &Currency,
        depth: usize,
        partial: &mut Vec<&'a VertexKey>,
        visited: &mut HashSet<Currency>,
        cycles: &mut Vec<Vec<VertexKey>>,
    ) {
        for edge in mashup.neighbors(current) {
            let next = edge.to_currency();
            let length = partial.len() + 1;

            if next == base {
                if length >= 2 {
                    let mut cycle: Vec<VertexKey> = partial.iter().map(|key| (*key).clone()).collect();
                    cycle.push(edge.clone());
                    cycles.push(cycle);
                }
            } else if length < depth && !visited.contains(next) {
                visited.insert(next.clone());
                partial.push(edge);
                Self::extend(mashup, base, next, depth, partial, visited, cycles);
                partial.pop();
                visited.remove(next);
            }
        }
    }
}

impl Tree {
    fn intern(&mut self, key: &VertexKey) -> VertexId {
        if let Some(id) = self.index.get(key) {
            return *id;
        }
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex::new(key.clone()));
        self.index.insert(key.clone(), id);
        id
    }

    fn insert_cycle(&mut self, cycle: &[VertexKey]) {
        let last = cycle.len().saturating_sub(1);
        let mut parent: Option<NodeId> = None;

        for (depth, key) in cycle.iter().enumerate() {
            let vertex = self.intern(key);
            let siblings = match parent {
                Some(parent) => &self.nodes[parent.0].children,
                None => &self.roots,
            };
            let existing = siblings
                .iter()
                .copied()
                .find(|id| self.nodes[id.0].vertex == vertex);

            let node = match existing {
                Some(id) => id,
                None => {
                    let id = NodeId(self.nodes.len());
                    self.nodes.push(PathNode {
                        vertex,
                        parent,
                        children: Vec::new(),
                        depth,
                        closes_cycle: depth == last,
                    });
                    match parent {
                        Some(parent) => self.nodes[parent.0].children.push(id),
                        None => self.roots.push(id),
                    }
                    id
                }
            };
            parent = Some(node);
        }
    }

    fn index_levels(&mut self) {
        let mut frontier = self.roots.clone();

        while !frontier.is_empty() {
            let mut seen = HashSet::new();
            let level: Vec<VertexId> = frontier
                .iter()
                .map(|id| self.nodes[id.0].vertex)
                .filter(|vertex| seen.insert(*vertex))
                .collect();
            let next: Vec<NodeId> = frontier
                .iter()
                .flat_map(|id| self.nodes[id.0].children.iter().copied())
                .collect();

            debug!(
                "Level {}: {} nodes, {} distinct vertices",
                self.levels.len(),
                frontier.len(),
                level.len()
            );
            self.levels.push(level);
            self.level_nodes.push(frontier);
            frontier = next;
        }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(index, vertex)| (VertexId(index), vertex))
    }

    pub fn vertex_id(&self, key: &VertexKey) -> Option<VertexId> {
        self.index.get(key).copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Distinct vertices per depth, in breadth-first discovery order.
    pub fn levels(&self) -> &[Vec<VertexId>] {
        &self.levels
    }

    pub fn level_nodes(&self, level: usize) -> &[NodeId] {
        self.level_nodes.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.closes_cycle)
            .map(|(index, _)| NodeId(index))
    }

    pub fn cycle_count(&self) -> usize {
        self.leaves().count()
    }

    /// Vertices from the root down to `node`.
    pub fn path_to(&self, node: NodeId) -> Vec<VertexId> {
        let mut vertices = Vec::with_capacity(self.nodes[node.0].depth + 1);
        let mut current = Some(node);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            vertices.push(node.vertex);
            current = node.parent;
        }
        vertices.reverse();
        vertices
    }

    /// Every candidate cycle as a sequence of vertices.
    pub fn cycles(&self) -> impl Iterator<Item = Vec<VertexId>> + '_ {
        self.leaves().map(move |leaf| self.path_to(leaf))
    }

    /// Visits levels breadth-first, handing each level's distinct vertices to `on_level`.
    pub fn depth_traversing<F>(&self, mut on_level: F)
    where
        F: FnMut(usize, &[VertexId]),
    {
        for (depth, vertices) in self.levels.iter().enumerate() {
            on_level(depth, vertices);
        }
    }

    pub fn set_quote(&mut self, id: VertexId, order: Option<Order>) {
        self.vertices[id.0].set_order(order);
    }

    /// Forgets every quote; called at the start of each generation.
    pub fn reset_quotes(&mut self) {
        for vertex in &mut self.vertices {
            vertex.set_order(None);
        }
    }

    pub fn is_quoted(&self, id: VertexId) -> bool {
        self.vertices[id.0].is_quoted()
    }

    fn prefix_quoted(&self, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            if !self.is_quoted(node.vertex) {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Vertices of `level` worth fetching: not yet `resolved` this generation, with at
    /// least one occurrence whose whole prefix is quoted.
    pub fn pending_vertices(&self, level: usize, resolved: &HashSet<VertexId>) -> Vec<VertexId> {
        let mut seen = HashSet::new();
        self.level_nodes(level)
            .iter()
            .filter(|id| self.prefix_quoted(**id))
            .map(|id| self.nodes[id.0].vertex)
            .filter(|vertex| !resolved.contains(vertex) && seen.insert(*vertex))
            .collect()
    }

    /// Cycles ending on `level` whose every vertex carries a quote.
    pub fn completed_paths(&self, level: usize) -> Vec<Path> {
        self.level_nodes(level)
            .iter()
            .filter(|id| self.nodes[id.0].closes_cycle)
            .filter_map(|id| self.quoted_path(*id))
            .collect()
    }

    fn quoted_path(&self, leaf: NodeId) -> Option<Path> {
        let hops = self
            .path_to(leaf)
            .into_iter()
            .map(|id| {
                let vertex = &self.vertices[id.0];
                vertex.order().map(|order| Hop {
                    vertex: id,
                    key: vertex.key().clone(),
                    order: order.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;

        match Path::new(hops) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping malformed cycle: {}", e);
                None
            }
        }
    }

    /// Human readable listing of every candidate cycle.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} cycles from {} (depth {}), {} vertices, {} nodes",
            self.cycle_count(),
            self.base,
            self.max_depth,
            self.vertex_count(),
            self.node_count()
        );

        for cycle in self.cycles() {
            let _ = write!(out, "{}", self.base);
            for id in cycle {
                let key = self.vertices[id.0].key();
                let _ = write!(out, " -[{}]-> {}", key, key.to_currency());
            }
            out.push('\n');
        }
        out
    }
}
