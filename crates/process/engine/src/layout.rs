//! Deterministic layout for process graphs
//!
//! Two modes. `layout` relayouts everything from scratch; `apply_layout`
//! keeps human-placed positions verbatim and only lays out nodes that
//! have none. Both are pure functions; persistence of the resulting
//! positions is the caller's concern.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{ProcessGraph, ProcessNode};

/// Horizontal distance between successive layers.
pub const LAYER_SPACING: f64 = 260.0;
/// Vertical distance between nodes stacked in one layer.
pub const ROW_SPACING: f64 = 140.0;
/// Fixed column for orphaned nodes, left of the main graph.
pub const ORPHAN_COLUMN_X: f64 = -260.0;

/// A node position on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ── Full layout ─────────────────────────────────────────────────────────────

/// Lay out every node of the graph from scratch.
///
/// Non-orphaned nodes are layered left to right; nodes sharing a layer
/// stack vertically, centered around zero. Orphaned nodes go to a
/// fixed side column so they never overlap the main graph.
pub fn layout(graph: &ProcessGraph) -> BTreeMap<String, Position> {
    let (orphans, main): (Vec<&ProcessNode>, Vec<&ProcessNode>) =
        graph.nodes.iter().partition(|n| n.is_orphaned());

    let ids: BTreeSet<&str> = main.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();

    let layers = assign_layers(&main, &edges);
    let mut positions = position_by_layer(&main, &layers);
    position_orphans(&orphans, &mut positions);
    positions
}

// ── Incremental layout ──────────────────────────────────────────────────────

/// Lay out only the nodes without a saved position.
///
/// Saved positions are kept verbatim. New nodes are laid out by the
/// pure algorithm restricted to the subgraph of new nodes and edges
/// among them, then shifted horizontally past the rightmost saved
/// node. New orphaned nodes still go to the fixed side column.
pub fn apply_layout(
    graph: &ProcessGraph,
    saved: &BTreeMap<String, Position>,
) -> BTreeMap<String, Position> {
    let mut positions = BTreeMap::new();
    let mut new_nodes: Vec<&ProcessNode> = Vec::new();
    for node in &graph.nodes {
        match saved.get(&node.id) {
            Some(position) => {
                positions.insert(node.id.clone(), *position);
            }
            None => new_nodes.push(node),
        }
    }
    if new_nodes.is_empty() {
        return positions;
    }

    let (new_orphans, new_main): (Vec<&ProcessNode>, Vec<&ProcessNode>) =
        new_nodes.into_iter().partition(|n| n.is_orphaned());

    let new_ids: BTreeSet<&str> = new_main.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .filter(|e| new_ids.contains(e.source.as_str()) && new_ids.contains(e.target.as_str()))
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();

    let layers = assign_layers(&new_main, &edges);
    let mut fresh = position_by_layer(&new_main, &layers);

    let shift = if positions.is_empty() {
        0.0
    } else {
        positions.values().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max) + LAYER_SPACING
    };
    for position in fresh.values_mut() {
        position.x += shift;
    }
    positions.extend(fresh);

    position_orphans(&new_orphans, &mut positions);
    positions
}

// ── Layering ────────────────────────────────────────────────────────────────

/// Assign each node the maximum layer depth over all paths reaching it.
///
/// Work-queue relaxation: a node is revisited whenever a longer path is
/// discovered. In an acyclic graph no layer can reach the node count,
/// so a relaxation that would is a cycle; the offending edge is broken
/// and a warning logged rather than looping forever.
fn assign_layers<'a>(
    nodes: &[&'a ProcessNode],
    edges: &[(&'a str, &'a str)],
) -> BTreeMap<&'a str, usize> {
    let mut layers: BTreeMap<&str, usize> = BTreeMap::new();
    if nodes.is_empty() {
        return layers;
    }

    let mut forward: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut has_incoming: BTreeSet<&str> = BTreeSet::new();
    for (source, target) in edges {
        forward.entry(source).or_default().push(target);
        has_incoming.insert(target);
    }

    let mut roots: Vec<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !has_incoming.contains(id))
        .collect();
    if roots.is_empty() {
        // Fully cyclic graph: seed from the first node.
        roots.push(nodes[0].id.as_str());
    }

    let bound = nodes.len();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for root in roots {
        layers.insert(root, 0);
        queue.push_back(root);
    }

    let mut broken: BTreeSet<(&str, &str)> = BTreeSet::new();
    while let Some(current) = queue.pop_front() {
        let next = layers[current] + 1;
        let Some(successors) = forward.get(current) else {
            continue;
        };
        for &successor in successors {
            if broken.contains(&(current, successor)) {
                continue;
            }
            if layers.get(successor).map_or(true, |&l| next > l) {
                if next >= bound {
                    broken.insert((current, successor));
                    tracing::warn!(
                        source = current,
                        target = successor,
                        "cycle detected while layering, breaking edge"
                    );
                    continue;
                }
                layers.insert(successor, next);
                queue.push_back(successor);
            }
        }
    }

    for node in nodes {
        layers.entry(node.id.as_str()).or_insert(0);
    }
    layers
}

// ── Positioning ─────────────────────────────────────────────────────────────

fn position_by_layer(
    nodes: &[&ProcessNode],
    layers: &BTreeMap<&str, usize>,
) -> BTreeMap<String, Position> {
    let mut columns: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for node in nodes {
        columns
            .entry(layers[node.id.as_str()])
            .or_default()
            .push(node.id.as_str());
    }

    let mut positions = BTreeMap::new();
    for (layer, members) in &columns {
        let x = *layer as f64 * LAYER_SPACING;
        let center = (members.len() as f64 - 1.0) / 2.0;
        for (row, id) in members.iter().enumerate() {
            let y = (row as f64 - center) * ROW_SPACING;
            positions.insert(id.to_string(), Position::new(x, y));
        }
    }
    positions
}

fn position_orphans(orphans: &[&ProcessNode], positions: &mut BTreeMap<String, Position>) {
    let center = (orphans.len() as f64 - 1.0) / 2.0;
    for (row, node) in orphans.iter().enumerate() {
        positions.insert(
            node.id.clone(),
            Position::new(ORPHAN_COLUMN_X, (row as f64 - center) * ROW_SPACING),
        );
    }
}
