// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission graph traversal: reachability and topological ordering.
//!
//! Ordering is deterministic: ties are broken by node declaration order,
//! so two runs over an unchanged mission visit nodes in the same sequence.

use crate::mission::MissionConnection;
use crate::node::MissionNode;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Node ids reachable from `start` along outgoing edges (any port).
pub fn reachable(
    start: &[String],
    nodes: &[MissionNode],
    connections: &[MissionConnection],
) -> HashSet<String> {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for id in start {
        if known.contains(id.as_str()) && seen.insert(id.clone()) {
            queue.push_back(id);
        }
    }

    while let Some(current) = queue.pop_front() {
        for connection in connections {
            if connection.source_node_id == current
                && known.contains(connection.target_node_id.as_str())
                && seen.insert(connection.target_node_id.clone())
            {
                queue.push_back(&connection.target_node_id);
            }
        }
    }

    seen
}

/// Result of a topological sort over the reachable subgraph.
#[derive(Debug, Clone)]
pub struct TopoResult {
    /// Node ids in execution order. Incomplete when a cycle exists.
    pub order: Vec<String>,
    pub cycle: bool,
    /// Labels of the nodes stuck in the cycle, in declaration order.
    pub cycle_labels: Vec<String>,
}

/// Kahn's algorithm over the subgraph reachable from `start`.
pub fn topo_order(
    start: &[String],
    nodes: &[MissionNode],
    connections: &[MissionConnection],
) -> TopoResult {
    let reach = reachable(start, nodes, connections);
    let index_of: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree: HashMap<&str, usize> = reach
        .iter()
        .map(|id| (id.as_str(), 0))
        .collect();
    for connection in connections {
        if reach.contains(&connection.source_node_id) && reach.contains(&connection.target_node_id)
        {
            if let Some(d) = in_degree.get_mut(connection.target_node_id.as_str()) {
                *d += 1;
            }
        }
    }

    // Declaration-order tie-breaking keeps traces stable run-to-run.
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .filter_map(|(id, _)| index_of.get(id).copied())
        .collect();

    let mut order = Vec::with_capacity(reach.len());
    while let Some(&i) = ready.iter().next() {
        ready.remove(&i);
        let id = nodes[i].id.as_str();
        order.push(id.to_string());

        for connection in connections {
            if connection.source_node_id != id || !reach.contains(&connection.target_node_id) {
                continue;
            }
            if let Some(d) = in_degree.get_mut(connection.target_node_id.as_str()) {
                *d -= 1;
                if *d == 0 {
                    if let Some(&ti) = index_of.get(connection.target_node_id.as_str()) {
                        ready.insert(ti);
                    }
                }
            }
        }
    }

    let cycle = order.len() < reach.len();
    let cycle_labels = if cycle {
        let done: HashSet<&str> = order.iter().map(String::as_str).collect();
        nodes
            .iter()
            .filter(|n| reach.contains(&n.id) && !done.contains(n.id.as_str()))
            .map(|n| n.label.clone())
            .collect()
    } else {
        Vec::new()
    };

    TopoResult {
        order,
        cycle,
        cycle_labels,
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
