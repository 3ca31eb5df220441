// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Dependency Resolution
//!
//! Acyclic graphs are generated by only letting a node depend on nodes
//! declared before it, then shuffling the declaration order. Cyclic graphs
//! close a chain back onto its first node.

use cim_stack_deploy::errors::DeployError;
use cim_stack_deploy::resolver::DependencyGraph;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Strategies
// ============================================================================

fn node(i: usize) -> String {
    format!("stack-{}", i)
}

/// Nodes with edges only toward lower indices, in shuffled order
fn acyclic_graph() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1usize..12)
        .prop_flat_map(|size| {
            let edges = (0..size)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
                .collect::<Vec<_>>();
            (Just(size), edges)
        })
        .prop_map(|(size, edges)| {
            (0..size)
                .map(|i| {
                    let mut deps: Vec<usize> =
                        edges[i].iter().copied().filter(|d| *d < i).collect();
                    deps.sort_unstable();
                    deps.dedup();
                    (node(i), deps.into_iter().map(node).collect())
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn graph_of(nodes: &[(String, Vec<String>)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (id, deps) in nodes {
        graph.add(id.clone(), deps.iter().cloned());
    }
    graph
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every node appears exactly once
    #[test]
    fn prop_resolution_is_a_permutation(nodes in acyclic_graph()) {
        let order = graph_of(&nodes).resolve().unwrap();

        let mut expected: Vec<&str> = nodes.iter().map(|(id, _)| id.as_str()).collect();
        let mut actual: Vec<&str> = order.iter().map(String::as_str).collect();
        expected.sort_unstable();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }

    /// Dependencies always come before their dependents
    #[test]
    fn prop_dependencies_precede_dependents(nodes in acyclic_graph()) {
        let order = graph_of(&nodes).resolve().unwrap();
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        for (id, deps) in &nodes {
            for dep in deps {
                prop_assert!(position[dep.as_str()] < position[id.as_str()]);
            }
        }
    }

    /// Resolving twice gives the same order
    #[test]
    fn prop_resolution_is_deterministic(nodes in acyclic_graph()) {
        let graph = graph_of(&nodes);
        prop_assert_eq!(graph.resolve().unwrap(), graph.resolve().unwrap());
    }

    /// A chain closed onto itself is always reported as a cycle
    #[test]
    fn prop_closed_chain_is_cyclic(length in 1usize..8, extra in 0usize..4) {
        let mut graph = DependencyGraph::new();
        for i in 0..length {
            graph.add(node(i), vec![node((i + 1) % length)]);
        }
        for i in length..length + extra {
            graph.add(node(i), vec![node(0)]);
        }

        match graph.resolve() {
            Err(DeployError::CyclicDependency { cycle }) => {
                prop_assert!(cycle.len() >= 2);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}
