//! Property-based tests for ancestor tree builds using proptest.
//!
//! Parent graphs are generated as adjacency lists over people `0..n`. The
//! acyclic strategy only links a person to higher-numbered parents; the
//! general strategy allows any link, including self-links.

use lineage::config::{GatewayConfig, TraversalConfig};
use lineage::display::DisplayNode;
use lineage::domain::{ParentRef, PersonId, PersonRecord};
use lineage::gateway::InMemoryGateway;
use lineage::session::BuildSession;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Parent lists for `n` people where every parent has a higher index.
fn arb_acyclic_graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(move |i| {
                let candidates: Vec<usize> = (i + 1..n).collect();
                if candidates.is_empty() {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::sample::subsequence(candidates.clone(), 0..=candidates.len().min(3))
                        .boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

/// Parent lists for `n` people with arbitrary links.
fn arb_graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..10).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(0..n, 0..4), n)
    })
}

fn gateway_for(graph: &[Vec<usize>]) -> InMemoryGateway {
    let records = graph.iter().enumerate().map(|(i, parents)| {
        let mut record = PersonRecord::new(i as u64, &format!("P{}", i), "");
        let mut seen = HashSet::new();
        record.parents = parents
            .iter()
            .filter(|&&p| seen.insert(p))
            .map(|&p| ParentRef::new(p as u64, None))
            .collect();
        record
    });
    InMemoryGateway::with_records(
        records,
        GatewayConfig {
            max_parents: None,
            ..GatewayConfig::default()
        },
    )
}

fn build(gateway: &InMemoryGateway, max_depth: usize) -> lineage::display::DisplayTree {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let session = BuildSession::new(
            Arc::new(gateway.clone()),
            TraversalConfig {
                max_depth,
                ..TraversalConfig::default()
            },
        );
        let generation = session.start(PersonId::new("0")).await;
        let tree = session.wait_for_tree(generation).await.unwrap();
        (*tree).clone()
    })
}

/// Longest ancestor chain above `person` in an acyclic graph.
fn ancestor_depth(graph: &[Vec<usize>], person: usize) -> usize {
    graph[person]
        .iter()
        .map(|&p| ancestor_depth(graph, p) + 1)
        .max()
        .unwrap_or(0)
}

fn assert_paths_unique(node: &DisplayNode, path: &mut Vec<PersonId>) {
    assert!(
        !path.contains(node.person_id()),
        "{} repeats on path {:?}",
        node.person_id(),
        path
    );
    path.push(node.person_id().clone());
    for child in &node.children {
        assert_paths_unique(child, path);
    }
    path.pop();
}

fn collect_ids(node: &DisplayNode, ids: &mut HashSet<PersonId>) {
    ids.insert(node.person_id().clone());
    for child in &node.children {
        collect_ids(child, ids);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_acyclic_depth_matches_ancestry(graph in arb_acyclic_graph(), max_depth in 0usize..6) {
        let tree = build(&gateway_for(&graph), max_depth);

        prop_assert_eq!(tree.root.depth(), max_depth.min(ancestor_depth(&graph, 0)));
        prop_assert!(tree.diagnostics.is_empty());
    }

    #[test]
    fn prop_cyclic_graphs_terminate_without_repeats(graph in arb_graph(), max_depth in 0usize..8) {
        let tree = build(&gateway_for(&graph), max_depth);

        prop_assert!(tree.root.depth() <= max_depth);
        assert_paths_unique(&tree.root, &mut Vec::new());
    }

    #[test]
    fn prop_each_person_fetched_once_per_build(graph in arb_graph(), max_depth in 0usize..8) {
        let gateway = gateway_for(&graph);
        let tree = build(&gateway, max_depth);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let mut reached = HashSet::new();
        collect_ids(&tree.root, &mut reached);
        for i in 0..graph.len() {
            let id = PersonId::from(i as u64);
            let count = runtime.block_on(gateway.fetch_count(&id));
            prop_assert!(count <= 1, "{} fetched {} times", id, count);
            if reached.contains(&id) {
                prop_assert_eq!(count, 1);
            }
        }
        prop_assert_eq!(tree.fetches, runtime.block_on(gateway.total_fetches()));
    }

    #[test]
    fn prop_builds_are_idempotent(graph in arb_graph(), max_depth in 0usize..6) {
        let gateway = gateway_for(&graph);
        prop_assert_eq!(build(&gateway, max_depth), build(&gateway, max_depth));
    }
}
