//! Connected-component clustering of duplicate pairs.
//!
//! Transitivity is assumed only at the graph level: if A–B and B–C qualify,
//! A, B and C share a cluster whatever the A–C score is.

use std::collections::HashMap;

use crate::detection::types::{
    ClusterEdge, ClusterId, ConfidenceLevel, DuplicatePair, EntityCluster,
};
use crate::entity::{Entity, EntityId};

#[derive(Debug, Clone, Copy, Default)]
pub struct Clusterer;

impl Clusterer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Groups entities linked by non-low pairs.
    ///
    /// Pairs naming an entity not in `entities` are ignored. Singletons are
    /// dropped. Clusters come out in order of their first member's position.
    #[must_use]
    pub fn cluster_similar_entities(
        &self,
        entities: &[Entity],
        pairs: &[DuplicatePair],
    ) -> Vec<EntityCluster> {
        let mut index: HashMap<EntityId, usize> = HashMap::with_capacity(entities.len());
        for (pos, entity) in entities.iter().enumerate() {
            index.entry(entity.id()).or_insert(pos);
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); entities.len()];
        let mut edges: Vec<(usize, usize, f64)> = Vec::new();
        for pair in pairs {
            if pair.level() == ConfidenceLevel::Low {
                continue;
            }
            let (Some(&a), Some(&b)) = (index.get(&pair.entity1), index.get(&pair.entity2)) else {
                continue;
            };
            if a == b {
                continue;
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
            edges.push((a, b, pair.score.overall));
        }

        let mut component_of: Vec<Option<usize>> = vec![None; entities.len()];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for start in 0..entities.len() {
            if component_of[start].is_some() || adjacency[start].is_empty() {
                continue;
            }
            let label = components.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component_of[start] = Some(label);
            while let Some(node) = stack.pop() {
                members.push(node);
                for &next in &adjacency[node] {
                    if component_of[next].is_none() {
                        component_of[next] = Some(label);
                        stack.push(next);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        let mut component_edges: Vec<Vec<ClusterEdge>> = vec![Vec::new(); components.len()];
        for (a, b, similarity) in edges {
            if let Some(label) = component_of[a] {
                component_edges[label].push(ClusterEdge {
                    entity1: entities[a].id(),
                    entity2: entities[b].id(),
                    similarity,
                });
            }
        }

        components
            .into_iter()
            .zip(component_edges)
            .filter(|(members, _)| members.len() >= 2)
            .map(|(members, connections)| build_cluster(entities, &members, connections))
            .collect()
    }
}

fn build_cluster(
    entities: &[Entity],
    members: &[usize],
    connections: Vec<ClusterEdge>,
) -> EntityCluster {
    let cluster_entities: Vec<Entity> = members.iter().map(|&i| entities[i].clone()).collect();
    let ids: Vec<EntityId> = cluster_entities.iter().map(Entity::id).collect();

    #[allow(clippy::cast_precision_loss)]
    let avg_similarity = if connections.is_empty() {
        0.0
    } else {
        connections.iter().map(|e| e.similarity).sum::<f64>() / connections.len() as f64
    };

    let mut canonical = &cluster_entities[0];
    for candidate in &cluster_entities[1..] {
        if candidate.confidence.value() > canonical.confidence.value() {
            canonical = candidate;
        }
    }
    let suggested_canonical = canonical.id();

    EntityCluster {
        id: ClusterId::from_members(&ids),
        entities: cluster_entities,
        avg_similarity,
        connections,
        suggested_canonical,
    }
}
