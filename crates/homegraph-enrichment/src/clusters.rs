//! Topic Clustering
//!
//! Groups neighborhoods by the encyclopedia topics their correlated
//! articles mention. Topics below the minimum membership are discarded,
//! the survivors are ranked by member count, and only the top K become
//! named clusters.

use homegraph_config::ClusterConfig;
use homegraph_core::error::EnrichmentResult;
use homegraph_core::outputs::TopicCluster;
use homegraph_core::records::NeighborhoodRecord;
use homegraph_core::scoring::normalize_topics;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Builds named topic clusters from neighborhood article correlations.
pub struct TopicClusterBuilder {
    config: ClusterConfig,
}

impl TopicClusterBuilder {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        neighborhoods: &[NeighborhoodRecord],
    ) -> EnrichmentResult<Vec<TopicCluster>> {
        // topic -> distinct member neighborhoods; BTree keeps output
        // deterministic across runs
        let mut members_by_topic: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for hood in neighborhoods {
            let topics = normalize_topics(
                hood.article_correlations
                    .iter()
                    .flat_map(|c| c.topics.iter()),
            );
            for topic in topics {
                members_by_topic
                    .entry(topic)
                    .or_default()
                    .insert(hood.id.clone());
            }
        }

        let mut ranked: Vec<(String, BTreeSet<String>)> = members_by_topic
            .into_iter()
            .filter(|(_, members)| members.len() >= self.config.min_cluster_size)
            .collect();
        ranked.sort_by(|(topic_a, members_a), (topic_b, members_b)| {
            members_b
                .len()
                .cmp(&members_a.len())
                .then_with(|| topic_a.cmp(topic_b))
        });
        ranked.truncate(self.config.top_k);

        let mut clusters = Vec::with_capacity(ranked.len());
        for (topic, members) in ranked {
            // Normalization constant carried over from the source system;
            // configurable, not statistically derived.
            let strength =
                (members.len() as f64 / self.config.strength_normalizer).min(1.0);
            clusters.push(TopicCluster::new(
                &topic,
                members.into_iter().collect(),
                strength,
            )?);
        }

        debug!("Built {} topic clusters", clusters.len());
        Ok(clusters)
    }
}
