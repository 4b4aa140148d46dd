//! Validated artifact flow between pipeline actions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::ActionRef;

/// Producer and consumers of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFlow {
    /// The single action producing this artifact.
    pub producer: ActionRef,
    /// Index of the producer's stage in the pipeline.
    pub stage_index: usize,
    /// Consuming actions in declaration order.
    pub consumers: Vec<ActionRef>,
}

/// Artifact name to producing action, ordered by artifact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactMap {
    entries: BTreeMap<String, ArtifactFlow>,
}

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a producer. Returns the existing flow if the name is taken.
    pub fn insert_producer(
        &mut self,
        artifact: impl Into<String>,
        producer: ActionRef,
        stage_index: usize,
    ) -> Option<&ArtifactFlow> {
        let artifact = artifact.into();
        if self.entries.contains_key(&artifact) {
            return self.entries.get(&artifact);
        }
        self.entries.insert(
            artifact,
            ArtifactFlow {
                producer,
                stage_index,
                consumers: Vec::new(),
            },
        );
        None
    }

    pub fn add_consumer(&mut self, artifact: &str, consumer: ActionRef) {
        if let Some(flow) = self.entries.get_mut(artifact) {
            flow.consumers.push(consumer);
        }
    }

    pub fn get(&self, artifact: &str) -> Option<&ArtifactFlow> {
        self.entries.get(artifact)
    }

    pub fn producer(&self, artifact: &str) -> Option<&ActionRef> {
        self.entries.get(artifact).map(|f| &f.producer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArtifactFlow)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_producer_is_rejected() {
        let mut map = ArtifactMap::new();
        assert!(map
            .insert_producer("source_output", ActionRef::new("Source", "GitHub"), 0)
            .is_none());
        let existing = map
            .insert_producer("source_output", ActionRef::new("Source", "Mirror"), 0)
            .cloned();
        assert_eq!(existing.unwrap().producer, ActionRef::new("Source", "GitHub"));
        assert_eq!(map.len(), 1);
    }
}
