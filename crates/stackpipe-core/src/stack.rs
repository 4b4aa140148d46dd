//! The stack: the declaration scope owning all resources of one synthesis.

use serde::{Deserialize, Serialize};

use crate::id::{ResourceId, ResourceKind};
use crate::pipeline::Stage;
use crate::resource::Resource;

/// Cloud provider configuration declared on a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub region: Option<String>,
}

/// A stack declaration.
///
/// Built fresh for each synthesis and passed by reference; nothing here is
/// shared between runs. The stages belong to the stack's pipeline resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub providers: Vec<Provider>,
    /// Resources in declaration order.
    pub resources: Vec<Resource>,
    pub stages: Vec<Stage>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            providers: Vec::new(),
            resources: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn with_provider(mut self, name: impl Into<String>, region: Option<String>) -> Self {
        self.providers.push(Provider {
            name: name.into(),
            region,
        });
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// Pipeline resources in declaration order.
    pub fn pipelines(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| r.id.kind == ResourceKind::Pipeline)
    }

    /// Region of the first provider that declares one.
    pub fn region(&self) -> Option<&str> {
        self.providers.iter().find_map(|p| p.region.as_deref())
    }
}
