//! Pipeline stage and action definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Error;
use crate::id::ActionRef;
use crate::resource::AttrValue;

/// What kind of work an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Source,
    Build,
    Test,
    Deploy,
    Approval,
    Invoke,
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionCategory::Source => write!(f, "Source"),
            ActionCategory::Build => write!(f, "Build"),
            ActionCategory::Test => write!(f, "Test"),
            ActionCategory::Deploy => write!(f, "Deploy"),
            ActionCategory::Approval => write!(f, "Approval"),
            ActionCategory::Invoke => write!(f, "Invoke"),
        }
    }
}

impl std::str::FromStr for ActionCategory {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Source" => Ok(ActionCategory::Source),
            "Build" => Ok(ActionCategory::Build),
            "Test" => Ok(ActionCategory::Test),
            "Deploy" => Ok(ActionCategory::Deploy),
            "Approval" => Ok(ActionCategory::Approval),
            "Invoke" => Ok(ActionCategory::Invoke),
            other => Err(Error::InvalidInput(format!(
                "unknown action category '{}'",
                other
            ))),
        }
    }
}

/// Who operates the action provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionOwner {
    #[default]
    #[serde(rename = "AWS")]
    Aws,
    ThirdParty,
    Custom,
}

impl std::fmt::Display for ActionOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOwner::Aws => write!(f, "AWS"),
            ActionOwner::ThirdParty => write!(f, "ThirdParty"),
            ActionOwner::Custom => write!(f, "Custom"),
        }
    }
}

impl std::str::FromStr for ActionOwner {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AWS" => Ok(ActionOwner::Aws),
            "ThirdParty" => Ok(ActionOwner::ThirdParty),
            "Custom" => Ok(ActionOwner::Custom),
            other => Err(Error::InvalidInput(format!(
                "unknown action owner '{}'",
                other
            ))),
        }
    }
}

/// The service an action is bound to (e.g. GitHub, CodeBuild).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub owner: ActionOwner,
    pub provider: String,
    pub version: String,
}

impl ProviderBinding {
    pub fn new(owner: ActionOwner, provider: impl Into<String>) -> Self {
        Self {
            owner,
            provider: provider.into(),
            version: "1".to_string(),
        }
    }
}

/// A unit of work inside a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub category: ActionCategory,
    pub provider: ProviderBinding,
    /// Declared run order. Validated during planning; `None` means it was omitted.
    pub run_order: Option<i64>,
    pub input_artifacts: Vec<String>,
    pub output_artifacts: Vec<String>,
    /// Category-specific configuration, e.g. `ProjectName` for CodeBuild.
    pub configuration: BTreeMap<String, AttrValue>,
}

impl Action {
    pub fn new(name: impl Into<String>, category: ActionCategory, provider: ProviderBinding) -> Self {
        Self {
            name: name.into(),
            category,
            provider,
            run_order: None,
            input_artifacts: Vec::new(),
            output_artifacts: Vec::new(),
            configuration: BTreeMap::new(),
        }
    }

    pub fn with_run_order(mut self, run_order: i64) -> Self {
        self.run_order = Some(run_order);
        self
    }

    pub fn with_input(mut self, artifact: impl Into<String>) -> Self {
        self.input_artifacts.push(artifact.into());
        self
    }

    pub fn with_output(mut self, artifact: impl Into<String>) -> Self {
        self.output_artifacts.push(artifact.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// A source action that starts the pipeline's data flow.
    pub fn is_origin(&self) -> bool {
        self.category == ActionCategory::Source
            && self.input_artifacts.is_empty()
            && self.output_artifacts.len() == 1
    }
}

/// An ordered phase of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn action_ref(&self, action: &Action) -> ActionRef {
        ActionRef::new(&self.name, &action.name)
    }

    /// Actions paired with their references, in declaration order.
    pub fn action_refs(&self) -> impl Iterator<Item = (ActionRef, &Action)> {
        self.actions.iter().map(|a| (self.action_ref(a), a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github() -> ProviderBinding {
        ProviderBinding::new(ActionOwner::ThirdParty, "GitHub")
    }

    #[test]
    fn test_source_origin() {
        let action = Action::new("Source", ActionCategory::Source, github())
            .with_run_order(1)
            .with_output("source_output");
        assert!(action.is_origin());

        let no_output = Action::new("Source", ActionCategory::Source, github());
        assert!(!no_output.is_origin());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Build".parse::<ActionCategory>().unwrap(), ActionCategory::Build);
        assert!("build".parse::<ActionCategory>().is_err());
    }

    #[test]
    fn test_owner_serializes_like_codepipeline() {
        assert_eq!(serde_json::to_string(&ActionOwner::Aws).unwrap(), "\"AWS\"");
        assert_eq!("ThirdParty".parse::<ActionOwner>().unwrap(), ActionOwner::ThirdParty);
    }

    #[test]
    fn test_action_refs_follow_declaration_order() {
        let stage = Stage::new("Build")
            .with_action(Action::new("B", ActionCategory::Build, github()))
            .with_action(Action::new("A", ActionCategory::Build, github()));
        let refs: Vec<String> = stage.action_refs().map(|(r, _)| r.to_string()).collect();
        assert_eq!(refs, vec!["Build/B", "Build/A"]);
    }
}
