//! Variable interpolation for stack declarations.
//!
//! Supports variables like:
//! - `${stack.name}` - Stack name
//! - `${stack.region}` - Region of the first provider declaring one
//! - `${env.VAR_NAME}` - Environment variable
//! - `${secrets.SECRET_NAME}` - Secret value; the result is marked sensitive
//!
//! Any variable may carry a default: `${env.STAGE:-dev}`.

use crate::{ConfigError, ConfigResult};
use regex::{Captures, Regex};
use stackpipe_core::secret::SecretSource;
use stackpipe_core::{AttrValue, Sensitive, Stack};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::debug;

// Regex for matching ${...} variables with an optional :-default
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)?)(?::-([^}]*))?\}")
        .unwrap()
});

/// Variable context containing all available variables for interpolation.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    pub stack_name: String,
    pub region: Option<String>,
    /// Environment variables
    pub env: HashMap<String, String>,
    /// Secrets (redacted in output)
    pub secrets: HashMap<String, Sensitive>,
}

impl VariableContext {
    /// Create a new empty variable context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context carrying the stack's name and region.
    pub fn for_stack(stack: &Stack) -> Self {
        Self {
            stack_name: stack.name.clone(),
            region: stack.region().map(|r| r.to_string()),
            ..Self::default()
        }
    }

    /// Populate environment variables from the current process environment.
    pub fn populate_env(&mut self) {
        for (key, value) in std::env::vars() {
            self.env.insert(key, value);
        }
    }

    /// Interpolate all variables in a string.
    ///
    /// Unknown namespaces are left untouched. The result is sensitive when
    /// any secret was used.
    pub fn interpolate(&self, input: &str) -> ConfigResult<AttrValue> {
        let mut output = String::with_capacity(input.len());
        let mut sensitive = false;
        let mut last = 0;

        for caps in VAR_REGEX.captures_iter(input) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            output.push_str(&input[last..whole.start()]);
            if caps[1].starts_with("secrets.") {
                sensitive = true;
            }
            output.push_str(&self.resolve(&caps)?);
            last = whole.end();
        }
        output.push_str(&input[last..]);

        Ok(if sensitive {
            AttrValue::Sensitive(Sensitive::new(output))
        } else {
            AttrValue::String(output)
        })
    }

    fn resolve(&self, caps: &Captures<'_>) -> ConfigResult<String> {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str().to_string());
        let parts: Vec<&str> = var_name.split('.').collect();

        match parts.as_slice() {
            ["stack", "name"] => Ok(self.stack_name.clone()),
            ["stack", "region"] => self
                .region
                .clone()
                .or(default)
                .ok_or_else(|| ConfigError::UnresolvedVariable(var_name.to_string())),
            ["env", name] => self
                .env
                .get(*name)
                .cloned()
                .or(default)
                .ok_or_else(|| ConfigError::UnresolvedVariable(var_name.to_string())),
            ["secrets", name] => self
                .secrets
                .get(*name)
                .map(|s| s.expose().to_string())
                .or(default)
                .ok_or_else(|| ConfigError::MissingSecret(name.to_string())),
            _ => Ok(caps[0].to_string()),
        }
    }

    /// Substitute variables in every resource attribute and action configuration.
    pub fn substitute(&self, mut stack: Stack) -> ConfigResult<Stack> {
        let mut interpolate = |s: String| self.interpolate(&s);

        for resource in &mut stack.resources {
            let attributes = std::mem::take(&mut resource.attributes);
            for (key, value) in attributes {
                let value = value.try_map_strings(&mut interpolate)?;
                resource.attributes.insert(key, value);
            }
        }

        for stage in &mut stack.stages {
            for action in &mut stage.actions {
                let configuration = std::mem::take(&mut action.configuration);
                for (key, value) in configuration {
                    let value = value.try_map_strings(&mut interpolate)?;
                    action.configuration.insert(key, value);
                }
            }
        }

        Ok(stack)
    }

    /// Fetch `names` from `source`. Secrets the source does not know are
    /// skipped so that declared defaults can apply.
    pub async fn load_secrets(
        &mut self,
        source: &dyn SecretSource,
        names: impl IntoIterator<Item = String>,
    ) -> ConfigResult<()> {
        for name in names {
            match source.get(&name).await {
                Ok(value) => {
                    self.secrets.insert(name, value);
                }
                Err(stackpipe_core::Error::NotFound(_)) => {
                    debug!(secret = %name, source = source.name(), "Secret not set");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Names of all secrets used anywhere in the stack.
pub fn required_secrets(stack: &Stack) -> BTreeSet<String> {
    let mut strings = Vec::new();
    for resource in &stack.resources {
        for value in resource.attributes.values() {
            collect_strings(value, &mut strings);
        }
    }
    for stage in &stack.stages {
        for action in &stage.actions {
            for value in action.configuration.values() {
                collect_strings(value, &mut strings);
            }
        }
    }

    strings
        .into_iter()
        .flat_map(|s| VAR_REGEX.captures_iter(s))
        .filter_map(|caps| {
            caps[1]
                .strip_prefix("secrets.")
                .map(|name| name.to_string())
        })
        .collect()
}

fn collect_strings<'a>(value: &'a AttrValue, out: &mut Vec<&'a str>) {
    match value {
        AttrValue::String(s) => out.push(s),
        AttrValue::List(items) => items.iter().for_each(|item| collect_strings(item, out)),
        AttrValue::Map(entries) => entries.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Builder for creating VariableContext.
pub struct VariableContextBuilder {
    ctx: VariableContext,
}

impl VariableContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: VariableContext::new(),
        }
    }

    pub fn with_stack(mut self, name: impl Into<String>) -> Self {
        self.ctx.stack_name = name.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.ctx.region = Some(region.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.env.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.secrets.insert(key.into(), Sensitive::new(value));
        self
    }

    pub fn build(self) -> VariableContext {
        self.ctx
    }
}

impl Default for VariableContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
