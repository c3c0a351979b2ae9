//! Runtime parameter introspection.
//!
//! Configuration tooling asks an [`Llm`](super::Llm) which parameters can be
//! set at run time. The answer combines the fixed [`LlmConfig`](super::LlmConfig)
//! fields with the keyword parameters declared by the backend's generation
//! primitive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter names that belong to the generation call itself and are never
/// exposed as runtime parameters.
pub const RESERVED_PARAMETERS: [&str; 3] = ["input", "inputs", "num_generations"];

/// A keyword parameter accepted by a backend's generation primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateParameter {
    /// Parameter name.
    pub name: String,
    /// Whether the parameter has a default value.
    pub optional: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GenerateParameter {
    /// Declares a parameter that must be provided.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            description: None,
        }
    }

    /// Declares a parameter with a default value.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            description: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns `true` for `input`, `inputs` and `num_generations`.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        RESERVED_PARAMETERS.contains(&self.name.as_str())
    }
}

/// Optional flag of a runtime parameter, or of each key of a nested one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeParameterName {
    /// A leaf parameter and whether it is optional.
    Optional(bool),
    /// A parameter holding named sub-parameters.
    Nested(BTreeMap<String, bool>),
}

/// Runtime parameter names mapped to their optional flags.
pub type RuntimeParametersNames = BTreeMap<String, RuntimeParameterName>;

/// Description of a runtime parameter for user-facing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeParameterInfo {
    /// Parameter name.
    pub name: String,
    /// Whether the parameter may be omitted.
    pub optional: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sub-parameters, for `generation_kwargs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<GenerateParameter>>,
}

pub(crate) const GENERATION_KWARGS: &str = "generation_kwargs";
pub(crate) const USE_OFFLINE_BATCH_GENERATION: &str = "use_offline_batch_generation";
pub(crate) const BLOCK_UNTIL_DONE: &str = "offline_batch_generation_block_until_done";

const GENERATION_KWARGS_DESCRIPTION: &str =
    "The kwargs to be propagated to the generation call of each model.";
const USE_OFFLINE_BATCH_GENERATION_DESCRIPTION: &str =
    "Whether to use offline batch generation to generate the responses.";
const BLOCK_UNTIL_DONE_DESCRIPTION: &str = "If provided, poll until offline batch generation \
    is able to retrieve the results. The value is the number of seconds to wait between polls.";

/// Builds the name map for a backend declaring `generate_parameters`.
#[must_use]
pub fn runtime_parameters_names(generate_parameters: &[GenerateParameter]) -> RuntimeParametersNames {
    let kwargs = generate_parameters
        .iter()
        .filter(|param| !param.is_reserved())
        .map(|param| (param.name.clone(), param.optional))
        .collect();

    let mut names = RuntimeParametersNames::new();
    names.insert(GENERATION_KWARGS.to_string(), RuntimeParameterName::Nested(kwargs));
    names.insert(
        USE_OFFLINE_BATCH_GENERATION.to_string(),
        RuntimeParameterName::Optional(true),
    );
    names.insert(BLOCK_UNTIL_DONE.to_string(), RuntimeParameterName::Optional(true));
    names
}

/// Builds the parameter descriptions for a backend declaring `generate_parameters`.
#[must_use]
pub fn runtime_parameters_info(generate_parameters: &[GenerateParameter]) -> Vec<RuntimeParameterInfo> {
    let keys = generate_parameters
        .iter()
        .filter(|param| !param.is_reserved())
        .cloned()
        .collect();

    vec![
        RuntimeParameterInfo {
            name: GENERATION_KWARGS.to_string(),
            optional: true,
            description: Some(GENERATION_KWARGS_DESCRIPTION.to_string()),
            keys: Some(keys),
        },
        RuntimeParameterInfo {
            name: USE_OFFLINE_BATCH_GENERATION.to_string(),
            optional: true,
            description: Some(USE_OFFLINE_BATCH_GENERATION_DESCRIPTION.to_string()),
            keys: None,
        },
        RuntimeParameterInfo {
            name: BLOCK_UNTIL_DONE.to_string(),
            optional: true,
            description: Some(BLOCK_UNTIL_DONE_DESCRIPTION.to_string()),
            keys: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Vec<GenerateParameter> {
        vec![
            GenerateParameter::required("inputs"),
            GenerateParameter::optional("num_generations"),
            GenerateParameter::optional("temperature").with_description("Sampling temperature."),
            GenerateParameter::required("stop"),
        ]
    }

    #[test]
    fn names_skip_reserved_parameters() {
        let names = runtime_parameters_names(&declared());

        let Some(RuntimeParameterName::Nested(kwargs)) = names.get(GENERATION_KWARGS) else {
            panic!("generation_kwargs should be nested");
        };
        assert_eq!(kwargs.len(), 2);
        assert_eq!(kwargs.get("temperature"), Some(&true));
        assert_eq!(kwargs.get("stop"), Some(&false));
        assert_eq!(
            names.get(BLOCK_UNTIL_DONE),
            Some(&RuntimeParameterName::Optional(true))
        );
    }

    #[test]
    fn names_serialize_as_plain_json() {
        let names = runtime_parameters_names(&[GenerateParameter::optional("top_p")]);
        assert_eq!(
            serde_json::to_value(&names).unwrap(),
            serde_json::json!({
                "generation_kwargs": {"top_p": true},
                "offline_batch_generation_block_until_done": true,
                "use_offline_batch_generation": true,
            })
        );
    }

    #[test]
    fn info_lists_generation_kwargs_keys() {
        let info = runtime_parameters_info(&declared());
        assert_eq!(info.len(), 3);

        let keys = info[0].keys.as_ref().unwrap();
        let names: Vec<_> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "stop"]);
        assert_eq!(keys[0].description.as_deref(), Some("Sampling temperature."));
        assert!(info[1].keys.is_none());
    }
}
