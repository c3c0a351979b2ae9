//! Core types for generation inputs and results.

use super::error::GenerationError;
use core::fmt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ─────────────────────
// Inputs
// ─────────────────────

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// A single role/content turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Kind of constraint carried by a [`StructuredOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredOutputFormat {
    /// Output must conform to a JSON schema.
    Json,
    /// Output must match a regular expression.
    Regex,
}

/// A structured-output constraint attached to an input.
///
/// The schema is opaque to this crate; backends that support guided
/// generation interpret it in
/// [`ModelBackend::prepare_structured_output`](super::ModelBackend::prepare_structured_output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    /// The constraint kind.
    pub format: StructuredOutputFormat,
    /// JSON schema object, or a regex pattern as a JSON string.
    pub schema: Value,
}

impl StructuredOutput {
    /// Creates a JSON schema constraint.
    #[must_use]
    pub fn json(schema: Value) -> Self {
        Self {
            format: StructuredOutputFormat::Json,
            schema,
        }
    }

    /// Creates a regex constraint.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            format: StructuredOutputFormat::Regex,
            schema: Value::String(pattern.into()),
        }
    }
}

/// A conversation ready to be sent to a backend.
///
/// Inputs are owned by the caller and only borrowed for the duration of a
/// generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedInput {
    /// Ordered conversation turns.
    pub messages: Vec<ChatMessage>,
    /// Optional structured-output constraint for this input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<StructuredOutput>,
}

impl FormattedInput {
    /// Creates an input from conversation turns.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            structured_output: None,
        }
    }

    /// Creates an input holding a single user message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use synthgen_models::llm::{FormattedInput, Role};
    ///
    /// let input = FormattedInput::user("Write a haiku about batching.");
    /// assert_eq!(input.messages[0].role, Role::User);
    /// ```
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(content)])
    }

    /// Attaches a structured-output constraint.
    #[must_use]
    pub fn with_structured_output(mut self, structured_output: StructuredOutput) -> Self {
        self.structured_output = Some(structured_output);
        self
    }

    /// Returns the content of the last message, if any.
    #[must_use]
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(|message| message.content.as_str())
    }
}

impl From<Vec<ChatMessage>> for FormattedInput {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self::new(messages)
    }
}

/// Free-form keyword arguments forwarded untouched to a backend.
pub type GenerationKwargs = Map<String, Value>;

// ─────────────────────
// Results
// ─────────────────────

/// Statistics key for prompt token counts.
pub const INPUT_TOKENS: &str = "input_tokens";

/// Statistics key for completion token counts.
pub const OUTPUT_TOKENS: &str = "output_tokens";

/// Per-generation metric values keyed by metric name.
pub type Statistics = BTreeMap<String, Vec<u64>>;

/// One candidate token and its log-probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    /// The candidate token.
    pub token: String,
    /// Log-probability of the candidate.
    pub logprob: f64,
}

/// Candidate distributions for every token of one generation.
pub type Logprobs = Vec<Vec<TokenLogprob>>;

/// Last hidden states of a sequence, shaped `[num_tokens, hidden_size]`.
pub type HiddenState = Vec<Vec<f32>>;

/// Generations and statistics produced for a single input.
///
/// For every statistics key, the number of values equals the number of
/// generations. See [`validate`](Self::validate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated texts, one slot per requested generation. A slot is `None`
    /// when the backend produced no text for it.
    pub generations: Vec<Option<String>>,
    /// Per-generation metric values.
    #[serde(default)]
    pub statistics: Statistics,
    /// Per-generation token log-probabilities, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Vec<Logprobs>>,
}

impl GenerationResult {
    /// Creates a result from generated texts with no statistics.
    #[must_use]
    pub fn from_generations<I, S>(generations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            generations: generations.into_iter().map(|g| Some(g.into())).collect(),
            statistics: Statistics::new(),
            logprobs: None,
        }
    }

    /// Sets the values of one statistic.
    #[must_use]
    pub fn with_statistic(mut self, key: impl Into<String>, values: Vec<u64>) -> Self {
        self.statistics.insert(key.into(), values);
        self
    }

    /// Sets the `input_tokens` and `output_tokens` statistics.
    #[must_use]
    pub fn with_token_usage(self, input_tokens: Vec<u64>, output_tokens: Vec<u64>) -> Self {
        self.with_statistic(INPUT_TOKENS, input_tokens)
            .with_statistic(OUTPUT_TOKENS, output_tokens)
    }

    /// Sets the per-generation log-probabilities.
    #[must_use]
    pub fn with_logprobs(mut self, logprobs: Vec<Logprobs>) -> Self {
        self.logprobs = Some(logprobs);
        self
    }

    /// Number of generation slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Returns `true` if there are no generation slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Returns the values recorded for a statistic.
    #[must_use]
    pub fn statistic(&self, key: &str) -> Option<&[u64]> {
        self.statistics.get(key).map(Vec::as_slice)
    }

    /// Checks that every statistic and the logprobs have one entry per generation.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InconsistentResult`] naming the first
    /// offending key.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let expected = self.generations.len();
        for (key, values) in &self.statistics {
            if values.len() != expected {
                return Err(GenerationError::InconsistentResult {
                    key: key.clone(),
                    expected,
                    actual: values.len(),
                });
            }
        }
        if let Some(logprobs) = &self.logprobs
            && logprobs.len() != expected
        {
            return Err(GenerationError::InconsistentResult {
                key: "logprobs".to_string(),
                expected,
                actual: logprobs.len(),
            });
        }
        Ok(())
    }
}

/// One [`GenerationResult`] per submitted input, in submission order.
pub type GenerationBatchResult = Vec<GenerationResult>;

// ─────────────────────
// Offline jobs
// ─────────────────────

/// Opaque identifiers of jobs submitted to an offline batch backend.
///
/// Serializes as a plain JSON array so callers can persist it between
/// process invocations and resume polling later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobIds(Vec<String>);

impl JobIds {
    /// Creates a job id set.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Returns the ids as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no jobs were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the ids.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for JobIds {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for JobIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
