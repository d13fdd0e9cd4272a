//! Classifier instructions, including the structural requirement

use crate::error::ClassifierError;
use std::path::Path;

/// Builds the instructions sent with every batch
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    instructions: Option<String>,
    rules: Option<String>,
}

impl PromptBuilder {
    /// Create a builder with the built-in classification guidance only
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in guidance with custom instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.instructions = (!instructions.trim().is_empty()).then_some(instructions);
        self
    }

    /// Attach a rules document (must be valid JSON)
    pub fn with_rules(mut self, rules: &str) -> Result<Self, ClassifierError> {
        let value: serde_json::Value = serde_json::from_str(rules)?;
        self.rules = Some(serde_json::to_string_pretty(&value)?);
        Ok(self)
    }

    /// Load optional instructions and rules files
    ///
    /// Missing paths are skipped; a path that exists but cannot be read is
    /// an error.
    pub fn from_files(
        instructions: Option<&Path>,
        rules: Option<&Path>,
    ) -> Result<Self, ClassifierError> {
        let mut builder = Self::new();
        if let Some(text) = read_optional(instructions)? {
            builder = builder.with_instructions(text);
        }
        if let Some(text) = read_optional(rules)? {
            builder = builder.with_rules(&text)?;
        }
        Ok(builder)
    }

    /// Whether a rules document is attached
    pub fn has_rules(&self) -> bool {
        self.rules.is_some()
    }

    /// Build the instructions for a batch of `expected` items
    pub fn build(&self, expected: usize) -> String {
        let mut prompt = String::new();

        prompt.push_str(self.instructions.as_deref().unwrap_or(CLASSIFICATION_GUIDANCE));
        prompt.push_str("\n\n");

        if let Some(rules) = &self.rules {
            prompt.push_str("RULES JSON (authoritative for type and effort):\n");
            prompt.push_str(rules);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&structural_requirement(expected));
        prompt
    }
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>, ClassifierError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| ClassifierError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// The response shape every batch must satisfy
pub fn structural_requirement(expected: usize) -> String {
    format!(
        r#"Respond with a single JSON object and nothing else:
{{"results": [ ... ]}}

The "results" array must contain exactly {expected} entries, one per task, in the
same order the tasks were given. Each entry must carry the task's "id" plus
"category", "type" and "effort_minutes". No markdown code fences, no commentary."#
    )
}

const CLASSIFICATION_GUIDANCE: &str = r#"Classify each task by the kind of work it represents.

- category: one of Drafting, Editing, Publishing, Planning, Other
- type: the deliverable (e.g. Article, Newsletter, Text Ad, Social Post)
- effort_minutes: estimated minutes of hands-on work

Use the title first. "Preview link sent", "send to client" and "sent to press"
are Publishing; "Writer:" is Drafting; "Editor:" is Editing; "Planner:" and
"Planning:" are Planning."#;
