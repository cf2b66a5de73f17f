//! Prompt template loading and rendering via `minijinja`.
//!
//! Every prompt is a system message (the agent's persona, rendered from
//! `system.j2`) plus a task-specific user message. Default templates are
//! compiled into the crate; a templates directory may replace any of them
//! so operators can tune agent voices without recompiling.

use std::path::Path;

use minijinja::Environment;
use tracing::debug;

use crate::error::RunnerError;

/// Name and built-in source of every template.
const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    ("system.j2", include_str!("../templates/system.j2")),
    ("post.j2", include_str!("../templates/post.j2")),
    ("reaction.j2", include_str!("../templates/reaction.j2")),
    ("memory_update.j2", include_str!("../templates/memory_update.j2")),
    (
        "relationship_update.j2",
        include_str!("../templates/relationship_update.j2"),
    ),
];

/// The task a prompt asks the model to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Write the text of a post, reply or quote.
    Post,
    /// Judge how to react to someone else's post.
    Reaction,
    /// Turn an event into a memory and a mood shift.
    MemoryUpdate,
    /// Judge how an interaction changes a relationship.
    RelationshipUpdate,
}

impl PromptKind {
    /// Template file holding the user message for this task.
    pub const fn template(self) -> &'static str {
        match self {
            Self::Post => "post.j2",
            Self::Reaction => "reaction.j2",
            Self::MemoryUpdate => "memory_update.j2",
            Self::RelationshipUpdate => "relationship_update.j2",
        }
    }

    /// What shape of answer the task expects.
    pub const fn format(self) -> ResponseFormat {
        match self {
            Self::Post => ResponseFormat::Text,
            Self::Reaction | Self::MemoryUpdate | Self::RelationshipUpdate => {
                ResponseFormat::Json
            }
        }
    }
}

/// Shape of the answer a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free text to publish.
    Text,
    /// A JSON object (line-prefixed fields are accepted as a fallback).
    Json,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the agent's persona.
    pub system: String,
    /// User message describing the task.
    pub user: String,
    /// Expected answer shape.
    pub format: ResponseFormat,
}

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Create a prompt engine whose templates come from `dir` where present.
    ///
    /// Files missing from the directory keep their built-in version.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(RunnerError::Template(format!(
                "templates directory not found: {}",
                dir.display()
            )));
        }
        let mut engine = Self::builtin()?;
        for (name, _) in BUILTIN_TEMPLATES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                RunnerError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            engine
                .env
                .add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name}: {e}")))?;
            debug!(template = name, path = %path.display(), "Template override loaded");
        }
        Ok(engine)
    }

    /// Render the prompt for `kind` from a JSON context.
    pub fn render(
        &self,
        kind: PromptKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_template("system.j2", context)?;
        let user = self.render_template(kind.template(), context)?;
        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            user: user.trim().to_owned(),
            format: kind.format(),
        })
    }

    /// Render one named template.
    fn render_template(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine")
            .field("templates", &self.env.templates().count())
            .finish()
    }
}
