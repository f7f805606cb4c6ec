//! Post-interview feedback: one non-streamed call scoring the transcript.
//!
//! The instruction text is a `FeedbackTemplate`, loaded from a TOML file
//! when `FEEDBACK_TEMPLATE_PATH` is set and the built-in default otherwise.
//! The provider's answer is shown as-is; it is not parsed or validated.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::interview::transcript::Transcript;
use crate::llm_client::prompts::{FEEDBACK_SYSTEM, FEEDBACK_USER_TEMPLATE, TRANSCRIPT_PLACEHOLDER};
use crate::llm_client::{ChatMessage, ChatProvider, ChatRole, LlmError};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read feedback template {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid feedback template: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("feedback template `user` must contain {{transcript}}")]
    MissingPlaceholder,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackTemplate {
    pub system: String,
    pub user: String,
}

impl Default for FeedbackTemplate {
    fn default() -> Self {
        Self {
            system: FEEDBACK_SYSTEM.to_string(),
            user: FEEDBACK_USER_TEMPLATE.to_string(),
        }
    }
}

impl FeedbackTemplate {
    pub fn from_toml(raw: &str) -> Result<Self, TemplateError> {
        let template: FeedbackTemplate = toml::from_str(raw)?;
        if !template.user.contains(TRANSCRIPT_PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder);
        }
        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn build_messages(&self, transcript: &Transcript) -> Vec<ChatMessage> {
        let user = self
            .user
            .replace(TRANSCRIPT_PLACEHOLDER, &transcript.render_plain());
        vec![
            ChatMessage::new(ChatRole::System, self.system.clone()),
            ChatMessage::new(ChatRole::User, user),
        ]
    }
}

/// Asks the provider to score the interview. Called once per session.
pub async fn generate_feedback(
    provider: &dyn ChatProvider,
    model: &str,
    template: &FeedbackTemplate,
    transcript: &Transcript,
) -> Result<String, LlmError> {
    let messages = template.build_messages(transcript);
    let feedback = provider.complete(model, &messages).await?;
    info!(
        "Feedback generated ({} chars, {} candidate messages)",
        feedback.len(),
        transcript.candidate_count()
    );
    Ok(feedback)
}
