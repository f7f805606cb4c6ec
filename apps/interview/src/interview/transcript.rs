use serde::Serialize;

use crate::llm_client::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Persona prompt. Sent to the provider, hidden from the chat view.
    System,
    Interviewer,
    Candidate,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Interviewer => "interviewer",
            Role::Candidate => "candidate",
        }
    }

    fn chat_role(self) -> ChatRole {
        match self {
            Role::System => ChatRole::System,
            Role::Interviewer => ChatRole::Assistant,
            Role::Candidate => ChatRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub role: Role,
    pub content: String,
}

/// Append-only interview log. Entries are never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    candidate_count: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        if role == Role::Candidate {
            self.candidate_count += 1;
        }
        self.entries.push(Entry {
            role,
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Interviewer/candidate exchange, without the persona prompt.
    pub fn dialogue(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.role != Role::System)
    }

    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|e| ChatMessage::new(e.role.chat_role(), e.content.clone()))
            .collect()
    }

    /// `role: content` per entry, one per line.
    pub fn render_plain(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.role.as_str(), e.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
