use serde::Serialize;

pub const WELCOME_TEXT: &str = "Hi! I can help you log your meals. Just tell me what you ate, like \"I had 2 rotis and chana masala\" or \"I ate a banana and yogurt for breakfast\".";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownItem {
    pub label: String,
    pub quantity_or_measurement: Option<String>,
    pub calories: f64,
    pub protein: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryKind {
    Plain,
    Clarification { suggestions: Vec<String> },
    Breakdown { breakdown_items: Vec<BreakdownItem> },
    Error,
}

/// A system reply that has not been given a place in the transcript yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub id: u64,
    pub role: Role,
    pub text: String,
    #[serde(flatten)]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("a message is already being processed")]
    Busy,
    #[error("message is required")]
    EmptyUtterance,
}

/// Append-only conversation with at most one utterance in flight.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_id: u64,
    state: ChatState,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let mut t = Self {
            entries: Vec::new(),
            next_id: 1,
            state: ChatState::Idle,
        };
        t.push(Role::System, WELCOME_TEXT.to_string(), EntryKind::Plain);
        t
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Idle -> AwaitingResponse`. Appends the trimmed utterance as a user entry.
    /// A rejected submission leaves the transcript untouched.
    pub fn submit(&mut self, utterance: &str) -> Result<&TranscriptEntry, SubmitRejected> {
        if self.state == ChatState::AwaitingResponse {
            return Err(SubmitRejected::Busy);
        }
        let text = utterance.trim();
        if text.is_empty() {
            return Err(SubmitRejected::EmptyUtterance);
        }
        self.state = ChatState::AwaitingResponse;
        Ok(self.push(Role::User, text.to_string(), EntryKind::Plain))
    }

    /// `AwaitingResponse -> Idle`. Returns `None` when nothing is in flight.
    pub fn complete(&mut self, reply: Reply) -> Option<&TranscriptEntry> {
        if self.state != ChatState::AwaitingResponse {
            return None;
        }
        self.state = ChatState::Idle;
        Some(self.push(Role::System, reply.text, reply.kind))
    }

    fn push(&mut self, role: Role, text: String, kind: EntryKind) -> &TranscriptEntry {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(TranscriptEntry { id, role, text, kind });
        &self.entries[self.entries.len() - 1]
    }
}
