use crate::chat::backend::ChatBackend;
use crate::chat::quota::MessageQuotaGate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Transcript entries kept in memory per session; older messages are
/// dropped from the front once the window is full.
const TRANSCRIPT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The quota gate refused the send; nothing changed.
    Blocked,
    Delivered { reply: String },
}

impl SendOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }
}

/// One installation's chat: transcript, quota gate, backend handle.
/// Constructor-injected so the hosting layer owns the lifecycle explicitly.
pub struct ChatSession {
    gate: MessageQuotaGate,
    backend: Arc<dyn ChatBackend>,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(gate: MessageQuotaGate, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            gate,
            backend,
            transcript: Vec::new(),
        }
    }

    pub async fn hydrate(&mut self) {
        self.gate.hydrate().await;
    }

    pub fn gate(&self) -> &MessageQuotaGate {
        &self.gate
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Attempts to send one message. A refused send returns `Blocked` with no
    /// state change. An accepted send appends the user message and advances
    /// the counter before the backend call; a backend failure propagates but
    /// does not roll either back.
    pub async fn send_message(
        &mut self,
        text: &str,
        privileged: bool,
    ) -> anyhow::Result<SendOutcome> {
        if !self.gate.can_send(privileged) {
            return Ok(SendOutcome::Blocked);
        }

        self.append(Role::User, text.to_string());
        self.gate.record_send(privileged);

        let reply = self.backend.send_chat_message(text, privileged).await?;

        self.append(Role::Assistant, reply.clone());

        Ok(SendOutcome::Delivered { reply })
    }

    fn append(&mut self, role: Role, text: String) {
        self.transcript.push(ChatMessage {
            role,
            text,
            sent_at: Utc::now(),
        });
        if self.transcript.len() > TRANSCRIPT_CAPACITY {
            let excess = self.transcript.len() - TRANSCRIPT_CAPACITY;
            self.transcript.drain(..excess);
        }
    }
}
