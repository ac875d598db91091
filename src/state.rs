use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(label)
    }
}

/// One recorded message. Never mutated after it enters the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Exchange {
    user: Turn,
    assistant: Turn,
}

/// Append-only history of (user request, optimized prompt) exchanges for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    exchanges: Vec<Exchange>,
}

impl ConversationLog {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.exchanges.push(Exchange {
            user: Turn::user(user_text),
            assistant: Turn::assistant(assistant_text),
        });
    }

    pub fn history(&self) -> Vec<(&str, &str)> {
        self.exchanges
            .iter()
            .map(|exchange| (exchange.user.content(), exchange.assistant.content()))
            .collect()
    }

    /// Flattened user/assistant turns in recording order.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.exchanges
            .iter()
            .flat_map(|exchange| [&exchange.user, &exchange.assistant])
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Optimizing,
    Optimized,
    Generating,
    Done,
    Failed,
}

#[derive(Debug, thiserror::Error)]
#[error("Illegal request transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: RequestPhase,
    pub to: RequestPhase,
}

impl RequestPhase {
    pub fn can_transition_to(self, next: RequestPhase) -> bool {
        use RequestPhase::*;
        matches!(
            (self, next),
            (Idle, Optimizing)
                | (Optimizing, Optimized)
                | (Optimizing, Failed)
                | (Optimized, Generating)
                | (Generating, Done)
                | (Generating, Failed)
        )
    }

    pub fn transition(&mut self, next: RequestPhase) -> Result<(), IllegalTransition> {
        if !self.can_transition_to(next) {
            return Err(IllegalTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestPhase::Done | RequestPhase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
}

/// Everything one interactive session owns. Dropped when the session ends.
#[derive(Debug, Default)]
pub struct Session {
    pub log: ConversationLog,
    pub last_image: Option<GeneratedImage>,
    pub requests_started: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}
