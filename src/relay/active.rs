//! Per-chat single-flight registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use teloxide::types::ChatId;

/// Set of chats with a relay request in flight.
#[derive(Debug, Clone, Default)]
pub struct ActiveRequests {
    chats: Arc<Mutex<HashSet<ChatId>>>,
}

impl ActiveRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `chat_id`, or `None` if a request for it is already in flight.
    ///
    /// The claim lasts until the returned guard is dropped.
    pub fn try_acquire(&self, chat_id: ChatId) -> Option<ActiveRequestGuard> {
        if self.lock().insert(chat_id) {
            Some(ActiveRequestGuard {
                chats: Arc::clone(&self.chats),
                chat_id,
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, chat_id: ChatId) -> bool {
        self.lock().contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ChatId>> {
        // The set stays consistent even if a holder panicked.
        self.chats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the chat's slot on drop.
#[derive(Debug)]
pub struct ActiveRequestGuard {
    chats: Arc<Mutex<HashSet<ChatId>>>,
    chat_id: ChatId,
}

impl ActiveRequestGuard {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        let mut chats = self
            .chats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chats.remove(&self.chat_id);
    }
}
