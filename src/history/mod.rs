//! In-memory conversation history
//!
//! Histories live only for the lifetime of the process. Writers for the same
//! conversation are serialized through [`ConversationStore::lock`]; readers
//! never block on an in-flight exchange.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::api::Message;

pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
    locks: std::sync::Mutex<HashMap<String, Weak<Mutex<()>>>>,
    max_messages: Option<usize>,
}

impl ConversationStore {
    /// `max_messages` of `None` keeps every message
    pub fn new(max_messages: Option<usize>) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            locks: std::sync::Mutex::new(HashMap::new()),
            max_messages,
        }
    }

    /// Snapshot of a conversation. Unknown ids read as empty and are not
    /// created.
    pub async fn get(&self, id: &str) -> Vec<Message> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a conversation, applying the retention cap
    pub async fn put(&self, id: &str, mut messages: Vec<Message>) {
        if let Some(max) = self.max_messages {
            trim_to(&mut messages, max);
        }
        self.conversations
            .write()
            .await
            .insert(id.to_string(), messages);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.conversations.read().await.contains_key(id)
    }

    /// Number of stored conversations
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }

    /// Exclusive access to one conversation for the span of an exchange
    /// (history read through commit). Different ids never contend.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let fresh = Arc::new(Mutex::new(()));
                    locks.insert(id.to_string(), Arc::downgrade(&fresh));
                    fresh
                }
            }
        };
        mutex.lock_owned().await
    }
}

/// Drop the oldest messages until at most `max` remain. Removal happens in
/// user/assistant pairs so a conversation never starts with a dangling
/// assistant reply.
fn trim_to(messages: &mut Vec<Message>, max: usize) {
    if messages.len() <= max {
        return;
    }
    let mut excess = messages.len() - max;
    if excess % 2 == 1 {
        excess += 1;
    }
    let excess = excess.min(messages.len());
    messages.drain(..excess);
}
