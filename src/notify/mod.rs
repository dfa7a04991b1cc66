// src/notify/mod.rs
pub mod email;

pub use email::EmailSender;

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AlertSubscription {
    pub email: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory, capacity-bounded subscription registry.
#[derive(Debug)]
pub struct SubscriptionBook {
    inner: Mutex<Vec<AlertSubscription>>,
    cap: usize,
}

impl SubscriptionBook {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            cap: cap.min(10_000),
        }
    }

    pub fn subscribe(&self, email: &str, query: &str) -> AlertSubscription {
        let sub = AlertSubscription {
            email: email.to_string(),
            query: query.to_string(),
            created_at: Utc::now(),
        };
        let mut v = self.inner.lock().expect("subscription book mutex poisoned");
        v.push(sub.clone());
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
        sub
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("subscription book mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<AlertSubscription> {
        self.inner
            .lock()
            .expect("subscription book mutex poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_keeps_newest_when_over_capacity() {
        let book = SubscriptionBook::with_capacity(2);
        book.subscribe("a@example.test", "rust");
        book.subscribe("b@example.test", "data");
        book.subscribe("c@example.test", "design");

        let subs = book.snapshot();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].email, "b@example.test");
        assert_eq!(subs[1].email, "c@example.test");
    }
}
