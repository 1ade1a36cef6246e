//! Pending writes awaiting their echo.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use uuid::Uuid;

struct Pending {
    message: String,
    confirm: oneshot::Sender<()>,
}

/// Commands written to one device that have not been echoed back yet.
#[derive(Default)]
pub struct PendingWrites {
    entries: Mutex<HashMap<Uuid, Pending>>,
}

impl PendingWrites {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Pending>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `message`; the receiver resolves once its echo is seen.
    pub fn register(&self, message: &str) -> (Uuid, oneshot::Receiver<()>) {
        let id = Uuid::new_v4();
        let (confirm, confirmed) = oneshot::channel();
        self.lock().insert(
            id,
            Pending {
                message: message.to_string(),
                confirm,
            },
        );
        (id, confirmed)
    }

    /// Match an echoed line against the pending set.
    ///
    /// Fires and removes one entry whose message equals `line`; returns
    /// whether any entry matched.
    pub fn confirm(&self, line: &str) -> bool {
        let mut entries = self.lock();
        let Some(id) = entries
            .iter()
            .find_map(|(id, pending)| (pending.message == line).then_some(*id))
        else {
            return false;
        };
        if let Some(pending) = entries.remove(&id) {
            // The writer may have given up already.
            let _ = pending.confirm.send(());
        }
        true
    }

    /// Stop tracking `id`; returns whether it was still pending.
    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
