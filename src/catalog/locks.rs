//! Per-book scoped sections

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::models::BookId;

type Slots = Arc<Mutex<HashMap<BookId, Arc<AsyncMutex<()>>>>>;

/// Keyed async lock table.
///
/// Holds one mutex per book that is currently locked or awaited; a slot is
/// dropped as soon as nobody references it, so the table stays as small as
/// the number of books with in-flight mutations.
#[derive(Clone, Default)]
pub struct BookLocks {
    slots: Slots,
}

impl BookLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `book_id`
    pub async fn acquire(&self, book_id: BookId) -> BookGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(book_id).or_default())
        };

        let guard = slot.lock_owned().await;
        BookGuard {
            book_id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Number of books with a live slot
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Proof of holding a book's scoped section; released on drop
pub struct BookGuard {
    book_id: BookId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots,
}

impl BookGuard {
    pub fn book_id(&self) -> BookId {
        self.book_id
    }
}

impl Drop for BookGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only counts waiters
        drop(self.guard.take());

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(&self.book_id) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.book_id);
            }
        }
    }
}
