use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-habit async mutexes serializing mutations of the same habit.
///
/// In-memory, so it only covers a single server instance.
#[derive(Clone, Default)]
pub struct HabitLocks {
    entries: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl HabitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `habit_id`. Held until the guard drops.
    pub async fn acquire(&self, habit_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            entries.entry(habit_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the entry for `habit_id` once no request holds or waits on it.
    ///
    /// Call after the guard is dropped, so entries only live while in use.
    pub async fn release(&self, habit_id: i64) {
        let mut entries = self.entries.lock().await;
        if entries
            .get(&habit_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(&habit_id);
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
