use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};
use kbm_sheet::Position;

/// What happened to a sheet, by base positions of the notes involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetChange {
    Put(Vec<Position>),
    Delete(Vec<Position>),
    Clear,
}

/// Fan-out of sheet changes to any number of listeners. A listener
/// unsubscribes by dropping its receiver; it is pruned on the next emit.
#[derive(Debug, Default)]
pub struct SheetEvents {
    subscribers: Mutex<Vec<Sender<SheetChange>>>,
}

impl SheetEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SheetChange> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, change: SheetChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
