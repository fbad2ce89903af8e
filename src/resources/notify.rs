//! Change notification.
//!
//! Events are queued while the engine lock is held, so their order is the
//! order in which changes were applied, and delivered to listeners only
//! after the lock is released. Listeners may therefore call back into the
//! engine.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::base::FileId;

/// A change broadcast to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Opens a group of related events.
    Begin,
    /// Closes the group opened by the matching `Begin`.
    End,
    /// A file was read for the first time.
    FileLoaded(FileId),
    /// A new tree was merged into a loaded file.
    TreeMerged(FileId),
    /// A file was forgotten.
    FileRemoved(PathBuf),
    /// The model changed; `None` means anything might have changed.
    ModelChanged(Option<FileId>),
    /// The published diagnostics of a file changed.
    DiagnosticsChanged(FileId),
}

pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Handle returned by `add_change_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Events waiting for delivery.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    pending: std::collections::VecDeque<ChangeEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: ChangeEvent) {
        self.pending.push_back(event);
    }

    pub fn begin(&mut self) {
        self.push(ChangeEvent::Begin);
    }

    pub fn end(&mut self) {
        self.push(ChangeEvent::End);
    }

    /// Position to pass to [`discard_since`](Self::discard_since).
    pub fn mark(&self) -> usize {
        self.pending.len()
    }

    /// Drop the events pushed after `mark` was taken. Only meaningful while
    /// the engine lock has been held since then.
    pub fn discard_since(&mut self, mark: usize) {
        self.pending.truncate(mark);
    }

    pub fn pop(&mut self) -> Option<ChangeEvent> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Registered listeners.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: Mutex<Vec<(ListenerId, ChangeListener)>>,
    next_id: Mutex<u64>,
}

impl Listeners {
    pub fn add(&self, listener: ChangeListener) -> ListenerId {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            ListenerId(*next)
        };
        self.entries.lock().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Call every listener with `event`, outside the listener lock.
    pub fn fire(&self, event: &ChangeEvent) {
        let snapshot: Vec<ChangeListener> =
            self.entries.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
