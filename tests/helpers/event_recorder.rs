//! Records change events delivered to a listener.

use std::sync::Arc;

use parking_lot::Mutex;

use ned::resources::{ChangeEvent, ListenerId, NedResources};

#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl EventRecorder {
    /// Register a new recorder on `engine`.
    pub fn attach(engine: &NedResources) -> (Self, ListenerId) {
        let recorder = Self::default();
        let sink = recorder.events.clone();
        let id = engine.add_change_listener(move |event| sink.lock().push(event.clone()));
        (recorder, id)
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&ChangeEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    /// Every `Begin` is closed by a later `End` and nothing closes twice.
    pub fn assert_balanced(&self) {
        let mut depth = 0i32;
        for event in self.events.lock().iter() {
            match event {
                ChangeEvent::Begin => depth += 1,
                ChangeEvent::End => {
                    depth -= 1;
                    assert!(depth >= 0, "unmatched End");
                }
                _ => {}
            }
        }
        assert_eq!(depth, 0, "unclosed Begin");
    }

    /// Deepest begin/end nesting seen.
    pub fn max_depth(&self) -> usize {
        let mut depth = 0usize;
        let mut max = 0;
        for event in self.events.lock().iter() {
            match event {
                ChangeEvent::Begin => {
                    depth += 1;
                    max = max.max(depth);
                }
                ChangeEvent::End => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        max
    }
}
