#![forbid(unsafe_code)]

use stu_walkthrough::analytics::{Analytics, EventName, Properties};

/// Forwards every event to two sinks.
#[derive(Debug, Clone, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: Analytics, B: Analytics> Analytics for Tee<A, B> {
    fn track(&self, event: EventName, properties: Properties) {
        self.0.track(event, properties.clone());
        self.1.track(event, properties);
    }
}
