//! Discount event recording

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::engine::{AutomationEngine, ProcessingReport};
use crate::error::DiscountError;
use crate::event::{DiscountEvent, NewDiscountEvent};
use crate::ports::DiscountStorePort;

/// An appended event and what the rules did with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event: DiscountEvent,
    pub report: ProcessingReport,
}

/// Appends events and processes them immediately
///
/// The caller waits for every rule to be evaluated; there is no queue.
pub struct DiscountEventRecorder {
    store: Arc<dyn DiscountStorePort>,
    engine: Arc<AutomationEngine>,
}

impl DiscountEventRecorder {
    pub fn new(store: Arc<dyn DiscountStorePort>, engine: Arc<AutomationEngine>) -> Self {
        Self { store, engine }
    }

    #[instrument(skip(self, request), fields(event_type = ?request.event_type))]
    pub async fn record_event(&self, request: NewDiscountEvent) -> Result<RecordedEvent, DiscountError> {
        let event = DiscountEvent::create(request)?;
        self.store.insert_event(&event).await?;
        info!(
            event_id = %event.id,
            student_id = ?event.student_id,
            family_id = ?event.family_id,
            "Recorded discount event"
        );

        let report = self.engine.process_event(&event).await?;
        Ok(RecordedEvent { event, report })
    }
}
