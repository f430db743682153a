use crate::StepId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted while a pipeline runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        event_id: Uuid,
        start: StepId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        run_id: RunId,
        step: StepId,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        run_id: RunId,
        step: StepId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepFailed {
        run_id: RunId,
        step: StepId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RouteChosen {
        run_id: RunId,
        router: StepId,
        next: Option<StepId>,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ExecutionEvent::RunStarted { run_id, .. }
            | ExecutionEvent::RunCompleted { run_id, .. }
            | ExecutionEvent::StepStarted { run_id, .. }
            | ExecutionEvent::StepCompleted { run_id, .. }
            | ExecutionEvent::StepFailed { run_id, .. }
            | ExecutionEvent::RouteChosen { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for execution events.
///
/// Emitting never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Dropped execution event, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = RunId::new_v4();

        bus.emit(ExecutionEvent::StepStarted {
            run_id,
            step: StepId::from("AnalyzeTicket"),
            timestamp: Utc::now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.run_id(), run_id);
        assert!(matches!(received, ExecutionEvent::StepStarted { .. }));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(ExecutionEvent::RunCompleted {
            run_id: RunId::new_v4(),
            success: true,
            duration_ms: 0,
            timestamp: Utc::now(),
        });
    }
}
