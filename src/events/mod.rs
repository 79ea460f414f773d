use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{JobOrderStatus, QuotationStatus, SamplingStatus};

/// Handle services use to publish domain events
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event and logs instead of failing when the consumer is gone.
    /// Events are published after commit, so a lost event never undoes a write.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            counter!("labdesk.events.dropped", 1, "event" => name);
            warn!(event = name, error = %e, "domain event dropped");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProfileCreated {
        profile_id: Uuid,
    },
    QuotationCreated {
        quotation_id: Uuid,
        quotation_number: String,
    },
    QuotationStatusChanged {
        quotation_id: Uuid,
        old_status: QuotationStatus,
        new_status: QuotationStatus,
    },
    QuotationDeleted {
        quotation_id: Uuid,
    },
    JobOrderCreated {
        job_order_id: Uuid,
        job_number: String,
        quotation_id: Uuid,
    },
    JobOrderStatusChanged {
        job_order_id: Uuid,
        old_status: JobOrderStatus,
        new_status: JobOrderStatus,
    },
    JobOrderDeleted {
        job_order_id: Uuid,
    },
    SamplingAssignmentCreated {
        assignment_id: Uuid,
        job_order_id: Uuid,
        field_officer_id: Uuid,
    },
    SamplingStatusChanged {
        assignment_id: Uuid,
        job_order_id: Uuid,
        old_status: SamplingStatus,
        new_status: SamplingStatus,
        job_order_status: JobOrderStatus,
        changed_at: DateTime<Utc>,
    },
    SamplingAssignmentDeleted {
        assignment_id: Uuid,
    },
    TravelOrderCreated {
        travel_order_id: Uuid,
        document_number: String,
        assignment_id: Uuid,
    },
    TravelOrderDeleted {
        travel_order_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProfileCreated { .. } => "profile_created",
            Event::QuotationCreated { .. } => "quotation_created",
            Event::QuotationStatusChanged { .. } => "quotation_status_changed",
            Event::QuotationDeleted { .. } => "quotation_deleted",
            Event::JobOrderCreated { .. } => "job_order_created",
            Event::JobOrderStatusChanged { .. } => "job_order_status_changed",
            Event::JobOrderDeleted { .. } => "job_order_deleted",
            Event::SamplingAssignmentCreated { .. } => "sampling_assignment_created",
            Event::SamplingStatusChanged { .. } => "sampling_status_changed",
            Event::SamplingAssignmentDeleted { .. } => "sampling_assignment_deleted",
            Event::TravelOrderCreated { .. } => "travel_order_created",
            Event::TravelOrderDeleted { .. } => "travel_order_deleted",
        }
    }
}

/// Drains the event channel, logging every event until all senders are dropped
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("labdesk.events.processed", 1, "event" => event.name());

        match &event {
            Event::SamplingStatusChanged {
                assignment_id,
                job_order_id,
                old_status,
                new_status,
                job_order_status,
                ..
            } => {
                info!(
                    assignment_id = %assignment_id,
                    job_order_id = %job_order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    job_order_status = %job_order_status,
                    "sampling status changed"
                );
            }
            Event::TravelOrderCreated {
                document_number,
                assignment_id,
                ..
            } => {
                info!(
                    document_number = %document_number,
                    assignment_id = %assignment_id,
                    "travel order issued"
                );
            }
            other => {
                info!(event = other.name(), payload = ?other, "domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender
            .send(Event::QuotationDeleted { quotation_id: id })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::QuotationDeleted { quotation_id: id })
        );
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        sender
            .send_or_log(Event::ProfileCreated {
                profile_id: Uuid::new_v4(),
            })
            .await;
        assert!(sender
            .send(Event::ProfileCreated {
                profile_id: Uuid::new_v4()
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx));

        sender
            .send(Event::JobOrderDeleted {
                job_order_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }
}
