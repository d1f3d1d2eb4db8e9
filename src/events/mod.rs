use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

pub mod outbox;

/// Domain events emitted after state changes commit. Delivery is
/// best-effort; losing an event never affects the committed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CutCreated {
        cut_id: Uuid,
        order_id: Uuid,
        total_amount: Decimal,
    },
    CutStatusChanged {
        cut_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ChildOrderSpawned {
        parent_order_id: Uuid,
        child_order_id: Uuid,
    },
    WorkOrderClosed(Uuid),
    NotificationQueued(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes the event channel for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::CutCreated {
                cut_id,
                order_id,
                total_amount,
            } => {
                info!(%cut_id, %order_id, %total_amount, "cut created");
            }
            Event::CutStatusChanged {
                cut_id,
                old_status,
                new_status,
            } => {
                info!(%cut_id, %old_status, %new_status, "cut status changed");
            }
            Event::ChildOrderSpawned {
                parent_order_id,
                child_order_id,
            } => {
                info!(%parent_order_id, %child_order_id, "child order spawned for remainder");
            }
            Event::WorkOrderClosed(order_id) => {
                info!(%order_id, "work order fully cut");
            }
            Event::NotificationQueued(outbox_id) => {
                info!(%outbox_id, "notification queued");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();
        sender
            .send(Event::WorkOrderClosed(order_id))
            .await
            .expect("send failed");
        match rx.recv().await {
            Some(Event::WorkOrderClosed(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let result = sender.send(Event::WorkOrderClosed(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
