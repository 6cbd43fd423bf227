use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a successful commit. Consumers run out of
/// band; delivery failure never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),

    // Inventory events
    InventoryCreated {
        inventory_id: Uuid,
        product_id: Uuid,
    },
    InventoryUpdated(Uuid),
    StockAdjusted {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    StockAdded {
        product_id: Uuid,
        quantity: i32,
    },
    StockRemoved {
        product_id: Uuid,
        quantity: i32,
        sale_id: Option<Uuid>,
    },
    LowStockDetected {
        product_id: Uuid,
        quantity: i32,
        min_stock: i32,
    },

    // Sale events
    SaleCreated(Uuid),
    SaleUpdated(Uuid),
    SaleCancelled(Uuid),
    SaleStatusChanged {
        sale_id: Uuid,
        old_status: String,
        new_status: String,
    },
    SaleItemAdded {
        sale_id: Uuid,
        item_id: Uuid,
    },
    SaleItemUpdated {
        sale_id: Uuid,
        item_id: Uuid,
    },
    SaleItemRemoved {
        sale_id: Uuid,
        item_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging every event. The place to hang
/// notification fan-out later.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStockDetected {
                product_id,
                quantity,
                min_stock,
            } => {
                warn!(
                    product_id = %product_id,
                    quantity = quantity,
                    min_stock = min_stock,
                    "Product fell to or below its reorder threshold"
                );
            }
            other => {
                info!(event = ?other, "Domain event processed");
            }
        }
    }
    info!("Event channel closed; processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_processor() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::SaleCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed while receiver lives");

        assert!(matches!(rx.recv().await, Some(Event::SaleCreated(_))));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::SaleUpdated(Uuid::new_v4())).await.is_err());
    }
}
