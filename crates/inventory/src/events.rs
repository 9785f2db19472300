//! Domain events published by the inventory operations.
//!
//! Events are emitted only after the state change they describe has been
//! persisted; consumers must tolerate at-least-once delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_events::Event;

use crate::item::InventoryItemId;
use crate::money::Money;
use crate::reservation::{ReservationReference, StockReservationId};
use crate::sku::Sku;

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: InventoryItemId,
    pub sku: Sku,
    pub price: Money,
    pub on_hand: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemPriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPriceChanged {
    pub item_id: InventoryItemId,
    pub old_price: Money,
    pub new_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: InventoryItemId,
    pub delta: i64,
    /// On-hand count after the adjustment.
    pub on_hand: u32,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDiscontinued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDiscontinued {
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReactivated {
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub item_id: InventoryItemId,
    pub reservation_id: StockReservationId,
    pub reference: ReservationReference,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub item_id: InventoryItemId,
    pub reservation_id: StockReservationId,
    pub reference: ReservationReference,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    ItemPriceChanged(ItemPriceChanged),
    StockAdjusted(StockAdjusted),
    ItemDiscontinued(ItemDiscontinued),
    ItemReactivated(ItemReactivated),
    StockReserved(StockReserved),
    StockReleased(StockReleased),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::ItemPriceChanged(_) => "inventory.item.price_changed",
            InventoryEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
            InventoryEvent::ItemDiscontinued(_) => "inventory.item.discontinued",
            InventoryEvent::ItemReactivated(_) => "inventory.item.reactivated",
            InventoryEvent::StockReserved(_) => "inventory.stock.reserved",
            InventoryEvent::StockReleased(_) => "inventory.stock.released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::ItemPriceChanged(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::ItemDiscontinued(e) => e.occurred_at,
            InventoryEvent::ItemReactivated(e) => e.occurred_at,
            InventoryEvent::StockReserved(e) => e.occurred_at,
            InventoryEvent::StockReleased(e) => e.occurred_at,
        }
    }
}
