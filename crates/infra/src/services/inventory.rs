//! Inventory orchestration (application-level services).
//!
//! Each operation is one synchronous unit of work: load the relevant
//! aggregate(s), apply a pure domain transition, persist the new versions,
//! publish the matching event. The whole read-modify-write sequence runs
//! inside the injected [`TransactionBoundary`]; saves carry the version the
//! aggregate was loaded at, so a concurrent writer surfaces as a
//! `Conflict` instead of a lost update or an oversell.
//!
//! Callers may retry any operation: the externally supplied reservation
//! reference is the idempotency key, and the documented no-op outcomes are
//! successes, not swallowed errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use atelier_core::{AggregateId, AggregateRoot, ExpectedVersion};
use atelier_events::EventBus;
use atelier_inventory::{
    InventoryError, InventoryEvent, InventoryItem, InventoryItemId, ItemCreated, ItemDetails,
    ItemDiscontinued, ItemPriceChanged, ItemReactivated, Money, ReservationReference,
    ReservationStatus, Sku, StockAdjusted, StockReleased, StockReservation, StockReservationId,
    StockReserved,
};

use crate::clock::Clock;
use crate::repository::{ItemRepository, RepositoryError, ReservationRepository};
use crate::transaction::TransactionBoundary;

/// Fallback reason recorded on manual stock corrections.
const DEFAULT_ADJUSTMENT_REASON: &str = "admin-adjustment";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic domain failure, surfaced as-is.
    #[error(transparent)]
    Domain(#[from] InventoryError),

    /// Optimistic concurrency failure (stale aggregate version). The caller
    /// owns retry policy; nothing is retried here.
    #[error("optimistic concurrency conflict: {0}")]
    Conflict(String),

    /// Underlying storage failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Publication failed after a successful commit (at-least-once; the
    /// state change stands and retrying the publish is safe).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Concurrency(msg) => ServiceError::Conflict(msg),
            RepositoryError::DuplicateSku(sku) => {
                ServiceError::Domain(InventoryError::SkuAlreadyExists(sku))
            }
            RepositoryError::DuplicateReservation(reference) => {
                ServiceError::Domain(InventoryError::ReservationAlreadyExists(reference))
            }
            RepositoryError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

/// Command: CreateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub sku: Sku,
    pub details: ItemDetails,
    pub price: Money,
    pub initial_on_hand: u32,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: UpdateItemDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemDetails {
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: ChangePrice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePrice {
    pub item_id: InventoryItemId,
    pub price: Money,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: AdjustOnHand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustOnHand {
    pub item_id: InventoryItemId,
    pub delta: i64,
    /// Recorded on the emitted event; blank falls back to
    /// `"admin-adjustment"`.
    pub reason: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: DiscontinueItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscontinueItem {
    pub item_id: InventoryItemId,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: ReactivateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateItem {
    pub item_id: InventoryItemId,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: ReserveStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStock {
    pub item_id: InventoryItemId,
    pub reference: ReservationReference,
    pub quantity: u32,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: ReleaseStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStock {
    pub item_id: InventoryItemId,
    pub reference: ReservationReference,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Command: ConsumeStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeStock {
    pub item_id: InventoryItemId,
    pub reference: ReservationReference,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Outcome of a release call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The active reservation was released and its stock returned.
    Released {
        reservation_id: StockReservationId,
        quantity: u32,
    },
    /// No active reservation for the reference (never reserved, or already
    /// released/consumed): nothing to do.
    NoActiveReservation,
}

/// Outcome of a consume call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The reservation was consumed and on-hand stock decremented.
    Consumed {
        reservation_id: StockReservationId,
        quantity: u32,
    },
    /// Retry of a consume that already succeeded.
    AlreadyConsumed,
}

/// Orchestration service for the inventory aggregates.
///
/// Generic over its collaborators so tests run against the in-memory
/// adapters and production can swap in real backends without touching the
/// protocol.
#[derive(Debug)]
pub struct InventoryService<I, R, B, C, T> {
    items: I,
    reservations: R,
    bus: B,
    clock: C,
    tx: T,
}

impl<I, R, B, C, T> InventoryService<I, R, B, C, T> {
    pub fn new(items: I, reservations: R, bus: B, clock: C, tx: T) -> Self {
        Self {
            items,
            reservations,
            bus,
            clock,
            tx,
        }
    }
}

impl<I, R, B, C, T> InventoryService<I, R, B, C, T>
where
    I: ItemRepository,
    R: ReservationRepository,
    B: EventBus<InventoryEvent>,
    C: Clock,
    T: TransactionBoundary,
{
    /// Create a new active item. Fails when the SKU is already taken.
    #[instrument(skip(self, cmd), fields(sku = %cmd.sku), err)]
    pub fn create_item(&self, cmd: CreateItem) -> Result<InventoryItemId, ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            if self.items.find_by_sku(&cmd.sku)?.is_some() {
                return Err(InventoryError::SkuAlreadyExists(cmd.sku.to_string()).into());
            }

            let item = InventoryItem::create_new(
                InventoryItemId::new(AggregateId::new()),
                cmd.sku.clone(),
                cmd.details.clone(),
                cmd.price.clone(),
                cmd.initial_on_hand,
                now,
            )?;
            self.items.save(&item, ExpectedVersion::Exact(0))?;

            self.publish(InventoryEvent::ItemCreated(ItemCreated {
                item_id: item.id_typed(),
                sku: item.sku().clone(),
                price: item.price().clone(),
                on_hand: cmd.initial_on_hand,
                occurred_at: now,
            }))?;

            Ok(item.id_typed())
        })
    }

    /// Replace the descriptive attributes of an active item.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id), err)]
    pub fn update_item_details(&self, cmd: UpdateItemDetails) -> Result<(), ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let item = self.load_item(cmd.item_id)?;
            let updated = item.update_details(cmd.details.clone(), now)?;
            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            Ok(())
        })
    }

    /// Re-price an active item. Setting the current price again is a no-op
    /// and publishes nothing.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id), err)]
    pub fn change_price(&self, cmd: ChangePrice) -> Result<(), ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let item = self.load_item(cmd.item_id)?;
            let updated = item.change_price(cmd.price.clone(), now)?;
            if updated.version() == item.version() {
                tracing::debug!(item_id = %cmd.item_id, "price unchanged, skipping write");
                return Ok(());
            }

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.publish(InventoryEvent::ItemPriceChanged(ItemPriceChanged {
                item_id: cmd.item_id,
                old_price: item.price().clone(),
                new_price: updated.price().clone(),
                occurred_at: now,
            }))?;
            Ok(())
        })
    }

    /// Correct the physical on-hand count of an active item.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id, delta = cmd.delta), err)]
    pub fn adjust_on_hand(&self, cmd: AdjustOnHand) -> Result<(), ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let item = self.load_item(cmd.item_id)?;
            let updated = item.adjust_on_hand(cmd.delta, now)?;
            if updated.version() == item.version() {
                return Ok(());
            }

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.publish(InventoryEvent::StockAdjusted(StockAdjusted {
                item_id: cmd.item_id,
                delta: cmd.delta,
                on_hand: updated.stock().on_hand(),
                reason: normalize_reason(cmd.reason.as_deref()),
                occurred_at: now,
            }))?;
            Ok(())
        })
    }

    /// Take an item off sale. Already-discontinued items are a no-op.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id), err)]
    pub fn discontinue_item(&self, cmd: DiscontinueItem) -> Result<(), ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let item = self.load_item(cmd.item_id)?;
            let updated = item.discontinue(now);
            if updated.version() == item.version() {
                return Ok(());
            }

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.publish(InventoryEvent::ItemDiscontinued(ItemDiscontinued {
                item_id: cmd.item_id,
                occurred_at: now,
            }))?;
            Ok(())
        })
    }

    /// Put a discontinued item back on sale. Already-active items are a
    /// no-op.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id), err)]
    pub fn reactivate_item(&self, cmd: ReactivateItem) -> Result<(), ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let item = self.load_item(cmd.item_id)?;
            let updated = item.reactivate(now);
            if updated.version() == item.version() {
                return Ok(());
            }

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.publish(InventoryEvent::ItemReactivated(ItemReactivated {
                item_id: cmd.item_id,
                occurred_at: now,
            }))?;
            Ok(())
        })
    }

    /// Hold stock for a pending order.
    ///
    /// The reference makes the call safe under at-least-once delivery: an
    /// identical retry returns the existing reservation id without touching
    /// stock, while a retry with a changed quantity is a caller error and
    /// fails instead of being silently resolved.
    #[instrument(
        skip(self, cmd),
        fields(item_id = %cmd.item_id, reference = %cmd.reference, quantity = cmd.quantity),
        err
    )]
    pub fn reserve_stock(&self, cmd: ReserveStock) -> Result<StockReservationId, ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            if let Some(existing) = self
                .reservations
                .find_active_by_item_and_reference(cmd.item_id, &cmd.reference)?
            {
                if existing.quantity() == cmd.quantity {
                    tracing::debug!(
                        reservation_id = %existing.id_typed(),
                        "identical retry, returning existing reservation"
                    );
                    return Ok(existing.id_typed());
                }
                return Err(
                    InventoryError::ReservationAlreadyExists(cmd.reference.to_string()).into(),
                );
            }

            // A consumed reservation is a finalized order; the same
            // reference must not quietly reserve again. A released one may:
            // cancellation followed by a fresh attempt is a legitimate flow.
            if self
                .reservations
                .find_by_item_and_reference_and_status(
                    cmd.item_id,
                    &cmd.reference,
                    ReservationStatus::Consumed,
                )?
                .is_some()
            {
                return Err(
                    InventoryError::ReservationAlreadyExists(cmd.reference.to_string()).into(),
                );
            }

            let item = self.load_item(cmd.item_id)?;
            let updated = item.reserve(cmd.quantity, now)?;
            let reservation = StockReservation::create_new(
                StockReservationId::new(AggregateId::new()),
                cmd.item_id,
                cmd.reference.clone(),
                cmd.quantity,
                now,
            )?;

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.reservations
                .save(&reservation, ExpectedVersion::Exact(0))?;

            self.publish(InventoryEvent::StockReserved(StockReserved {
                item_id: cmd.item_id,
                reservation_id: reservation.id_typed(),
                reference: cmd.reference.clone(),
                quantity: cmd.quantity,
                occurred_at: now,
            }))?;

            Ok(reservation.id_typed())
        })
    }

    /// Return reserved stock for a reference, e.g. on cancellation.
    ///
    /// Safe to call with unknown prior state: when no active reservation
    /// exists (never reserved, or already released/consumed) the call is a
    /// no-op success. Works on discontinued items so reservations cannot
    /// get stuck.
    #[instrument(
        skip(self, cmd),
        fields(item_id = %cmd.item_id, reference = %cmd.reference),
        err
    )]
    pub fn release_stock(&self, cmd: ReleaseStock) -> Result<ReleaseOutcome, ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            let Some(reservation) = self
                .reservations
                .find_active_by_item_and_reference(cmd.item_id, &cmd.reference)?
            else {
                tracing::debug!("no active reservation, nothing to release");
                return Ok(ReleaseOutcome::NoActiveReservation);
            };

            let item = self.load_item(cmd.item_id)?;
            let updated = item.release_reserved(reservation.quantity(), now)?;
            let released = reservation.release(now);

            self.items
                .save(&updated, ExpectedVersion::Exact(item.version()))?;
            self.reservations
                .save(&released, ExpectedVersion::Exact(reservation.version()))?;

            self.publish(InventoryEvent::StockReleased(StockReleased {
                item_id: cmd.item_id,
                reservation_id: reservation.id_typed(),
                reference: cmd.reference.clone(),
                quantity: reservation.quantity(),
                occurred_at: now,
            }))?;

            Ok(ReleaseOutcome::Released {
                reservation_id: reservation.id_typed(),
                quantity: reservation.quantity(),
            })
        })
    }

    /// Convert a reservation into an actual stock decrement once the order
    /// is finalized.
    ///
    /// A retry of a successful consume is a no-op; consuming a reference
    /// that was already released indicates an upstream workflow bug (e.g. a
    /// payment landing after the reservation expired) and is surfaced as
    /// `ReservationNotActive` rather than swallowed.
    #[instrument(
        skip(self, cmd),
        fields(item_id = %cmd.item_id, reference = %cmd.reference),
        err
    )]
    pub fn consume_stock(&self, cmd: ConsumeStock) -> Result<ConsumeOutcome, ServiceError> {
        let now = self.effective_time(cmd.occurred_at);
        self.tx.within(|| {
            if let Some(reservation) = self
                .reservations
                .find_active_by_item_and_reference(cmd.item_id, &cmd.reference)?
            {
                let item = self.load_item(cmd.item_id)?;
                let updated = item.consume_reserved(reservation.quantity(), now)?;
                let consumed = reservation.consume(now);

                self.items
                    .save(&updated, ExpectedVersion::Exact(item.version()))?;
                self.reservations
                    .save(&consumed, ExpectedVersion::Exact(reservation.version()))?;

                return Ok(ConsumeOutcome::Consumed {
                    reservation_id: reservation.id_typed(),
                    quantity: reservation.quantity(),
                });
            }

            if self
                .reservations
                .find_by_item_and_reference_and_status(
                    cmd.item_id,
                    &cmd.reference,
                    ReservationStatus::Consumed,
                )?
                .is_some()
            {
                tracing::debug!("consume already applied, nothing to do");
                return Ok(ConsumeOutcome::AlreadyConsumed);
            }

            if self
                .reservations
                .find_by_item_and_reference_and_status(
                    cmd.item_id,
                    &cmd.reference,
                    ReservationStatus::Released,
                )?
                .is_some()
            {
                return Err(InventoryError::ReservationNotActive.into());
            }

            Err(InventoryError::ReservationNotFound.into())
        })
    }

    fn load_item(&self, id: InventoryItemId) -> Result<InventoryItem, ServiceError> {
        self.items
            .find_by_id(id)?
            .ok_or(ServiceError::Domain(InventoryError::ItemNotFound))
    }

    fn publish(&self, event: InventoryEvent) -> Result<(), ServiceError> {
        self.bus
            .publish(event)
            .map_err(|e| ServiceError::Publish(format!("{e:?}")))
    }

    fn effective_time(&self, occurred_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
        occurred_at.unwrap_or_else(|| self.clock.now())
    }
}

fn normalize_reason(reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DEFAULT_ADJUSTMENT_REASON.to_string(),
    }
}
