use std::sync::Arc;

use thiserror::Error;

use atelier_core::ExpectedVersion;
use atelier_inventory::{
    InventoryItem, InventoryItemId, ReservationReference, ReservationStatus, Sku,
    StockReservation,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency check failed (stale aggregate version).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Unique index on SKU rejected the write.
    #[error("sku already indexed: {0}")]
    DuplicateSku(String),

    /// Unique index on (item, reference, active) rejected the write.
    #[error("active reservation already indexed for reference '{0}'")]
    DuplicateReservation(String),

    /// Backend failure (lock poisoning, IO, ...).
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Lookup/save port for `InventoryItem`.
///
/// `save` is an upsert guarded by two invariants the backend must enforce
/// transactionally with the write:
///
/// - **Optimistic concurrency**: `expected` is the version the caller read
///   before mutating; a mismatch with the stored version fails with
///   `Concurrency`. This is what prevents two concurrent reservations from
///   both passing the availability check and overselling.
/// - **SKU uniqueness**: the SKU is a natural secondary key; indexing a
///   taken SKU under a different id fails with `DuplicateSku`.
pub trait ItemRepository: Send + Sync {
    fn find_by_id(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, RepositoryError>;

    fn find_by_sku(&self, sku: &Sku) -> Result<Option<InventoryItem>, RepositoryError>;

    fn save(&self, item: &InventoryItem, expected: ExpectedVersion)
    -> Result<(), RepositoryError>;
}

/// Lookup/save port for `StockReservation`.
///
/// The `(item_id, reference)` pair is the idempotency key of the
/// reservation protocol; lookups must be transactionally consistent with
/// writes for the key to deduplicate reliably.
pub trait ReservationRepository: Send + Sync {
    fn find_active_by_item_and_reference(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
    ) -> Result<Option<StockReservation>, RepositoryError>;

    fn find_by_item_and_reference_and_status(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
        status: ReservationStatus,
    ) -> Result<Option<StockReservation>, RepositoryError>;

    fn save(
        &self,
        reservation: &StockReservation,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError>;
}

impl<R> ItemRepository for Arc<R>
where
    R: ItemRepository + ?Sized,
{
    fn find_by_id(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, RepositoryError> {
        (**self).find_by_id(id)
    }

    fn find_by_sku(&self, sku: &Sku) -> Result<Option<InventoryItem>, RepositoryError> {
        (**self).find_by_sku(sku)
    }

    fn save(
        &self,
        item: &InventoryItem,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        (**self).save(item, expected)
    }
}

impl<R> ReservationRepository for Arc<R>
where
    R: ReservationRepository + ?Sized,
{
    fn find_active_by_item_and_reference(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
    ) -> Result<Option<StockReservation>, RepositoryError> {
        (**self).find_active_by_item_and_reference(item_id, reference)
    }

    fn find_by_item_and_reference_and_status(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
        status: ReservationStatus,
    ) -> Result<Option<StockReservation>, RepositoryError> {
        (**self).find_by_item_and_reference_and_status(item_id, reference, status)
    }

    fn save(
        &self,
        reservation: &StockReservation,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        (**self).save(reservation, expected)
    }
}
