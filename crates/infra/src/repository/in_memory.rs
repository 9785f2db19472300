use std::collections::HashMap;
use std::sync::RwLock;

use atelier_core::{AggregateRoot, ExpectedVersion};
use atelier_inventory::{
    InventoryItem, InventoryItemId, ReservationReference, ReservationStatus, Sku,
    StockReservation, StockReservationId,
};

use super::r#trait::{ItemRepository, RepositoryError, ReservationRepository};

/// In-memory item store.
///
/// Intended for tests/dev. Not optimized for performance; `find_by_sku`
/// scans instead of keeping a secondary index.
#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: RwLock<HashMap<InventoryItemId, InventoryItem>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemRepository for InMemoryItemRepository {
    fn find_by_id(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, RepositoryError> {
        let items = self
            .items
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(items.get(&id).cloned())
    }

    fn find_by_sku(&self, sku: &Sku) -> Result<Option<InventoryItem>, RepositoryError> {
        let items = self
            .items
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(items.values().find(|item| item.sku() == sku).cloned())
    }

    fn save(
        &self,
        item: &InventoryItem,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        let current = items.get(&item.id_typed()).map(|i| i.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        // Unique index on SKU across all other items.
        let taken = items
            .values()
            .any(|other| other.id_typed() != item.id_typed() && other.sku() == item.sku());
        if taken {
            return Err(RepositoryError::DuplicateSku(item.sku().to_string()));
        }

        items.insert(item.id_typed(), item.clone());
        Ok(())
    }
}

/// In-memory reservation store.
///
/// Intended for tests/dev. Enforces the unique index on
/// `(item_id, reference, active)` that the idempotency protocol rests on.
#[derive(Debug, Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<HashMap<StockReservationId, StockReservation>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of quantities currently held by active reservations of one item.
    ///
    /// Test helper for the accounting invariant: this must always equal the
    /// item's reserved counter at a committed point.
    pub fn active_quantity_for(&self, item_id: InventoryItemId) -> u32 {
        let reservations = self
            .reservations
            .read()
            .unwrap_or_else(|e| e.into_inner());
        reservations
            .values()
            .filter(|r| r.item_id() == item_id && r.is_active())
            .map(StockReservation::quantity)
            .sum()
    }
}

impl ReservationRepository for InMemoryReservationRepository {
    fn find_active_by_item_and_reference(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
    ) -> Result<Option<StockReservation>, RepositoryError> {
        self.find_by_item_and_reference_and_status(item_id, reference, ReservationStatus::Active)
    }

    fn find_by_item_and_reference_and_status(
        &self,
        item_id: InventoryItemId,
        reference: &ReservationReference,
        status: ReservationStatus,
    ) -> Result<Option<StockReservation>, RepositoryError> {
        let reservations = self
            .reservations
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(reservations
            .values()
            .find(|r| r.item_id() == item_id && r.reference() == reference && r.status() == status)
            .cloned())
    }

    fn save(
        &self,
        reservation: &StockReservation,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        let mut reservations = self
            .reservations
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        let current = reservations
            .get(&reservation.id_typed())
            .map(|r| r.version())
            .unwrap_or(0);
        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        // At most one active reservation per (item, reference).
        if reservation.is_active() {
            let taken = reservations.values().any(|other| {
                other.id_typed() != reservation.id_typed()
                    && other.item_id() == reservation.item_id()
                    && other.reference() == reservation.reference()
                    && other.is_active()
            });
            if taken {
                return Err(RepositoryError::DuplicateReservation(
                    reservation.reference().to_string(),
                ));
            }
        }

        reservations.insert(reservation.id_typed(), reservation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::AggregateId;
    use atelier_inventory::{CurrencyCode, ItemDetails, Money};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn test_item(sku: &str) -> InventoryItem {
        InventoryItem::create_new(
            InventoryItemId::new(AggregateId::new()),
            Sku::new(sku).unwrap(),
            ItemDetails::named("Linen shirt"),
            Money::new(Decimal::new(4900, 2), CurrencyCode::new("EUR").unwrap()).unwrap(),
            12,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn test_reservation(item_id: InventoryItemId, reference: &str) -> StockReservation {
        StockReservation::create_new(
            StockReservationId::new(AggregateId::new()),
            item_id,
            ReservationReference::new(reference).unwrap(),
            2,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn item_save_checks_expected_version() {
        let repo = InMemoryItemRepository::new();
        let item = test_item("SHIRT-LINEN-M");

        repo.save(&item, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(repo.find_by_id(item.id_typed()).unwrap(), Some(item.clone()));

        // Re-saving version 1 while expecting 0 is a stale write.
        let err = repo.save(&item, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::Concurrency(_)));

        repo.save(&item, ExpectedVersion::Any).unwrap();
    }

    #[test]
    fn item_save_rejects_taken_sku() {
        let repo = InMemoryItemRepository::new();
        repo.save(&test_item("SHIRT-LINEN-M"), ExpectedVersion::Exact(0))
            .unwrap();

        let err = repo
            .save(&test_item("SHIRT-LINEN-M"), ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateSku(_)));
    }

    #[test]
    fn find_by_sku_matches_the_natural_key() {
        let repo = InMemoryItemRepository::new();
        let item = test_item("SHIRT-LINEN-M");
        repo.save(&item, ExpectedVersion::Exact(0)).unwrap();

        let found = repo.find_by_sku(&Sku::new("shirt-linen-m").unwrap()).unwrap();
        assert_eq!(found, Some(item));
        assert_eq!(repo.find_by_sku(&Sku::new("OTHER").unwrap()).unwrap(), None);
    }

    #[test]
    fn reservation_save_rejects_second_active_for_same_key() {
        let repo = InMemoryReservationRepository::new();
        let item_id = InventoryItemId::new(AggregateId::new());

        repo.save(&test_reservation(item_id, "order-1"), ExpectedVersion::Exact(0))
            .unwrap();

        let err = repo
            .save(&test_reservation(item_id, "order-1"), ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateReservation(_)));

        // A different reference is fine, as is the same reference once the
        // first reservation is no longer active.
        repo.save(&test_reservation(item_id, "order-2"), ExpectedVersion::Exact(0))
            .unwrap();
    }

    #[test]
    fn reservation_status_lookup_distinguishes_states() {
        let repo = InMemoryReservationRepository::new();
        let item_id = InventoryItemId::new(AggregateId::new());
        let reference = ReservationReference::new("order-9").unwrap();

        let active = test_reservation(item_id, "order-9");
        repo.save(&active, ExpectedVersion::Exact(0)).unwrap();

        let released = active.release(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        repo.save(&released, ExpectedVersion::Exact(1)).unwrap();

        assert_eq!(
            repo.find_active_by_item_and_reference(item_id, &reference)
                .unwrap(),
            None
        );
        assert_eq!(
            repo.find_by_item_and_reference_and_status(
                item_id,
                &reference,
                ReservationStatus::Released
            )
            .unwrap(),
            Some(released)
        );
    }
}
