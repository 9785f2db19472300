use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{AggregateId, AggregateRoot, ValueObject};

use crate::error::{InventoryError, InventoryResult};
use crate::item::InventoryItemId;

/// Stock reservation identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockReservationId(pub AggregateId);

impl StockReservationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockReservationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

const REFERENCE_MAX_LEN: usize = 80;

/// Externally supplied idempotency key scoping one reservation per item
/// (typically an order id). Trimmed, non-blank, at most 80 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReservationReference(String);

impl ReservationReference {
    pub fn new(raw: &str) -> InventoryResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InventoryError::invalid_reservation(
                "reference cannot be blank",
            ));
        }
        if trimmed.len() > REFERENCE_MAX_LEN {
            return Err(InventoryError::invalid_reservation(format!(
                "reference must be at most {REFERENCE_MAX_LEN} characters, got {}",
                trimmed.len()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ReservationReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReservationReference {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ReservationReference> for String {
    fn from(value: ReservationReference) -> Self {
        value.0
    }
}

impl ValueObject for ReservationReference {}

/// Reservation lifecycle status.
///
/// `Active` is the only non-terminal state; a reservation transitions
/// exactly once to `Released` or `Consumed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Released,
    Consumed,
}

/// Aggregate root: StockReservation.
///
/// One hold of `quantity` units of one item, keyed by an external
/// reference. Independent of `InventoryItem`: the two aggregates are
/// related by id lookup only and coordinated by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    id: StockReservationId,
    item_id: InventoryItemId,
    reference: ReservationReference,
    quantity: u32,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
    consumed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl StockReservation {
    /// The only way to enter the `Active` state.
    pub fn create_new(
        id: StockReservationId,
        item_id: InventoryItemId,
        reference: ReservationReference,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> InventoryResult<Self> {
        if quantity == 0 {
            return Err(InventoryError::invalid_reservation(
                "quantity must be positive",
            ));
        }
        Ok(Self {
            id,
            item_id,
            reference,
            quantity,
            status: ReservationStatus::Active,
            created_at: now,
            released_at: None,
            consumed_at: None,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> StockReservationId {
        self.id
    }

    pub fn item_id(&self) -> InventoryItemId {
        self.item_id
    }

    pub fn reference(&self) -> &ReservationReference {
        &self.reference
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        self.released_at
    }

    pub fn consumed_at(&self) -> Option<DateTime<Utc>> {
        self.consumed_at
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Transition to `Released`. No-op on an already-terminal reservation;
    /// the orchestration layer's idempotency rests on this.
    pub fn release(&self, now: DateTime<Utc>) -> Self {
        if self.is_terminal() {
            return self.clone();
        }
        let mut next = self.clone();
        next.version += 1;
        next.status = ReservationStatus::Released;
        next.released_at = Some(now);
        next
    }

    /// Transition to `Consumed`. No-op on an already-terminal reservation.
    pub fn consume(&self, now: DateTime<Utc>) -> Self {
        if self.is_terminal() {
            return self.clone();
        }
        let mut next = self.clone();
        next.version += 1;
        next.status = ReservationStatus::Consumed;
        next.consumed_at = Some(now);
        next
    }
}

impl AggregateRoot for StockReservation {
    type Id = StockReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_reservation() -> StockReservation {
        StockReservation::create_new(
            StockReservationId::new(AggregateId::new()),
            InventoryItemId::new(AggregateId::new()),
            ReservationReference::new("order-1001").unwrap(),
            3,
            t0(),
        )
        .unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn create_new_starts_active_without_terminal_timestamps() {
        let reservation = test_reservation();
        assert!(reservation.is_active());
        assert_eq!(reservation.released_at(), None);
        assert_eq!(reservation.consumed_at(), None);
        assert_eq!(reservation.version(), 1);
    }

    #[test]
    fn create_new_rejects_zero_quantity() {
        let err = StockReservation::create_new(
            StockReservationId::new(AggregateId::new()),
            InventoryItemId::new(AggregateId::new()),
            ReservationReference::new("order-1001").unwrap(),
            0,
            t0(),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidReservation(_)));
    }

    #[test]
    fn release_stamps_released_at_exactly_once() {
        let released = test_reservation().release(t1());
        assert_eq!(released.status(), ReservationStatus::Released);
        assert_eq!(released.released_at(), Some(t1()));
        assert_eq!(released.consumed_at(), None);
        assert_eq!(released.version(), 2);

        // Terminal: further transitions are no-ops.
        let again = released.release(t0());
        assert_eq!(again, released);
        let consumed = released.consume(t0());
        assert_eq!(consumed, released);
    }

    #[test]
    fn consume_stamps_consumed_at_exactly_once() {
        let consumed = test_reservation().consume(t1());
        assert_eq!(consumed.status(), ReservationStatus::Consumed);
        assert_eq!(consumed.consumed_at(), Some(t1()));
        assert_eq!(consumed.released_at(), None);

        let again = consumed.consume(t0());
        assert_eq!(again, consumed);
        assert_eq!(consumed.release(t0()), consumed);
    }

    #[test]
    fn reference_is_trimmed_and_bounded() {
        assert_eq!(
            ReservationReference::new("  order-7  ").unwrap().as_str(),
            "order-7"
        );
        assert!(ReservationReference::new("   ").is_err());
        assert!(ReservationReference::new(&"x".repeat(81)).is_err());
        assert!(ReservationReference::new(&"x".repeat(80)).is_ok());
    }
}
