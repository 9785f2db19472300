use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{AggregateId, AggregateRoot};

use crate::error::{InventoryError, InventoryResult};
use crate::money::Money;
use crate::sku::Sku;
use crate::stock::Stock;

/// Inventory item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Item lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Discontinued,
}

/// Descriptive attributes of a catalog item.
///
/// Only `name` carries rules; the garment descriptors are pass-through
/// metadata maintained by the catalog team.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub fabric: Option<String>,
    pub color: Option<String>,
    pub gender: Option<String>,
    pub accessory_type: Option<String>,
}

impl ItemDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> InventoryResult<()> {
        if self.name.trim().is_empty() {
            return Err(InventoryError::invalid_item("name cannot be empty"));
        }
        Ok(())
    }
}

/// Aggregate root: InventoryItem.
///
/// Owns the stock accounting for one SKU. Mutators never change `self`;
/// they return the next version (version +1, `updated_at` bumped) or, for
/// the documented idempotent no-ops, an unchanged copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    sku: Sku,
    details: ItemDetails,
    price: Money,
    stock: Stock,
    status: ItemStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl InventoryItem {
    /// Create a new active item with nothing reserved.
    pub fn create_new(
        id: InventoryItemId,
        sku: Sku,
        details: ItemDetails,
        price: Money,
        initial_on_hand: u32,
        now: DateTime<Utc>,
    ) -> InventoryResult<Self> {
        details.validate()?;
        Ok(Self {
            id,
            sku,
            details,
            price,
            stock: Stock::of(initial_on_hand),
            status: ItemStatus::Active,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn details(&self) -> &ItemDetails {
        &self.details
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn stock(&self) -> Stock {
        self.stock
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace the descriptive attributes. Requires an active item.
    pub fn update_details(&self, details: ItemDetails, now: DateTime<Utc>) -> InventoryResult<Self> {
        self.ensure_active()?;
        details.validate()?;
        let mut next = self.next_version(now);
        next.details = details;
        Ok(next)
    }

    /// Re-price the item. Requires an active item.
    ///
    /// Setting the current price again is a no-op: the unchanged item is
    /// returned without a version or `updated_at` bump. Callers rely on
    /// this to make price updates safely retryable.
    pub fn change_price(&self, price: Money, now: DateTime<Utc>) -> InventoryResult<Self> {
        self.ensure_active()?;
        if price == self.price {
            return Ok(self.clone());
        }
        let mut next = self.next_version(now);
        next.price = price;
        Ok(next)
    }

    /// Correct the physical count. Requires an active item; a zero delta is
    /// a no-op.
    pub fn adjust_on_hand(&self, delta: i64, now: DateTime<Utc>) -> InventoryResult<Self> {
        self.ensure_active()?;
        let stock = self.stock.adjust_on_hand(delta)?;
        if stock == self.stock {
            return Ok(self.clone());
        }
        let mut next = self.next_version(now);
        next.stock = stock;
        Ok(next)
    }

    /// Hold `quantity` units for a pending order. Requires an active item.
    pub fn reserve(&self, quantity: u32, now: DateTime<Utc>) -> InventoryResult<Self> {
        self.ensure_active()?;
        let stock = self.stock.reserve(quantity)?;
        let mut next = self.next_version(now);
        next.stock = stock;
        Ok(next)
    }

    /// Return previously reserved units to the available pool.
    ///
    /// Deliberately has no status check: releasing a pending reservation
    /// must always succeed, even on a discontinued item, so reservations
    /// cannot get stuck.
    pub fn release_reserved(&self, quantity: u32, now: DateTime<Utc>) -> InventoryResult<Self> {
        let stock = self.stock.release(quantity)?;
        let mut next = self.next_version(now);
        next.stock = stock;
        Ok(next)
    }

    /// Turn a reservation into an actual stock decrement: the quantity
    /// leaves `reserved` and `on_hand` together, never independently.
    /// Requires an active item.
    pub fn consume_reserved(&self, quantity: u32, now: DateTime<Utc>) -> InventoryResult<Self> {
        self.ensure_active()?;
        let stock = self
            .stock
            .release(quantity)?
            .adjust_on_hand(-i64::from(quantity))?;
        let mut next = self.next_version(now);
        next.stock = stock;
        Ok(next)
    }

    /// Take the item off sale. No-op when already discontinued.
    pub fn discontinue(&self, now: DateTime<Utc>) -> Self {
        if self.status == ItemStatus::Discontinued {
            return self.clone();
        }
        let mut next = self.next_version(now);
        next.status = ItemStatus::Discontinued;
        next
    }

    /// Put the item back on sale. No-op when already active.
    pub fn reactivate(&self, now: DateTime<Utc>) -> Self {
        if self.status == ItemStatus::Active {
            return self.clone();
        }
        let mut next = self.next_version(now);
        next.status = ItemStatus::Active;
        next
    }

    fn ensure_active(&self) -> InventoryResult<()> {
        if self.status != ItemStatus::Active {
            return Err(InventoryError::ItemDiscontinued);
        }
        Ok(())
    }

    fn next_version(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = now;
        next
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

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
    use crate::money::CurrencyCode;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn test_item_id() -> InventoryItemId {
        InventoryItemId::new(AggregateId::new())
    }

    fn test_price(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), CurrencyCode::new("USD").unwrap()).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap()
    }

    fn test_item(initial_on_hand: u32) -> InventoryItem {
        InventoryItem::create_new(
            test_item_id(),
            Sku::new("TEE-BASIC-M").unwrap(),
            ItemDetails::named("Basic tee"),
            test_price(1999),
            initial_on_hand,
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn create_new_starts_active_with_nothing_reserved() {
        let item = test_item(25);
        assert_eq!(item.status(), ItemStatus::Active);
        assert_eq!(item.stock().on_hand(), 25);
        assert_eq!(item.stock().reserved(), 0);
        assert_eq!(item.created_at(), item.updated_at());
        assert_eq!(item.version(), 1);
    }

    #[test]
    fn create_new_rejects_blank_name() {
        let err = InventoryItem::create_new(
            test_item_id(),
            Sku::new("TEE-BASIC-M").unwrap(),
            ItemDetails::named("   "),
            test_price(1999),
            1,
            t0(),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidItem(_)));
    }

    #[test]
    fn mutators_return_new_versions_and_leave_self_untouched() {
        let item = test_item(10);
        let reserved = item.reserve(3, t1()).unwrap();

        assert_eq!(item.stock().reserved(), 0);
        assert_eq!(item.version(), 1);

        assert_eq!(reserved.stock().reserved(), 3);
        assert_eq!(reserved.version(), 2);
        assert_eq!(reserved.updated_at(), t1());
        assert!(reserved.updated_at() >= reserved.created_at());
    }

    #[test]
    fn change_price_to_same_value_is_a_no_op() {
        let item = test_item(10);
        let unchanged = item.change_price(test_price(1999), t1()).unwrap();
        assert_eq!(unchanged, item);
        assert_eq!(unchanged.updated_at(), t0());

        let repriced = item.change_price(test_price(2499), t1()).unwrap();
        assert_eq!(repriced.price(), &test_price(2499));
        assert_eq!(repriced.version(), 2);
    }

    #[test]
    fn adjust_on_hand_zero_delta_is_a_no_op() {
        let item = test_item(10);
        let unchanged = item.adjust_on_hand(0, t1()).unwrap();
        assert_eq!(unchanged, item);

        let adjusted = item.adjust_on_hand(-4, t1()).unwrap();
        assert_eq!(adjusted.stock().on_hand(), 6);
        assert_eq!(adjusted.version(), 2);
    }

    #[test]
    fn consume_decrements_both_counters_together() {
        let item = test_item(10).reserve(4, t1()).unwrap();
        let consumed = item.consume_reserved(4, t1()).unwrap();

        assert_eq!(consumed.stock().on_hand(), 6);
        assert_eq!(consumed.stock().reserved(), 0);
        assert_eq!(consumed.stock().available(), 6);
    }

    #[test]
    fn consume_more_than_reserved_fails() {
        let item = test_item(10).reserve(2, t1()).unwrap();
        assert!(item.consume_reserved(3, t1()).is_err());
    }

    #[test]
    fn discontinued_item_blocks_everything_except_release() {
        let item = test_item(10).reserve(4, t1()).unwrap();
        let discontinued = item.discontinue(t1());
        assert_eq!(discontinued.status(), ItemStatus::Discontinued);

        assert!(matches!(
            discontinued.change_price(test_price(999), t1()),
            Err(InventoryError::ItemDiscontinued)
        ));
        assert!(matches!(
            discontinued.update_details(ItemDetails::named("x"), t1()),
            Err(InventoryError::ItemDiscontinued)
        ));
        assert!(matches!(
            discontinued.reserve(1, t1()),
            Err(InventoryError::ItemDiscontinued)
        ));
        assert!(matches!(
            discontinued.consume_reserved(4, t1()),
            Err(InventoryError::ItemDiscontinued)
        ));
        assert!(matches!(
            discontinued.adjust_on_hand(1, t1()),
            Err(InventoryError::ItemDiscontinued)
        ));

        // Pending reservations can still be released.
        let released = discontinued.release_reserved(4, t1()).unwrap();
        assert_eq!(released.stock().reserved(), 0);
    }

    #[test]
    fn discontinue_and_reactivate_are_idempotent_toggles() {
        let item = test_item(10);
        let once = item.discontinue(t1());
        let twice = once.discontinue(t1());
        assert_eq!(once, twice);

        let back = twice.reactivate(t1());
        assert_eq!(back.status(), ItemStatus::Active);
        assert_eq!(back.reactivate(t1()), back);
    }
}
