//! Stock accounting value type.

use serde::{Deserialize, Serialize};

use atelier_core::ValueObject;

use crate::error::{InventoryError, InventoryResult};

/// On-hand/reserved accounting for one item.
///
/// Invariant: `reserved <= on_hand`. Quantities are unsigned, so negative
/// counters are unrepresentable; every transition is a pure function that
/// either returns the next `Stock` or fails without partial effects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    on_hand: u32,
    reserved: u32,
}

impl Stock {
    /// Fresh stock with nothing reserved.
    pub fn of(on_hand: u32) -> Self {
        Self {
            on_hand,
            reserved: 0,
        }
    }

    pub fn on_hand(&self) -> u32 {
        self.on_hand
    }

    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    /// On-hand minus reserved: what can still be newly reserved.
    pub fn available(&self) -> u32 {
        self.on_hand - self.reserved
    }

    /// Hold `quantity` units against pending demand.
    pub fn reserve(self, quantity: u32) -> InventoryResult<Self> {
        if quantity == 0 {
            return Err(InventoryError::invalid_stock(
                "reserve quantity must be positive",
            ));
        }
        if quantity > self.available() {
            return Err(InventoryError::InsufficientStock {
                requested: quantity,
                available: self.available(),
            });
        }
        Ok(Self {
            reserved: self.reserved + quantity,
            ..self
        })
    }

    /// Return `quantity` previously reserved units to the available pool.
    pub fn release(self, quantity: u32) -> InventoryResult<Self> {
        if quantity == 0 {
            return Err(InventoryError::invalid_stock(
                "release quantity must be positive",
            ));
        }
        if quantity > self.reserved {
            return Err(InventoryError::invalid_stock(format!(
                "cannot release {quantity} units, only {} reserved",
                self.reserved
            )));
        }
        Ok(Self {
            reserved: self.reserved - quantity,
            ..self
        })
    }

    /// Correct the physical on-hand count by `delta` units.
    ///
    /// The result may not drop below the reserved count: adjustments never
    /// take stock away from pending reservations.
    pub fn adjust_on_hand(self, delta: i64) -> InventoryResult<Self> {
        let next = i64::from(self.on_hand)
            .checked_add(delta)
            .ok_or_else(|| InventoryError::invalid_stock("on-hand adjustment overflows"))?;
        if next < 0 {
            return Err(InventoryError::invalid_stock(format!(
                "on-hand cannot go negative (on_hand {}, delta {delta})",
                self.on_hand
            )));
        }
        if next < i64::from(self.reserved) {
            return Err(InventoryError::invalid_stock(format!(
                "on-hand cannot drop below reserved (reserved {}, delta {delta})",
                self.reserved
            )));
        }
        if next > i64::from(u32::MAX) {
            return Err(InventoryError::invalid_stock("on-hand adjustment overflows"));
        }
        Ok(Self {
            on_hand: next as u32,
            ..self
        })
    }
}

impl ValueObject for Stock {}
