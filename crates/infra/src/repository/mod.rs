//! Persistence ports for the inventory aggregates.
//!
//! This module defines infrastructure-facing abstractions for loading and
//! saving items and reservations without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryItemRepository, InMemoryReservationRepository};
pub use r#trait::{ItemRepository, RepositoryError, ReservationRepository};
