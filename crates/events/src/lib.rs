//! Domain event contracts and distribution.
//!
//! Events describe facts that already happened; this crate defines the
//! contract they satisfy and the pub/sub port used to hand them to
//! downstream consumers after a successful commit.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
