//! Application services orchestrating the inventory aggregates.

pub mod inventory;

pub use inventory::{
    AdjustOnHand, ChangePrice, ConsumeOutcome, ConsumeStock, CreateItem, DiscontinueItem,
    InventoryService, ReactivateItem, ReleaseOutcome, ReleaseStock, ReserveStock, ServiceError,
    UpdateItemDetails,
};
