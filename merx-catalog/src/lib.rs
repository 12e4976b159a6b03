pub mod inventory;
pub mod product;

#[cfg(test)]
pub(crate) mod testing;

pub use inventory::InventoryLedger;
pub use product::CatalogService;
