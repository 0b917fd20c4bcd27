pub mod inventory_repo;
pub use inventory_repo::{InventoryRepository, MovementInsert};
pub mod clinical_repo;
pub use clinical_repo::ClinicalRepository;
