pub mod auth;
pub mod dispensing_service;
pub mod inventory_service;
pub mod lot_ledger;
pub mod lot_selector;
pub mod movement_recorder;
