pub mod auth;
pub mod clinical;
pub mod inventory;
