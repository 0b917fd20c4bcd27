pub mod consultations;
pub mod health;
pub mod inventory;
pub mod prescriptions;
pub mod vaccinations;
