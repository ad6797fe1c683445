pub mod banking;
pub mod health;
pub mod insights;
pub mod transactions;
