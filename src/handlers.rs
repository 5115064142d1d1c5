// src/handlers.rs

pub mod approvals;
pub mod catalog;
pub mod delegations;
pub mod expenses;
pub mod finance;
pub mod organizations;
pub mod policies;
pub mod receipts;
pub mod reports;
pub mod subscriptions;
pub mod vendors;
