pub mod approvals;
pub mod currency;
pub mod delegation;
pub mod expenses;
pub mod organizations;
pub mod per_diem;
pub mod policies;
pub mod receipts;
pub mod reports;
pub mod status;
pub mod subscriptions;
pub mod tax;
pub mod vendors;
