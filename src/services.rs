// src/services.rs

pub mod approval_join;
pub mod approval_service;
pub mod currency_service;
pub mod delegation_service;
pub mod document_service;
pub mod expense_service;
pub mod organization_service;
pub mod per_diem_service;
pub mod policy_service;
pub mod receipt_service;
pub mod report_service;
pub mod subscription_service;
pub mod tax_service;
pub mod vendor_service;
