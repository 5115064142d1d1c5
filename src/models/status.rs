// src/models/status.rs

use serde::Serialize;
use utoipa::ToSchema;

// Tokens de cor que o front-end entende (badges de status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Gray,
    Yellow,
    Blue,
    Green,
    Emerald,
    Red,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Gray => "gray",
            StatusColor::Yellow => "yellow",
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
            StatusColor::Emerald => "emerald",
            StatusColor::Red => "red",
        }
    }
}

/// Rótulo + cor de um valor de status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusDisplay {
    #[schema(example = "awaiting_payment")]
    pub value: &'static str,
    #[schema(example = "Awaiting Payment")]
    pub label: &'static str,
    pub color: StatusColor,
}

/// Enums de status fechados que sabem se mostrar.
/// As implementações são `match` exaustivos: variante nova sem rótulo não compila.
pub trait DisplayStatus: Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn color(&self) -> StatusColor;

    fn display(&self) -> StatusDisplay {
        StatusDisplay { value: self.as_str(), label: self.label(), color: self.color() }
    }

    fn catalog() -> Vec<StatusDisplay> {
        Self::ALL.iter().map(|s| s.display()).collect()
    }
}

/// Todas as tabelas de status, para o front-end montar os badges.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCatalog {
    pub approval: Vec<StatusDisplay>,
    pub expense: Vec<StatusDisplay>,
    pub report: Vec<StatusDisplay>,
    pub receipt_ocr: Vec<StatusDisplay>,
    pub subscription: Vec<StatusDisplay>,
}

impl StatusCatalog {
    pub fn build() -> Self {
        use crate::models::{
            approvals::ApprovalStatus, expenses::ExpenseStatus, receipts::OcrStatus,
            reports::ReportStatus, subscriptions::SubscriptionStatus,
        };

        Self {
            approval: ApprovalStatus::catalog(),
            expense: ExpenseStatus::catalog(),
            report: ReportStatus::catalog(),
            receipt_ocr: OcrStatus::catalog(),
            subscription: SubscriptionStatus::catalog(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_total(entries: Vec<StatusDisplay>) {
        assert!(!entries.is_empty());
        for entry in entries {
            assert!(!entry.value.is_empty());
            assert!(!entry.label.is_empty(), "{} has no label", entry.value);
            assert!(!entry.color.as_str().is_empty());
        }
    }

    /// `as_str` bate com o serde e cada valor aparece uma vez só.
    fn assert_matches_serde<T>()
    where
        T: DisplayStatus + Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let mut seen = std::collections::HashSet::new();
        for status in T::ALL {
            assert_eq!(serde_json::to_value(status).unwrap(), serde_json::json!(status.as_str()));
            let back: T = serde_json::from_value(serde_json::json!(status.as_str())).unwrap();
            assert_eq!(&back, status);
            assert!(seen.insert(status.as_str()), "{} listed twice", status.as_str());
        }
    }

    #[test]
    fn every_variant_is_listed_once() {
        use crate::models::{
            approvals::ApprovalStatus, expenses::ExpenseStatus, receipts::OcrStatus,
            reports::ReportStatus, subscriptions::SubscriptionStatus,
        };

        assert_matches_serde::<ApprovalStatus>();
        assert_matches_serde::<ExpenseStatus>();
        assert_matches_serde::<ReportStatus>();
        assert_matches_serde::<OcrStatus>();
        assert_matches_serde::<SubscriptionStatus>();

        let catalog = StatusCatalog::build();
        assert_eq!(catalog.approval.len(), 6);
        assert_eq!(catalog.expense.len(), 5);
        assert_eq!(catalog.report.len(), 5);
        assert_eq!(catalog.receipt_ocr.len(), 4);
        assert_eq!(catalog.subscription.len(), 4);
    }

    #[test]
    fn every_status_has_label_and_color() {
        let catalog = StatusCatalog::build();
        assert_total(catalog.approval);
        assert_total(catalog.expense);
        assert_total(catalog.report);
        assert_total(catalog.receipt_ocr);
        assert_total(catalog.subscription);
    }
}
