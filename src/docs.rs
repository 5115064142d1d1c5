// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Expenses ---
        handlers::expenses::list_expenses,
        handlers::expenses::get_expense,
        handlers::expenses::create_expense,
        handlers::expenses::update_expense,
        handlers::expenses::delete_expense,
        handlers::expenses::submit_expense,
        handlers::expenses::split_expense,
        handlers::expenses::list_splits,
        handlers::expenses::detect_duplicates,
        handlers::expenses::list_categories,
        handlers::expenses::create_category,

        // --- Reports ---
        handlers::reports::list_reports,
        handlers::reports::get_report,
        handlers::reports::create_report,
        handlers::reports::update_report,
        handlers::reports::delete_report,
        handlers::reports::add_expense,
        handlers::reports::remove_expense,
        handlers::reports::submit_report,
        handlers::reports::export_report_pdf,

        // --- Approvals ---
        handlers::approvals::list_pending,
        handlers::approvals::list_history,
        handlers::approvals::get_stats,
        handlers::approvals::get_approval,
        handlers::approvals::approve,
        handlers::approvals::reject,
        handlers::approvals::list_workflows,
        handlers::approvals::get_workflow,
        handlers::approvals::create_workflow,
        handlers::approvals::deactivate_workflow,

        // --- Policies ---
        handlers::policies::list_policies,
        handlers::policies::create_policy,
        handlers::policies::update_policy,
        handlers::policies::delete_policy,
        handlers::policies::evaluate_expense,
        handlers::policies::list_violations,

        // --- Finance ---
        handlers::finance::list_currencies,
        handlers::finance::get_exchange_rate,
        handlers::finance::convert_amount,
        handlers::finance::list_tax_rates,
        handlers::finance::create_tax_rate,
        handlers::finance::calculate_tax,
        handlers::finance::get_per_diem_rate,
        handlers::finance::compute_allowance,

        // --- Vendors ---
        handlers::vendors::list_vendors,
        handlers::vendors::get_vendor,
        handlers::vendors::create_vendor,
        handlers::vendors::update_vendor,
        handlers::vendors::deactivate_vendor,

        // --- Delegations ---
        handlers::delegations::list_granted,
        handlers::delegations::list_received,
        handlers::delegations::create_delegation,
        handlers::delegations::revoke_delegation,

        // --- Receipts ---
        handlers::receipts::register_receipt,
        handlers::receipts::list_receipts,
        handlers::receipts::attach_receipt,
        handlers::receipts::request_ocr,

        // --- Organizations ---
        handlers::organizations::list_my_organizations,
        handlers::organizations::list_my_memberships,
        handlers::organizations::create_organization,
        handlers::organizations::get_current_organization,
        handlers::organizations::list_members,
        handlers::organizations::add_member,
        handlers::organizations::remove_member,

        // --- Subscriptions ---
        handlers::subscriptions::list_plans,
        handlers::subscriptions::get_subscription,
        handlers::subscriptions::change_plan,
        handlers::subscriptions::cancel_subscription,
        handlers::subscriptions::check_limit,

        // --- Catalog ---
        handlers::catalog::get_status_catalog,
    ),
    components(
        schemas(
            // --- Status ---
            models::status::StatusColor,
            models::status::StatusDisplay,
            models::status::StatusCatalog,

            // --- Expenses ---
            models::expenses::ExpenseStatus,
            models::expenses::Expense,
            models::expenses::ExpenseCategory,
            models::expenses::ExpenseSplit,
            models::expenses::SplitItem,
            models::expenses::DuplicateCandidate,
            services::expense_service::NewExpense,
            services::expense_service::ExpenseChanges,
            services::expense_service::NewCategory,
            handlers::expenses::SplitExpensePayload,

            // --- Reports ---
            models::reports::ReportStatus,
            models::reports::ExpenseReport,
            models::reports::ReportWithExpenses,
            services::report_service::NewReport,
            services::report_service::ReportChanges,

            // --- Approvals ---
            models::approvals::ApprovalStatus,
            models::approvals::ApprovalRecord,
            models::approvals::WorkflowSummary,
            models::approvals::ExpenseSummary,
            models::approvals::ReportSummary,
            models::approvals::ApprovalWithDetails,
            models::approvals::ApprovalDecision,
            models::approvals::ApprovalStats,
            models::approvals::ApproverType,
            models::approvals::ApprovalWorkflow,
            models::approvals::ApprovalWorkflowStep,
            models::approvals::WorkflowWithSteps,
            models::approvals::NewWorkflowStep,
            models::approvals::NewWorkflow,
            handlers::approvals::ApprovePayload,
            handlers::approvals::RejectPayload,

            // --- Policies ---
            models::policies::PolicyRuleType,
            models::policies::PolicySeverity,
            models::policies::ExpensePolicy,
            models::policies::PolicyViolation,
            models::policies::PolicyEvaluation,
            services::policy_service::PolicyInput,

            // --- Finance ---
            models::currency::Currency,
            models::currency::ExchangeRate,
            models::currency::Conversion,
            models::tax::TaxRate,
            models::tax::TaxCalculation,
            models::per_diem::PerDiemRate,
            models::per_diem::MealFlags,
            models::per_diem::DayAllowance,
            models::per_diem::TripAllowance,
            services::tax_service::NewTaxRate,
            handlers::finance::ConvertPayload,
            handlers::finance::CalculateTaxPayload,
            handlers::finance::TripAllowancePayload,

            // --- Vendors / Delegations / Receipts ---
            models::vendors::Vendor,
            services::vendor_service::VendorInput,
            models::delegation::Delegation,
            services::delegation_service::NewDelegation,
            models::receipts::OcrStatus,
            models::receipts::Receipt,
            services::receipt_service::NewReceipt,

            // --- Organizations ---
            models::organizations::Organization,
            models::organizations::MemberRole,
            models::organizations::OrganizationMember,
            models::organizations::Membership,
            services::organization_service::NewOrganization,
            services::organization_service::NewMember,

            // --- Subscriptions ---
            models::subscriptions::SubscriptionPlan,
            models::subscriptions::SubscriptionStatus,
            models::subscriptions::Subscription,
            models::subscriptions::PlanLimit,
            models::subscriptions::PlanLimitCheck,
            handlers::subscriptions::ChangePlanPayload,
        )
    ),
    tags(
        (name = "Expenses", description = "Despesas, rateios e categorias"),
        (name = "Reports", description = "Relatórios de despesas e exportação em PDF"),
        (name = "Approvals", description = "Fila de aprovação, decisões e fluxos"),
        (name = "Policies", description = "Políticas de despesa e violações"),
        (name = "Finance", description = "Moedas, impostos e diárias"),
        (name = "Vendors", description = "Fornecedores"),
        (name = "Delegations", description = "Delegação de envio/aprovação"),
        (name = "Receipts", description = "Comprovantes e OCR"),
        (name = "Organizations", description = "Organizações e membros"),
        (name = "Subscriptions", description = "Planos e assinatura"),
        (name = "Catalog", description = "Rótulos e cores de status")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/expenses",
            "/api/reports/{id}/pdf",
            "/api/approvals/pending",
            "/api/per-diem/allowance",
            "/api/organizations/current/members/{user_id}",
            "/api/subscription/limits/{limit}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }

        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }
}
