//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod docs;
mod gateway;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::{auth::session_middleware, organization::organization_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    let app = app(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(app_state: AppState) -> Router {
    let expense_routes = Router::new()
        .route("/", get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense))
        .route(
            "/{id}",
            get(handlers::expenses::get_expense)
                .patch(handlers::expenses::update_expense)
                .delete(handlers::expenses::delete_expense),
        )
        .route("/{id}/submit", post(handlers::expenses::submit_expense))
        .route(
            "/{id}/splits",
            get(handlers::expenses::list_splits).put(handlers::expenses::split_expense),
        )
        .route("/{id}/duplicates", get(handlers::expenses::detect_duplicates))
        .route("/{id}/policy-check", post(handlers::policies::evaluate_expense))
        .route("/{id}/violations", get(handlers::policies::list_violations));

    let report_routes = Router::new()
        .route("/", get(handlers::reports::list_reports).post(handlers::reports::create_report))
        .route(
            "/{id}",
            get(handlers::reports::get_report)
                .patch(handlers::reports::update_report)
                .delete(handlers::reports::delete_report),
        )
        .route(
            "/{id}/expenses/{expense_id}",
            post(handlers::reports::add_expense).delete(handlers::reports::remove_expense),
        )
        .route("/{id}/submit", post(handlers::reports::submit_report))
        .route("/{id}/pdf", get(handlers::reports::export_report_pdf));

    let approval_routes = Router::new()
        .route("/", get(handlers::approvals::list_history))
        .route("/pending", get(handlers::approvals::list_pending))
        .route("/stats", get(handlers::approvals::get_stats))
        .route("/{id}", get(handlers::approvals::get_approval))
        .route("/{id}/approve", post(handlers::approvals::approve))
        .route("/{id}/reject", post(handlers::approvals::reject));

    let workflow_routes = Router::new()
        .route(
            "/",
            get(handlers::approvals::list_workflows).post(handlers::approvals::create_workflow),
        )
        .route(
            "/{id}",
            get(handlers::approvals::get_workflow).delete(handlers::approvals::deactivate_workflow),
        );

    let policy_routes = Router::new()
        .route("/", get(handlers::policies::list_policies).post(handlers::policies::create_policy))
        .route(
            "/{id}",
            put(handlers::policies::update_policy).delete(handlers::policies::delete_policy),
        );

    let vendor_routes = Router::new()
        .route("/", get(handlers::vendors::list_vendors).post(handlers::vendors::create_vendor))
        .route(
            "/{id}",
            get(handlers::vendors::get_vendor)
                .put(handlers::vendors::update_vendor)
                .delete(handlers::vendors::deactivate_vendor),
        );

    let delegation_routes = Router::new()
        .route("/", post(handlers::delegations::create_delegation))
        .route("/granted", get(handlers::delegations::list_granted))
        .route("/received", get(handlers::delegations::list_received))
        .route("/{id}", delete(handlers::delegations::revoke_delegation));

    let receipt_routes = Router::new()
        .route(
            "/",
            get(handlers::receipts::list_receipts).post(handlers::receipts::register_receipt),
        )
        .route("/{id}/attach/{expense_id}", post(handlers::receipts::attach_receipt))
        .route("/{id}/ocr", post(handlers::receipts::request_ocr));

    let organization_routes = Router::new()
        .route(
            "/",
            get(handlers::organizations::list_my_organizations)
                .post(handlers::organizations::create_organization),
        )
        .route("/memberships", get(handlers::organizations::list_my_memberships))
        .route("/current", get(handlers::organizations::get_current_organization))
        .route(
            "/current/members",
            get(handlers::organizations::list_members).post(handlers::organizations::add_member),
        )
        .route("/current/members/{user_id}", delete(handlers::organizations::remove_member));

    let subscription_routes = Router::new()
        .route("/", get(handlers::subscriptions::get_subscription))
        .route("/plan", put(handlers::subscriptions::change_plan))
        .route("/cancel", post(handlers::subscriptions::cancel_subscription))
        .route("/limits/{limit}", get(handlers::subscriptions::check_limit));

    // Tudo abaixo passa pela sessão e, quando vier o header, pelo guard da organização
    let api_routes = Router::new()
        .nest("/expenses", expense_routes)
        .route(
            "/expense-categories",
            get(handlers::expenses::list_categories).post(handlers::expenses::create_category),
        )
        .nest("/reports", report_routes)
        .nest("/approvals", approval_routes)
        .nest("/approval-workflows", workflow_routes)
        .nest("/policies", policy_routes)
        .route("/currencies", get(handlers::finance::list_currencies))
        .route("/currencies/convert", post(handlers::finance::convert_amount))
        .route("/exchange-rates", get(handlers::finance::get_exchange_rate))
        .route(
            "/tax-rates",
            get(handlers::finance::list_tax_rates).post(handlers::finance::create_tax_rate),
        )
        .route("/tax/calculate", post(handlers::finance::calculate_tax))
        .route("/per-diem/rate", get(handlers::finance::get_per_diem_rate))
        .route("/per-diem/allowance", post(handlers::finance::compute_allowance))
        .nest("/vendors", vendor_routes)
        .nest("/delegations", delegation_routes)
        .nest("/receipts", receipt_routes)
        .nest("/organizations", organization_routes)
        .route("/plans", get(handlers::subscriptions::list_plans))
        .nest("/subscription", subscription_routes)
        // A última camada roda primeiro: sessão, depois organização
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), organization_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), session_middleware));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/statuses", get(handlers::catalog::get_status_catalog))
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::memory::MemoryGateway,
        middleware::{auth::issue_test_token, organization::ORGANIZATION_ID_HEADER},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "segredo-de-teste";

    fn test_app() -> (Router, Arc<MemoryGateway>) {
        let gw = Arc::new(MemoryGateway::new());
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/test".into()),
            "JWT_SECRET" => Some(SECRET.into()),
            _ => None,
        })
        .unwrap();
        let state = AppState::with_gateway(gw.clone(), &config);
        (app(state), gw)
    }

    fn get(uri: &str) -> axum::http::request::Builder {
        Request::builder().method("GET").uri(uri)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = test_app();
        let response = app.oneshot(get("/api/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (app, gw) = test_app();
        let request = get("/api/expenses")
            .header(header::AUTHORIZATION, "Bearer nao-e-um-jwt")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn basic_credentials_are_unauthorized() {
        let (app, gw) = test_app();
        let request = get("/api/expenses")
            .header(header::AUTHORIZATION, "Basic dXNlcjpzZW5oYQ==")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn anonymous_calls_stop_before_the_gateway() {
        let (app, gw) = test_app();
        let request = get("/api/expenses")
            .header(header::ACCEPT_LANGUAGE, "pt-BR")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Usuário não autenticado");
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_organization_header_is_a_bad_request() {
        let (app, gw) = test_app();
        let token = issue_test_token(Uuid::new_v4(), SECRET);
        let request = get("/api/expenses")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No organization selected");
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn strangers_are_kept_out_of_an_organization() {
        let (app, gw) = test_app();
        let token = issue_test_token(Uuid::new_v4(), SECRET);
        let request = get("/api/expenses")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(ORGANIZATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        // Só a consulta de vínculos
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn members_reach_their_expenses() {
        let (app, gw) = test_app();
        let (user, org) = (Uuid::new_v4(), Uuid::new_v4());
        gw.seed(
            "organization_members",
            vec![json!({ "organization_id": org, "user_id": user, "role": "member" })],
        );
        gw.seed(
            "expenses",
            vec![json!({
                "id": Uuid::new_v4(), "organization_id": org, "user_id": user,
                "merchant": "Uber", "amount": 23.5, "currency": "USD",
                "expense_date": "2026-03-02", "status": "draft"
            })],
        );

        let token = issue_test_token(user, SECRET);
        let request = get("/api/expenses")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(ORGANIZATION_ID_HEADER, org.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["merchant"], "Uber");
    }

    #[tokio::test]
    async fn invalid_organization_header_is_rejected() {
        let (app, _) = test_app();
        let token = issue_test_token(Uuid::new_v4(), SECRET);
        let request = get("/api/reports")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(ORGANIZATION_ID_HEADER, "loja-1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_catalog_needs_no_session() {
        let (app, _) = test_app();
        let response = app.oneshot(get("/api/statuses").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["approval"].as_array().map(Vec::len), Some(6));
    }
}
