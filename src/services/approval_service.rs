// src/services/approval_service.rs

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::{
        context::{Caller, RequestContext},
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, decode_rows, Direction, Filter, Gateway, GatewayError, TableQuery, WriteOp},
    models::approvals::{
        ApprovalDecision, ApprovalRecord, ApprovalStats, ApprovalStatus, ApprovalWithDetails,
        ApprovalWorkflow, ApprovalWorkflowStep, NewWorkflow, WorkflowWithSteps,
    },
    services::approval_join::join_approval_details,
};

const COMPONENT: &str = "ApprovalService";
const HISTORY_LIMIT: i64 = 100;

/// O que está sendo submetido para aprovação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalTarget {
    Expense(Uuid),
    Report(Uuid),
}

#[derive(Clone)]
pub struct ApprovalService {
    gateway: Arc<dyn Gateway>,
}

impl ApprovalService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    // =========================================================================
    //  FILAS (com join de detalhes)
    // =========================================================================

    /// Aprovações esperando decisão do usuário atual, mais antigas primeiro.
    pub async fn pending_for_me(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ApprovalWithDetails>, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let query = TableQuery::new("approvals")
            .eq_id("organization_id", caller.organization_id)
            .eq_id("current_approver_id", caller.user_id)
            .filter(Filter::In(
                "status",
                vec![
                    json!(ApprovalStatus::Pending),
                    json!(ApprovalStatus::AwaitingPayment),
                ],
            ))
            .order("submitted_at", Direction::Asc);

        let rows = self.gateway.select(&scope, query).await.logged(COMPONENT, "pending_for_me")?;
        let records: Vec<ApprovalRecord> = decode_rows(rows).logged(COMPONENT, "pending_for_me")?;

        join_approval_details(self.gateway.as_ref(), &scope, records)
            .await
            .logged(COMPONENT, "pending_for_me")
    }

    /// Histórico da organização, mais recentes primeiro.
    pub async fn history(
        &self,
        ctx: &RequestContext,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ApprovalWithDetails>, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let mut query = TableQuery::new("approvals")
            .eq_id("organization_id", caller.organization_id)
            .order("submitted_at", Direction::Desc)
            .limit(HISTORY_LIMIT);
        if let Some(status) = status {
            query = query.eq("status", json!(status));
        }

        let rows = self.gateway.select(&scope, query).await.logged(COMPONENT, "history")?;
        let records: Vec<ApprovalRecord> = decode_rows(rows).logged(COMPONENT, "history")?;

        join_approval_details(self.gateway.as_ref(), &scope, records)
            .await
            .logged(COMPONENT, "history")
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        approval_id: Uuid,
    ) -> Result<ApprovalWithDetails, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let record = self.fetch_record(&caller, approval_id).await.logged(COMPONENT, "get")?;

        let mut joined = join_approval_details(self.gateway.as_ref(), &scope, vec![record])
            .await
            .logged(COMPONENT, "get")?;
        joined.pop().ok_or(AppError::NotFound("Approval"))
    }

    // =========================================================================
    //  DECISÕES
    // =========================================================================

    pub async fn approve(
        &self,
        ctx: &RequestContext,
        approval_id: Uuid,
        comments: Option<String>,
    ) -> Result<ApprovalDecision, AppError> {
        let caller = ctx.require_caller()?;

        let args = json!({
            "p_approval_id": approval_id,
            "p_approver_id": caller.user_id,
            "p_comments": comments,
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "approve_expense", args)
            .await
            .logged(COMPONENT, "approve")?;

        tracing::info!("Aprovação {} aprovada por {}", approval_id, caller.user_id);
        self.decision(&caller, approval_id, ApprovalStatus::Approved, &payload, "approve").await
    }

    pub async fn reject(
        &self,
        ctx: &RequestContext,
        approval_id: Uuid,
        reason: &str,
    ) -> Result<ApprovalDecision, AppError> {
        let caller = ctx.require_caller()?;
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput("A rejection reason is required".into()));
        }

        let args = json!({
            "p_approval_id": approval_id,
            "p_approver_id": caller.user_id,
            "p_reason": reason,
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "reject_expense", args)
            .await
            .logged(COMPONENT, "reject")?;

        tracing::info!("Aprovação {} rejeitada por {}", approval_id, caller.user_id);
        self.decision(&caller, approval_id, ApprovalStatus::Rejected, &payload, "reject").await
    }

    /// Relê a linha depois da transição. Se o RLS já a escondeu, não é falha:
    /// devolvemos o id conhecido com o status pretendido.
    async fn decision(
        &self,
        caller: &Caller,
        approval_id: Uuid,
        intended: ApprovalStatus,
        payload: &Value,
        operation: &'static str,
    ) -> Result<ApprovalDecision, AppError> {
        // A procedure pode avançar para a próxima etapa em vez de concluir
        let reported = payload
            .get("status")
            .and_then(|s| serde_json::from_value::<ApprovalStatus>(s.clone()).ok());

        match self.fetch_record(caller, approval_id).await {
            Ok(record) => Ok(ApprovalDecision { approval_id, status: record.status, record: Some(record) }),
            Err(e) if e.is_row_not_visible() => {
                tracing::warn!(
                    component = COMPONENT,
                    operation,
                    "Aprovação {} não está mais visível após a transição; usando status pretendido",
                    approval_id
                );
                Ok(ApprovalDecision {
                    approval_id,
                    status: reported.unwrap_or(intended),
                    record: None,
                })
            }
            Err(e) => Err(e).logged(COMPONENT, operation),
        }
    }

    async fn fetch_record(
        &self,
        caller: &Caller,
        approval_id: Uuid,
    ) -> Result<ApprovalRecord, GatewayError> {
        let query = TableQuery::new("approvals")
            .eq_id("id", approval_id)
            .eq_id("organization_id", caller.organization_id);
        decode(self.gateway.select_one(&caller.scope(), query).await?)
    }

    pub async fn stats(&self, ctx: &RequestContext) -> Result<ApprovalStats, AppError> {
        let caller = ctx.require_caller()?;

        let args = json!({
            "p_organization_id": caller.organization_id,
            "p_user_id": caller.user_id,
        });
        let payload = self
            .gateway
            .rpc(&caller.scope(), "get_approval_stats", args)
            .await
            .logged(COMPONENT, "stats")?;

        // Procedures `RETURNS TABLE` chegam como lista de uma linha
        let payload = match payload {
            Value::Array(mut rows) => rows.pop().unwrap_or(Value::Null),
            other => other,
        };
        if payload.is_null() {
            return Ok(ApprovalStats::default());
        }
        decode(payload).logged(COMPONENT, "stats")
    }

    /// Submete uma despesa ou relatório e cria a cadeia de aprovação na mesma transação.
    /// Se a cadeia falhar, a submissão é desfeita. Devolve o payload da submissão.
    pub(crate) async fn submit_with_chain(
        &self,
        caller: &Caller,
        submit: WriteOp,
        target: ApprovalTarget,
    ) -> Result<Value, AppError> {
        let (expense_id, report_id) = match target {
            ApprovalTarget::Expense(id) => (Some(id), None),
            ApprovalTarget::Report(id) => (None, Some(id)),
        };

        let chain = WriteOp::rpc(
            "create_approval_chain",
            json!({
                "p_organization_id": caller.organization_id,
                "p_expense_id": expense_id,
                "p_report_id": report_id,
                "p_submitted_by": caller.user_id,
            }),
        );

        let results = self
            .gateway
            .atomic(&caller.scope(), vec![submit, chain])
            .await
            .logged(COMPONENT, "submit_with_chain")?;
        Ok(results.into_iter().next().unwrap_or(Value::Null))
    }

    // =========================================================================
    //  WORKFLOWS
    // =========================================================================

    pub async fn list_workflows(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ApprovalWorkflow>, AppError> {
        let caller = ctx.require_caller()?;
        let query = TableQuery::new("approval_workflows")
            .eq_id("organization_id", caller.organization_id)
            .order("name", Direction::Asc);

        let rows = self
            .gateway
            .select(&caller.scope(), query)
            .await
            .logged(COMPONENT, "list_workflows")?;
        decode_rows(rows).logged(COMPONENT, "list_workflows")
    }

    pub async fn get_workflow(
        &self,
        ctx: &RequestContext,
        workflow_id: Uuid,
    ) -> Result<WorkflowWithSteps, AppError> {
        let caller = ctx.require_caller()?;
        let scope = caller.scope();

        let workflow_query = TableQuery::new("approval_workflows")
            .eq_id("id", workflow_id)
            .eq_id("organization_id", caller.organization_id);
        let steps_query = TableQuery::new("approval_workflow_steps")
            .eq_id("workflow_id", workflow_id)
            .order("step_number", Direction::Asc);

        let (workflow, steps) = tokio::try_join!(
            self.gateway.select_one(&scope, workflow_query),
            self.gateway.select(&scope, steps_query),
        )
        .logged(COMPONENT, "get_workflow")?;

        Ok(WorkflowWithSteps {
            workflow: decode(workflow).logged(COMPONENT, "get_workflow")?,
            steps: decode_rows(steps).logged(COMPONENT, "get_workflow")?,
        })
    }

    pub async fn create_workflow(
        &self,
        ctx: &RequestContext,
        input: NewWorkflow,
    ) -> Result<WorkflowWithSteps, AppError> {
        let caller = ctx.require_caller()?;
        if input.steps.is_empty() {
            return Err(AppError::InvalidInput("A workflow needs at least one step".into()));
        }
        for step in &input.steps {
            step.check_approver().map_err(AppError::InvalidInput)?;
        }

        // Id gerado aqui para as etapas apontarem para o workflow no mesmo lote
        let workflow_id = Uuid::new_v4();
        let mut ops = vec![WriteOp::insert(
            "approval_workflows",
            json!({
                "id": workflow_id,
                "organization_id": caller.organization_id,
                "name": input.name,
                "description": input.description,
                "is_default": input.is_default,
                "is_active": true,
            }),
        )];

        // Etapas numeradas na ordem em que vieram
        for (index, step) in input.steps.into_iter().enumerate() {
            ops.push(WriteOp::insert(
                "approval_workflow_steps",
                json!({
                    "workflow_id": workflow_id,
                    "step_number": index + 1,
                    "approver_type": step.approver_type,
                    "approver_user_id": step.approver_user_id,
                    "approver_role": step.approver_role,
                    "amount_threshold": step.amount_threshold,
                }),
            ));
        }

        let mut rows = self
            .gateway
            .atomic(&caller.scope(), ops)
            .await
            .logged(COMPONENT, "create_workflow")?
            .into_iter();

        let workflow: ApprovalWorkflow = rows
            .next()
            .ok_or(GatewayError::RowNotVisible)
            .and_then(decode)
            .logged(COMPONENT, "create_workflow")?;
        let steps: Vec<ApprovalWorkflowStep> =
            decode_rows(rows.collect()).logged(COMPONENT, "create_workflow")?;

        tracing::info!("Workflow '{}' criado com {} etapas", workflow.name, steps.len());
        Ok(WorkflowWithSteps { workflow, steps })
    }

    pub async fn deactivate_workflow(
        &self,
        ctx: &RequestContext,
        workflow_id: Uuid,
    ) -> Result<ApprovalWorkflow, AppError> {
        let caller = ctx.require_caller()?;

        let filters = vec![
            Filter::id("id", workflow_id),
            Filter::id("organization_id", caller.organization_id),
        ];
        let mut rows = self
            .gateway
            .update(&caller.scope(), "approval_workflows", filters, json!({ "is_active": false }))
            .await
            .logged(COMPONENT, "deactivate_workflow")?;

        let row = rows.pop().ok_or(AppError::NotFound("Workflow"))?;
        decode(row).logged(COMPONENT, "deactivate_workflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::memory::MemoryGateway,
        models::approvals::{ApproverType, NewWorkflowStep},
    };

    fn approval_row(id: Uuid, org: Uuid, approver: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "organization_id": org,
            "expense_id": Uuid::new_v4(),
            "report_id": null,
            "workflow_id": null,
            "current_step": 1,
            "total_steps": 1,
            "current_approver_id": approver,
            "status": status,
            "submitted_at": "2026-03-01T12:00:00Z",
            "completed_at": null
        })
    }

    fn setup() -> (Arc<MemoryGateway>, ApprovalService, RequestContext) {
        let gw = Arc::new(MemoryGateway::new());
        let service = ApprovalService::new(gw.clone());
        let ctx = RequestContext::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        (gw, service, ctx)
    }

    #[tokio::test]
    async fn missing_context_short_circuits_without_calls() {
        let (gw, service, _) = setup();

        let anonymous = RequestContext::default();
        let err = service.pending_for_me(&anonymous).await.unwrap_err();
        assert_eq!(err.to_string(), "User not authenticated");

        let no_org = RequestContext::new(Some(Uuid::new_v4()), None);
        let err = service.approve(&no_org, Uuid::new_v4(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "No organization selected");

        let err = service.stats(&no_org).await.unwrap_err();
        assert!(matches!(err, AppError::NoOrganizationSelected));

        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn approve_returns_refetched_record() {
        let (gw, service, ctx) = setup();
        let caller = ctx.require_caller().unwrap();
        let id = Uuid::new_v4();
        gw.seed("approvals", vec![approval_row(id, caller.organization_id, caller.user_id, "approved")]);
        gw.on_rpc("approve_expense", |_| Ok(json!({ "status": "approved" })));

        let decision = service.approve(&ctx, id, Some("ok".into())).await.unwrap();

        assert_eq!(decision.status, ApprovalStatus::Approved);
        assert_eq!(decision.record.unwrap().id, id);

        let args = gw.rpc_args("approve_expense");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0]["p_approval_id"], json!(id));
        assert_eq!(args[0]["p_approver_id"], json!(caller.user_id));
        assert_eq!(args[0]["p_comments"], json!("ok"));
    }

    #[tokio::test]
    async fn row_hidden_after_reject_yields_synthesized_decision() {
        let (gw, service, ctx) = setup();
        let id = Uuid::new_v4();
        gw.on_rpc("reject_expense", |_| Ok(json!({ "success": true })));

        let decision = service.reject(&ctx, id, "Missing receipt").await.unwrap();

        assert_eq!(decision.approval_id, id);
        assert_eq!(decision.status, ApprovalStatus::Rejected);
        assert!(decision.record.is_none());
        assert_eq!(gw.rpc_args("reject_expense")[0]["p_reason"], json!("Missing receipt"));
    }

    #[tokio::test]
    async fn reported_status_wins_over_intended_when_row_is_hidden() {
        let (gw, service, ctx) = setup();
        gw.on_rpc("approve_expense", |_| Ok(json!({ "status": "awaiting_payment" })));

        let decision = service.approve(&ctx, Uuid::new_v4(), None).await.unwrap();
        assert_eq!(decision.status, ApprovalStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn procedure_errors_pass_through_verbatim() {
        let (gw, service, ctx) = setup();
        gw.on_rpc("approve_expense", |_| {
            Err(GatewayError::Rejected {
                code: Some("P0001".into()),
                message: "You are not the current approver".into(),
            })
        });

        let err = service.approve(&ctx, Uuid::new_v4(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "You are not the current approver");
        // Não relê a linha quando a procedure falhou
        assert!(gw.selects_on("approvals").is_empty());
    }

    #[tokio::test]
    async fn blank_rejection_reason_is_refused_locally() {
        let (gw, service, ctx) = setup();
        let err = service.reject(&ctx, Uuid::new_v4(), "  ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_queue_only_lists_my_actionable_items() {
        let (gw, service, ctx) = setup();
        let caller = ctx.require_caller().unwrap();
        let org = caller.organization_id;
        let me = caller.user_id;
        gw.seed(
            "approvals",
            vec![
                approval_row(Uuid::new_v4(), org, me, "pending"),
                approval_row(Uuid::new_v4(), org, me, "approved"),
                approval_row(Uuid::new_v4(), org, Uuid::new_v4(), "pending"),
                approval_row(Uuid::new_v4(), org, me, "awaiting_payment"),
            ],
        );

        let queue = service.pending_for_me(&ctx).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|a| a.record.can_approve(me)));
        // Um lookup em lote para as despesas, nenhum para workflow/relatório
        assert_eq!(gw.selects_on("expenses").len(), 1);
        assert!(gw.selects_on("approval_workflows").is_empty());
    }

    #[tokio::test]
    async fn stats_accepts_single_row_tables() {
        let (gw, service, ctx) = setup();
        gw.on_rpc("get_approval_stats", |_| {
            Ok(json!([{ "pending_count": 3, "approved_count": 10, "rejected_count": 1,
                        "awaiting_payment_count": 2, "avg_approval_hours": 5.5 }]))
        });

        let stats = service.stats(&ctx).await.unwrap();
        assert_eq!(stats.pending_count, 3);
        assert_eq!(stats.approved_count, 10);
    }

    #[tokio::test]
    async fn workflow_steps_are_numbered_in_order() {
        let (gw, service, ctx) = setup();
        let input = NewWorkflow {
            name: "Acima de 500".into(),
            description: None,
            is_default: false,
            steps: vec![
                NewWorkflowStep {
                    approver_type: ApproverType::Manager,
                    approver_user_id: None,
                    approver_role: None,
                    amount_threshold: None,
                },
                NewWorkflowStep {
                    approver_type: ApproverType::Role,
                    approver_user_id: None,
                    approver_role: Some("finance".into()),
                    amount_threshold: None,
                },
            ],
        };

        let created = service.create_workflow(&ctx, input).await.unwrap();
        assert_eq!(created.steps.len(), 2);
        assert_eq!(created.steps[0].step_number, 1);
        assert_eq!(created.steps[1].step_number, 2);
        assert_eq!(created.steps[1].workflow_id, created.workflow.id);
        assert_eq!(gw.rows("approval_workflow_steps").len(), 2);
    }

    #[tokio::test]
    async fn failed_step_insert_leaves_no_workflow_behind() {
        let (gw, service, ctx) = setup();
        gw.fail_inserts_after("approval_workflow_steps", 1);
        let step = |role: &str| NewWorkflowStep {
            approver_type: ApproverType::Role,
            approver_user_id: None,
            approver_role: Some(role.into()),
            amount_threshold: None,
        };
        let input = NewWorkflow {
            name: "Duas etapas".into(),
            description: None,
            is_default: false,
            steps: vec![step("finance"), step("cfo")],
        };

        let err = service.create_workflow(&ctx, input).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
        assert!(gw.rows("approval_workflows").is_empty());
        assert!(gw.rows("approval_workflow_steps").is_empty());
    }

    #[tokio::test]
    async fn user_step_without_user_is_rejected() {
        let (gw, service, ctx) = setup();
        let input = NewWorkflow {
            name: "Direto".into(),
            description: None,
            is_default: false,
            steps: vec![NewWorkflowStep {
                approver_type: ApproverType::User,
                approver_user_id: None,
                approver_role: None,
                amount_threshold: None,
            }],
        };

        assert!(matches!(
            service.create_workflow(&ctx, input).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_workflow_deactivation_is_not_found() {
        let (_gw, service, ctx) = setup();
        let err = service.deactivate_workflow(&ctx, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Workflow")));
    }
}
