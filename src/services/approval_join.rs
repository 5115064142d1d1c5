// src/services/approval_join.rs
//
// Join feito em memória: os registros de aprovação chegam sem os detalhes e
// buscamos workflow/despesa/relatório em lote, um `IN (...)` por tabela.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    gateway::{decode_rows, Gateway, GatewayError, Scope, TableQuery},
    models::approvals::{
        ApprovalRecord, ApprovalWithDetails, ExpenseSummary, ReportSummary, WorkflowSummary,
    },
};

trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for WorkflowSummary {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for ExpenseSummary {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for ReportSummary {
    fn key(&self) -> Uuid {
        self.id
    }
}

fn collect_ids(
    records: &[ApprovalRecord],
    pick: impl Fn(&ApprovalRecord) -> Option<Uuid>,
) -> BTreeSet<Uuid> {
    records.iter().filter_map(pick).collect()
}

/// Uma consulta em lote. Conjunto vazio não gera chamada.
async fn lookup<T>(
    gateway: &dyn Gateway,
    scope: &Scope,
    table: &'static str,
    columns: &'static [&'static str],
    ids: BTreeSet<Uuid>,
) -> Result<HashMap<Uuid, Arc<T>>, GatewayError>
where
    T: DeserializeOwned + Keyed,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = TableQuery::new(table).columns(columns).in_ids("id", ids);
    let rows: Vec<T> = decode_rows(gateway.select(scope, query).await?)?;

    Ok(rows.into_iter().map(|row| (row.key(), Arc::new(row))).collect())
}

fn attach<T>(map: &HashMap<Uuid, Arc<T>>, id: Option<Uuid>) -> Option<Arc<T>> {
    id.and_then(|id| map.get(&id).cloned())
}

/// Decora cada registro com os detalhes, mantendo ordem e quantidade.
///
/// As três buscas rodam em paralelo; qualquer falha derruba o join inteiro.
/// Id preenchido sem linha correspondente (escondida pelo RLS) vira `None`.
pub async fn join_approval_details(
    gateway: &dyn Gateway,
    scope: &Scope,
    records: Vec<ApprovalRecord>,
) -> Result<Vec<ApprovalWithDetails>, GatewayError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let workflow_ids = collect_ids(&records, |r| r.workflow_id);
    let expense_ids = collect_ids(&records, |r| r.expense_id);
    let report_ids = collect_ids(&records, |r| r.report_id);

    let (workflows, expenses, reports) = tokio::try_join!(
        lookup::<WorkflowSummary>(
            gateway,
            scope,
            "approval_workflows",
            WorkflowSummary::COLUMNS,
            workflow_ids
        ),
        lookup::<ExpenseSummary>(gateway, scope, "expenses", ExpenseSummary::COLUMNS, expense_ids),
        lookup::<ReportSummary>(
            gateway,
            scope,
            "expense_reports",
            ReportSummary::COLUMNS,
            report_ids
        ),
    )?;

    Ok(records
        .into_iter()
        .map(|record| ApprovalWithDetails {
            workflow: attach(&workflows, record.workflow_id),
            expense: attach(&expenses, record.expense_id),
            report: attach(&reports, record.report_id),
            record,
        })
        .collect())
}
