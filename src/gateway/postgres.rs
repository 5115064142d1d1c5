// src/gateway/postgres.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tokio::sync::RwLock;

use super::{
    sql::{self, ProcedureSignature, Statement},
    Filter, Gateway, GatewayError, Scope, TableQuery, WriteOp,
};
use crate::common::db_utils::begin_rls_transaction;

// Assinaturas da procedure no catálogo, da mais antiga para a mais nova.
const SIGNATURE_SQL: &str = r#"
    SELECT
        p.proretset,
        COALESCE(p.proargnames, ARRAY[]::text[]),
        COALESCE(p.proargmodes::text[], ARRAY[]::text[]),
        ARRAY(
            SELECT format_type(a.t, NULL)
            FROM unnest(p.proargtypes::oid[]) WITH ORDINALITY AS a(t, n)
            ORDER BY a.n
        ),
        p.pronargdefaults
    FROM pg_proc p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    WHERE n.nspname = 'public' AND p.proname = $1
    ORDER BY p.oid
"#;

type SignatureRow = (bool, Vec<String>, Vec<String>, Vec<String>, i16);

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => GatewayError::RowNotVisible,
            sqlx::Error::Database(db_err) => GatewayError::Rejected {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            other => GatewayError::Transport(other.to_string()),
        }
    }
}

async fn fetch_rows(conn: &mut PgConnection, stmt: Statement) -> Result<Vec<Value>, GatewayError> {
    let mut query = sqlx::query_scalar::<_, Value>(&stmt.sql);
    for param in stmt.params {
        query = query.bind(param);
    }
    Ok(query.fetch_all(conn).await?)
}

async fn execute(conn: &mut PgConnection, stmt: Statement) -> Result<u64, GatewayError> {
    let mut query = sqlx::query(&stmt.sql);
    for param in stmt.params {
        query = query.bind(param);
    }
    Ok(query.execute(conn).await?.rows_affected())
}

/// Fica com a assinatura mais antiga; overloads ficam visíveis no log.
fn pick_signature(procedure: &str, rows: Vec<SignatureRow>) -> Result<SignatureRow, GatewayError> {
    if rows.len() > 1 {
        tracing::warn!(
            procedure,
            overloads = rows.len(),
            "Procedure com overloads; usando a assinatura mais antiga"
        );
    }

    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::UnknownProcedure(procedure.to_string()))
}

/// Gateway falando direto com o Postgres do backend hospedado.
/// Cada chamada roda na sua própria transação, com as variáveis de RLS já definidas;
/// `atomic` coloca várias escritas dentro da mesma.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
    // Cache das assinaturas de procedures (o catálogo quase nunca muda em runtime)
    procedures: Arc<RwLock<HashMap<String, Arc<ProcedureSignature>>>>,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, procedures: Arc::new(RwLock::new(HashMap::new())) }
    }

    async fn signature(&self, procedure: &str) -> Result<Arc<ProcedureSignature>, GatewayError> {
        if let Some(signature) = self.procedures.read().await.get(procedure) {
            return Ok(signature.clone());
        }

        let rows: Vec<SignatureRow> = sqlx::query_as(SIGNATURE_SQL)
            .bind(procedure)
            .fetch_all(&self.pool)
            .await?;

        let (returns_set, names, modes, types, defaults) = pick_signature(procedure, rows)?;

        let signature = Arc::new(ProcedureSignature::from_catalog(
            names,
            modes,
            types,
            defaults,
            returns_set,
        ));

        tracing::debug!(procedure, args = signature.args.len(), "Assinatura de procedure carregada");

        self.procedures
            .write()
            .await
            .insert(procedure.to_string(), signature.clone());

        Ok(signature)
    }

    async fn call(
        &self,
        conn: &mut PgConnection,
        procedure: &'static str,
        args: &Value,
    ) -> Result<Value, GatewayError> {
        let signature = self.signature(procedure).await?;
        let (call_sql, params) = sql::rpc(procedure, &signature, args)?;

        let mut query = sqlx::query_scalar::<_, Option<Value>>(&call_sql);
        for param in params {
            query = query.bind(param);
        }
        let payload = query.fetch_one(conn).await?;
        Ok(payload.unwrap_or(Value::Null))
    }

    async fn apply(&self, conn: &mut PgConnection, op: WriteOp) -> Result<Value, GatewayError> {
        match op {
            WriteOp::Insert { table, row } => fetch_rows(conn, sql::insert(table, row)?)
                .await?
                .into_iter()
                .next()
                .ok_or(GatewayError::RowNotVisible),
            WriteOp::Update { table, filters, patch } => {
                let rows = fetch_rows(conn, sql::update(table, filters, patch)?).await?;
                Ok(Value::Array(rows))
            }
            WriteOp::Delete { table, filters } => {
                let affected = execute(conn, sql::delete(table, filters)?).await?;
                Ok(Value::from(affected))
            }
            WriteOp::Rpc { procedure, args } => self.call(conn, procedure, &args).await,
        }
    }

    async fn write(&self, scope: &Scope, op: WriteOp) -> Result<Value, GatewayError> {
        let mut tx = begin_rls_transaction(&self.pool, scope).await?;
        let value = self.apply(&mut *tx, op).await?;
        tx.commit().await?;
        Ok(value)
    }
}

fn into_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        _ => Vec::new(),
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn select(&self, scope: &Scope, query: TableQuery) -> Result<Vec<Value>, GatewayError> {
        let stmt = sql::select(query)?;
        let mut tx = begin_rls_transaction(&self.pool, scope).await?;
        let rows = fetch_rows(&mut *tx, stmt).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn insert(
        &self,
        scope: &Scope,
        table: &'static str,
        row: Value,
    ) -> Result<Value, GatewayError> {
        self.write(scope, WriteOp::Insert { table, row }).await
    }

    async fn update(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<Vec<Value>, GatewayError> {
        let rows = self.write(scope, WriteOp::Update { table, filters, patch }).await?;
        Ok(into_rows(rows))
    }

    async fn delete(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
    ) -> Result<u64, GatewayError> {
        let affected = self.write(scope, WriteOp::Delete { table, filters }).await?;
        Ok(affected.as_u64().unwrap_or_default())
    }

    async fn rpc(
        &self,
        scope: &Scope,
        procedure: &'static str,
        args: Value,
    ) -> Result<Value, GatewayError> {
        self.write(scope, WriteOp::Rpc { procedure, args }).await
    }

    async fn atomic(&self, scope: &Scope, ops: Vec<WriteOp>) -> Result<Vec<Value>, GatewayError> {
        let mut tx = begin_rls_transaction(&self.pool, scope).await?;

        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            // Erro aqui derruba a transação inteira (rollback no drop)
            results.push(self.apply(&mut *tx, op).await?);
        }

        tx.commit().await?;
        Ok(results)
    }
}
