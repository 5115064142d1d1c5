// src/gateway.rs

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod postgres;
pub mod sql;

#[cfg(test)]
pub mod memory;

pub use postgres::PgGateway;

/// Código que o backend devolve quando a linha pedida não está visível
/// (ex: a política de RLS mudou logo depois de uma transição de estado).
pub const ROW_NOT_VISIBLE_CODE: &str = "PGRST116";

// ---
// Identidade sob a qual cada chamada roda (vira `app.user_id` / `app.organization_id` no RLS)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
}

impl Scope {
    pub fn user(user_id: Uuid) -> Self {
        Self { user_id, organization_id: None }
    }

    pub fn organization(user_id: Uuid, organization_id: Uuid) -> Self {
        Self { user_id, organization_id: Some(organization_id) }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Erro devolvido pelo próprio backend (constraint, RLS, exceção de procedure...).
    #[error("{message}")]
    Rejected { code: Option<String>, message: String },

    #[error("Row not visible after the operation")]
    RowNotVisible,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown remote procedure: {0}")]
    UnknownProcedure(String),

    #[error("Invalid argument for {procedure}: {message}")]
    InvalidArgument { procedure: String, message: String },

    #[error("Failed to decode gateway payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Gateway connection failure: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { code, .. } => code.as_deref(),
            GatewayError::RowNotVisible => Some(ROW_NOT_VISIBLE_CODE),
            _ => None,
        }
    }

    pub fn is_row_not_visible(&self) -> bool {
        self.code() == Some(ROW_NOT_VISIBLE_CODE)
    }
}

// =========================================================================
//  FILTROS E CONSULTAS
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Value),
    In(&'static str, Vec<Value>),
    Gte(&'static str, Value),
    Lte(&'static str, Value),
    /// `true` = IS NULL, `false` = IS NOT NULL
    IsNull(&'static str, bool),
    /// Padrão no formato do ILIKE (`%texto%`)
    ILike(&'static str, String),
}

impl Filter {
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _)
            | Filter::In(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _)
            | Filter::IsNull(c, _)
            | Filter::ILike(c, _) => c,
        }
    }

    pub fn id(column: &'static str, id: Uuid) -> Self {
        Filter::Eq(column, Value::String(id.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: &'static str,
    pub columns: Option<&'static [&'static str]>,
    pub filters: Vec<Filter>,
    pub order: Option<(&'static str, Direction)>,
    pub limit: Option<i64>,
}

impl TableQuery {
    pub fn new(table: &'static str) -> Self {
        Self { table, columns: None, filters: Vec::new(), order: None, limit: None }
    }

    pub fn columns(mut self, columns: &'static [&'static str]) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column, value.into()))
    }

    pub fn eq_id(self, column: &'static str, id: Uuid) -> Self {
        self.filter(Filter::id(column, id))
    }

    /// Lookup em lote: `column IN (ids)`.
    pub fn in_ids<I>(self, column: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = Uuid>,
    {
        let values = ids.into_iter().map(|id| Value::String(id.to_string())).collect();
        self.filter(Filter::In(column, values))
    }

    pub fn order(mut self, column: &'static str, direction: Direction) -> Self {
        self.order = Some((column, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Escrita que pode ir num lote atômico (`Gateway::atomic`).
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert { table: &'static str, row: Value },
    Update { table: &'static str, filters: Vec<Filter>, patch: Value },
    Delete { table: &'static str, filters: Vec<Filter> },
    Rpc { procedure: &'static str, args: Value },
}

impl WriteOp {
    pub fn insert(table: &'static str, row: Value) -> Self {
        WriteOp::Insert { table, row }
    }

    pub fn delete(table: &'static str, filters: Vec<Filter>) -> Self {
        WriteOp::Delete { table, filters }
    }

    pub fn rpc(procedure: &'static str, args: Value) -> Self {
        WriteOp::Rpc { procedure, args }
    }
}

// =========================================================================
//  O GATEWAY
// =========================================================================

/// O backend relacional hospedado: operações genéricas de tabela + procedures nomeadas.
/// Toda a autorização (RLS) e as regras opacas vivem do outro lado.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, scope: &Scope, query: TableQuery) -> Result<Vec<Value>, GatewayError>;

    async fn insert(
        &self,
        scope: &Scope,
        table: &'static str,
        row: Value,
    ) -> Result<Value, GatewayError>;

    async fn update(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<Vec<Value>, GatewayError>;

    async fn delete(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
    ) -> Result<u64, GatewayError>;

    /// Chama uma procedure com um registro plano de argumentos (nunca posicionais).
    async fn rpc(
        &self,
        scope: &Scope,
        procedure: &'static str,
        args: Value,
    ) -> Result<Value, GatewayError>;

    /// Executa as escritas em ordem, numa única transação: ou todas valem ou nenhuma.
    /// Um resultado por operação: a linha inserida, o array de linhas alteradas,
    /// o número de linhas removidas ou o payload da procedure.
    async fn atomic(&self, scope: &Scope, ops: Vec<WriteOp>) -> Result<Vec<Value>, GatewayError>;

    /// Exatamente uma linha. Zero linhas vira `RowNotVisible`.
    async fn select_one(&self, scope: &Scope, query: TableQuery) -> Result<Value, GatewayError> {
        let mut rows = self.select(scope, query.limit(1)).await?;
        rows.pop().ok_or(GatewayError::RowNotVisible)
    }
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(value)?)
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter().map(decode).collect()
}

/// Valida nomes de tabela/coluna/procedure antes de irem para o SQL.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
