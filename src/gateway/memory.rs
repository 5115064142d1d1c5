// src/gateway/memory.rs
//
// Gateway em memória para os testes: tabelas como listas de JSON, procedures "enlatadas"
// e registro de todas as chamadas recebidas.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Direction, Filter, Gateway, GatewayError, Scope, TableQuery, WriteOp};

pub type Tables = HashMap<&'static str, Vec<Value>>;

enum Procedure {
    Canned(Box<dyn Fn(&Value) -> Result<Value, GatewayError> + Send + Sync>),
    /// Procedure que também escreve nas tabelas (ex: muda o status de uma despesa).
    Writing(Box<dyn Fn(&Value, &mut Tables) -> Result<Value, GatewayError> + Send + Sync>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Select(TableQuery),
    Insert { table: &'static str, row: Value },
    Update { table: &'static str, filters: Vec<Filter>, patch: Value },
    Delete { table: &'static str, filters: Vec<Filter> },
    Rpc { procedure: &'static str, args: Value },
}

impl From<&WriteOp> for GatewayCall {
    fn from(op: &WriteOp) -> Self {
        match op.clone() {
            WriteOp::Insert { table, row } => GatewayCall::Insert { table, row },
            WriteOp::Update { table, filters, patch } => GatewayCall::Update { table, filters, patch },
            WriteOp::Delete { table, filters } => GatewayCall::Delete { table, filters },
            WriteOp::Rpc { procedure, args } => GatewayCall::Rpc { procedure, args },
        }
    }
}

#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    procedures: Mutex<HashMap<&'static str, Procedure>>,
    failing_tables: Mutex<HashSet<&'static str>>,
    // Quantos inserts ainda passam antes de a tabela começar a recusar
    insert_budget: Mutex<HashMap<&'static str, usize>>,
    calls: Mutex<Vec<(Scope, GatewayCall)>>,
    atomic_batches: Mutex<usize>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &'static str, rows: Vec<Value>) {
        self.tables.lock().unwrap().entry(table).or_default().extend(rows);
    }

    pub fn on_rpc<F>(&self, procedure: &'static str, handler: F)
    where
        F: Fn(&Value) -> Result<Value, GatewayError> + Send + Sync + 'static,
    {
        self.procedures.lock().unwrap().insert(procedure, Procedure::Canned(Box::new(handler)));
    }

    pub fn on_rpc_writing<F>(&self, procedure: &'static str, handler: F)
    where
        F: Fn(&Value, &mut Tables) -> Result<Value, GatewayError> + Send + Sync + 'static,
    {
        self.procedures.lock().unwrap().insert(procedure, Procedure::Writing(Box::new(handler)));
    }

    /// Toda leitura desta tabela passa a falhar.
    pub fn fail_table(&self, table: &'static str) {
        self.failing_tables.lock().unwrap().insert(table);
    }

    /// Os primeiros `allowed` inserts passam; os seguintes falham.
    pub fn fail_inserts_after(&self, table: &'static str, allowed: usize) {
        self.insert_budget.lock().unwrap().insert(table, allowed);
    }

    pub fn rows(&self, table: &'static str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn scopes(&self) -> Vec<Scope> {
        self.calls.lock().unwrap().iter().map(|(scope, _)| *scope).collect()
    }

    pub fn atomic_batches(&self) -> usize {
        *self.atomic_batches.lock().unwrap()
    }

    pub fn selects_on(&self, table: &str) -> Vec<TableQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Select(q) if q.table == table => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn rpc_args(&self, procedure: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Rpc { procedure: p, args } if p == procedure => Some(args),
                _ => None,
            })
            .collect()
    }

    fn record(&self, scope: &Scope, call: GatewayCall) {
        self.calls.lock().unwrap().push((*scope, call));
    }

    fn apply(&self, tables: &mut Tables, op: WriteOp) -> Result<Value, GatewayError> {
        match op {
            WriteOp::Insert { table, mut row } => {
                if let Some(left) = self.insert_budget.lock().unwrap().get_mut(table) {
                    if *left == 0 {
                        return Err(GatewayError::Rejected {
                            code: Some("23514".to_string()),
                            message: format!("insert into {} rejected", table),
                        });
                    }
                    *left -= 1;
                }

                if let Some(object) = row.as_object_mut() {
                    object
                        .entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                }
                tables.entry(table).or_default().push(row.clone());
                Ok(row)
            }
            WriteOp::Update { table, filters, patch } => {
                let mut updated = Vec::new();
                let rows = tables.entry(table).or_default();
                for row in rows.iter_mut().filter(|row| filters.iter().all(|f| matches(row, f))) {
                    if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                        for (k, v) in changes {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                    updated.push(row.clone());
                }
                Ok(Value::Array(updated))
            }
            WriteOp::Delete { table, filters } => {
                let rows = tables.entry(table).or_default();
                let before = rows.len();
                rows.retain(|row| !filters.iter().all(|f| matches(row, f)));
                Ok(Value::from((before - rows.len()) as u64))
            }
            WriteOp::Rpc { procedure, args } => {
                let procedures = self.procedures.lock().unwrap();
                match procedures.get(procedure) {
                    Some(Procedure::Canned(handler)) => handler(&args),
                    Some(Procedure::Writing(handler)) => handler(&args, tables),
                    None => Err(GatewayError::UnknownProcedure(procedure.to_string())),
                }
            }
        }
    }

    fn write(&self, scope: &Scope, op: WriteOp) -> Result<Value, GatewayError> {
        self.record(scope, GatewayCall::from(&op));
        let mut tables = self.tables.lock().unwrap();
        self.apply(&mut tables, op)
    }
}

fn field<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(c, v) => field(row, c) == v,
        Filter::In(c, values) => values.contains(field(row, c)),
        Filter::Gte(c, v) => matches!(compare(field(row, c), v), Some(Ordering::Greater | Ordering::Equal)),
        Filter::Lte(c, v) => matches!(compare(field(row, c), v), Some(Ordering::Less | Ordering::Equal)),
        Filter::IsNull(c, is_null) => field(row, c).is_null() == *is_null,
        Filter::ILike(c, pattern) => {
            let needle = pattern.trim_matches('%').to_lowercase();
            field(row, c).as_str().is_some_and(|s| s.to_lowercase().contains(&needle))
        }
    }
}

fn project(row: &Value, columns: Option<&'static [&'static str]>) -> Value {
    match columns {
        None => row.clone(),
        Some(columns) => {
            let mut map = Map::new();
            for c in columns {
                map.insert(c.to_string(), field(row, c).clone());
            }
            Value::Object(map)
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, scope: &Scope, query: TableQuery) -> Result<Vec<Value>, GatewayError> {
        self.record(scope, GatewayCall::Select(query.clone()));

        if self.failing_tables.lock().unwrap().contains(query.table) {
            return Err(GatewayError::Rejected {
                code: Some("57014".to_string()),
                message: format!("lookup on {} failed", query.table),
            });
        }

        let mut rows: Vec<Value> = self
            .rows(query.table)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .collect();

        if let Some((column, direction)) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare(field(a, column), field(b, column)).unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit.max(0) as usize);
        }

        Ok(rows.iter().map(|row| project(row, query.columns)).collect())
    }

    async fn insert(
        &self,
        scope: &Scope,
        table: &'static str,
        row: Value,
    ) -> Result<Value, GatewayError> {
        self.write(scope, WriteOp::Insert { table, row })
    }

    async fn update(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<Vec<Value>, GatewayError> {
        match self.write(scope, WriteOp::Update { table, filters, patch })? {
            Value::Array(rows) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    async fn delete(
        &self,
        scope: &Scope,
        table: &'static str,
        filters: Vec<Filter>,
    ) -> Result<u64, GatewayError> {
        let affected = self.write(scope, WriteOp::Delete { table, filters })?;
        Ok(affected.as_u64().unwrap_or_default())
    }

    async fn rpc(
        &self,
        scope: &Scope,
        procedure: &'static str,
        args: Value,
    ) -> Result<Value, GatewayError> {
        self.write(scope, WriteOp::Rpc { procedure, args })
    }

    /// Roda o lote numa cópia das tabelas e só publica se tudo passar.
    async fn atomic(&self, scope: &Scope, ops: Vec<WriteOp>) -> Result<Vec<Value>, GatewayError> {
        *self.atomic_batches.lock().unwrap() += 1;
        for op in &ops {
            self.record(scope, GatewayCall::from(op));
        }

        let mut tables = self.tables.lock().unwrap();
        let mut draft = tables.clone();

        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            results.push(self.apply(&mut draft, op)?);
        }

        *tables = draft;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn failed_batches_leave_tables_untouched() {
        let gw = MemoryGateway::new();
        let scope = Scope::user(Uuid::new_v4());
        gw.seed("expense_splits", vec![json!({ "id": "a", "amount": 50 })]);
        gw.fail_inserts_after("expense_splits", 1);

        let result = gw
            .atomic(
                &scope,
                vec![
                    WriteOp::delete("expense_splits", Vec::new()),
                    WriteOp::insert("expense_splits", json!({ "amount": 70 })),
                    WriteOp::insert("expense_splits", json!({ "amount": 30 })),
                ],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(gw.rows("expense_splits"), vec![json!({ "id": "a", "amount": 50 })]);
        assert_eq!(gw.atomic_batches(), 1);
    }
}
