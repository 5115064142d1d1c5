// src/gateway/sql.rs
//
// Renderização do SQL usado pelo PgGateway. Todos os valores vão como parâmetros jsonb;
// a tipagem certa de cada coluna vem de `jsonb_populate_record(NULL::"tabela", ...)`,
// então o Postgres converte o JSON para o tipo real da coluna (uuid, numeric, date...).

use serde_json::{Map, Value};

use super::{is_identifier, Direction, Filter, GatewayError, TableQuery};

/// SQL pronto + parâmetros ($1, $2...) na ordem.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

fn ident(name: &str) -> Result<String, GatewayError> {
    if is_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(GatewayError::InvalidIdentifier(name.to_string()))
    }
}

/// Valor de um parâmetro convertido para o tipo da coluna.
fn typed_param(table: &str, column: &str, index: usize) -> String {
    format!("(jsonb_populate_record(NULL::{}, ${})).\"{}\"", table, index, column)
}

fn column_object(column: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(column.to_string(), value);
    Value::Object(map)
}

fn render_filters(
    table: &str,
    filters: Vec<Filter>,
    params: &mut Vec<Value>,
) -> Result<String, GatewayError> {
    let mut clauses = Vec::with_capacity(filters.len());

    for filter in filters {
        let column_name = filter.column();
        let column = ident(column_name)?;

        let clause = match filter {
            Filter::Eq(_, value) => {
                params.push(column_object(column_name, value));
                format!("t.{} = {}", column, typed_param(table, column_name, params.len()))
            }
            Filter::Gte(_, value) => {
                params.push(column_object(column_name, value));
                format!("t.{} >= {}", column, typed_param(table, column_name, params.len()))
            }
            Filter::Lte(_, value) => {
                params.push(column_object(column_name, value));
                format!("t.{} <= {}", column, typed_param(table, column_name, params.len()))
            }
            Filter::In(_, values) if values.is_empty() => "FALSE".to_string(),
            Filter::In(_, values) => {
                let objects = values
                    .into_iter()
                    .map(|v| column_object(column_name, v))
                    .collect();
                params.push(Value::Array(objects));
                format!(
                    "t.{col} IN (SELECT (jsonb_populate_record(NULL::{table}, e)).{col} FROM jsonb_array_elements(${idx}) AS e)",
                    col = column,
                    table = table,
                    idx = params.len()
                )
            }
            Filter::IsNull(_, true) => format!("t.{} IS NULL", column),
            Filter::IsNull(_, false) => format!("t.{} IS NOT NULL", column),
            Filter::ILike(_, pattern) => {
                params.push(Value::String(pattern));
                format!("t.{}::text ILIKE (${} #>> '{{}}')", column, params.len())
            }
        };
        clauses.push(clause);
    }

    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

fn object_columns(row: &Value, context: &str) -> Result<Vec<String>, GatewayError> {
    let object = row.as_object().ok_or_else(|| GatewayError::InvalidArgument {
        procedure: context.to_string(),
        message: "row payload must be a JSON object".to_string(),
    })?;

    if object.is_empty() {
        return Err(GatewayError::InvalidArgument {
            procedure: context.to_string(),
            message: "row payload has no columns".to_string(),
        });
    }

    object.keys().map(|k| ident(k)).collect()
}

pub fn select(query: TableQuery) -> Result<Statement, GatewayError> {
    let table = ident(query.table)?;
    let mut params = Vec::new();

    let projection = match query.columns {
        Some(columns) => {
            let pairs = columns
                .iter()
                .map(|c| Ok(format!("'{}', t.{}", c, ident(c)?)))
                .collect::<Result<Vec<_>, GatewayError>>()?;
            format!("jsonb_build_object({})", pairs.join(", "))
        }
        None => "to_jsonb(t)".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {} AS t", projection, table);
    sql.push_str(&render_filters(&table, query.filters, &mut params)?);

    if let Some((column, direction)) = query.order {
        let dir = match direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY t.{} {}", ident(column)?, dir));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit.max(0)));
    }

    Ok(Statement { sql, params })
}

pub fn insert(table: &'static str, row: Value) -> Result<Statement, GatewayError> {
    let table_ident = ident(table)?;
    let columns = object_columns(&row, table)?;
    let selected = columns.iter().map(|c| format!("r.{}", c)).collect::<Vec<_>>();

    let sql = format!(
        "INSERT INTO {table} AS t ({cols}) SELECT {sel} FROM jsonb_populate_record(NULL::{table}, $1) AS r RETURNING to_jsonb(t)",
        table = table_ident,
        cols = columns.join(", "),
        sel = selected.join(", "),
    );

    Ok(Statement { sql, params: vec![row] })
}

pub fn update(
    table: &'static str,
    filters: Vec<Filter>,
    patch: Value,
) -> Result<Statement, GatewayError> {
    // UPDATE sem filtro atingiria a tabela inteira
    if filters.is_empty() {
        return Err(GatewayError::InvalidArgument {
            procedure: table.to_string(),
            message: "update requires at least one filter".to_string(),
        });
    }

    let table_ident = ident(table)?;
    let columns = object_columns(&patch, table)?;
    let selected = columns.iter().map(|c| format!("r.{}", c)).collect::<Vec<_>>();

    let mut params = vec![patch];
    let mut sql = format!(
        "UPDATE {table} AS t SET ({cols}) = (SELECT {sel} FROM jsonb_populate_record(NULL::{table}, $1) AS r)",
        table = table_ident,
        cols = columns.join(", "),
        sel = selected.join(", "),
    );
    sql.push_str(&render_filters(&table_ident, filters, &mut params)?);
    sql.push_str(" RETURNING to_jsonb(t)");

    Ok(Statement { sql, params })
}

pub fn delete(table: &'static str, filters: Vec<Filter>) -> Result<Statement, GatewayError> {
    if filters.is_empty() {
        return Err(GatewayError::InvalidArgument {
            procedure: table.to_string(),
            message: "delete requires at least one filter".to_string(),
        });
    }

    let table_ident = ident(table)?;
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {} AS t", table_ident);
    sql.push_str(&render_filters(&table_ident, filters, &mut params)?);

    Ok(Statement { sql, params })
}

// =========================================================================
//  PROCEDURES
// =========================================================================

/// Um argumento de entrada de uma procedure, como o catálogo (`pg_proc`) descreve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureArg {
    pub name: String,
    pub type_name: String,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSignature {
    pub args: Vec<ProcedureArg>,
    pub returns_set: bool,
}

impl ProcedureSignature {
    /// Monta a assinatura a partir das colunas do catálogo.
    /// `modes` vem vazio quando todos os argumentos são IN.
    pub fn from_catalog(
        names: Vec<String>,
        modes: Vec<String>,
        in_types: Vec<String>,
        default_count: i16,
        returns_set: bool,
    ) -> Self {
        let in_names: Vec<String> = if modes.is_empty() {
            names
        } else {
            names
                .into_iter()
                .zip(modes)
                .filter(|(_, mode)| matches!(mode.as_str(), "i" | "b" | "v"))
                .map(|(name, _)| name)
                .collect()
        };

        let total = in_types.len();
        let first_default = total.saturating_sub(default_count.max(0) as usize);

        let args = in_names
            .into_iter()
            .zip(in_types)
            .enumerate()
            .map(|(position, (name, type_name))| ProcedureArg {
                name,
                type_name,
                has_default: position >= first_default,
            })
            .collect();

        Self { args, returns_set }
    }
}

/// Converte um valor JSON para o texto que o Postgres aceita no CAST para `type_name`.
fn to_pg_text(value: &Value, type_name: &str) -> Result<Option<String>, String> {
    if value.is_null() {
        return Ok(None);
    }

    if type_name == "json" || type_name == "jsonb" {
        return Ok(Some(value.to_string()));
    }

    if type_name.ends_with("[]") {
        let items = value.as_array().ok_or("expected a JSON array")?;
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Null => parts.push("NULL".to_string()),
                Value::String(s) => {
                    parts.push(format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
                }
                Value::Number(n) => parts.push(n.to_string()),
                Value::Bool(b) => parts.push(b.to_string()),
                _ => return Err("nested arrays/objects are not supported".to_string()),
            }
        }
        return Ok(Some(format!("{{{}}}", parts.join(","))));
    }

    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(format!("cannot pass a JSON object/array as {}", type_name)),
    }
}

/// Chamada em notação nomeada: `proc(p_a => CAST($1 AS uuid), ...)`.
/// Devolve o SQL e os parâmetros em texto.
pub fn rpc(
    procedure: &str,
    signature: &ProcedureSignature,
    args: &Value,
) -> Result<(String, Vec<Option<String>>), GatewayError> {
    let invalid = |message: String| GatewayError::InvalidArgument {
        procedure: procedure.to_string(),
        message,
    };

    let proc_ident = ident(procedure)?;
    let empty = Map::new();
    let provided = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(invalid("arguments must be a flat JSON object".to_string())),
    };

    for key in provided.keys() {
        if !signature.args.iter().any(|a| &a.name == key) {
            return Err(invalid(format!("unknown argument '{}'", key)));
        }
    }

    let mut named = Vec::new();
    let mut params = Vec::new();

    for arg in &signature.args {
        match provided.get(&arg.name) {
            Some(value) => {
                let text = to_pg_text(value, &arg.type_name).map_err(&invalid)?;
                params.push(text);
                named.push(format!(
                    "{} => CAST(${}::text AS {})",
                    ident(&arg.name)?,
                    params.len(),
                    arg.type_name
                ));
            }
            None if arg.has_default => {}
            None => return Err(invalid(format!("missing argument '{}'", arg.name))),
        }
    }

    let call = format!("public.{}({})", proc_ident, named.join(", "));
    let sql = if signature.returns_set {
        format!("SELECT COALESCE(jsonb_agg(to_jsonb(r)), '[]'::jsonb) FROM {} AS r", call)
    } else {
        format!("SELECT to_jsonb({})", call)
    };

    Ok((sql, params))
}
