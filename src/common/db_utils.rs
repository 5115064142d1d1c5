// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};

use crate::gateway::Scope;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis RLS (a "chave") antes de qualquer consulta.
/// `set_config(..., true)` vale só até o fim da transação, então a conexão volta limpa para a pool.
pub(crate) async fn begin_rls_transaction(
    pool: &PgPool,
    scope: &Scope,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    // 1. Abre a transação
    let mut tx = pool.begin().await?;

    // 2. Define User ID
    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(scope.user_id.to_string())
        .execute(&mut *tx)
        .await?;

    // 3. Define Organization ID (vazio quando a chamada não é de uma organização)
    let organization = scope.organization_id.map(|id| id.to_string()).unwrap_or_default();
    sqlx::query("SELECT set_config('app.organization_id', $1, true)")
        .bind(organization)
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
