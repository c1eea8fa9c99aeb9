use anyhow::Result;
use sqlx::{query_scalar, Postgres, Transaction};

/// Read a system configuration string at render time. Missing keys are not
/// an error; callers supply their own default.
pub async fn get_system_value(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> Result<Option<String>> {
    let value = query_scalar::<_, String>("SELECT value FROM system_config WHERE key = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(value)
}
