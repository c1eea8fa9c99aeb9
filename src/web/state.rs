use minijinja::Environment;
use sqlx::PgPool;

use crate::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub env: Environment<'static>,
    pub db_pool: PgPool,
}
