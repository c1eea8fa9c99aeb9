use crate::app_error::AppError;
use crate::models::user::AuthSession;
use crate::web::context::CommonContext;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use minijinja::context;

use super::state::AppState;

pub mod auth;
pub mod feeds;
pub mod hashtag;
pub mod home;
pub mod notifications;

/// Hard cap on every feed page.
pub const FEED_PAGE_SIZE: i64 = 50;

pub async fn handler_404(
    auth_session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx =
        CommonContext::build(&mut tx, auth_session.user.as_ref().map(|u| u.id)).await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("404.jinja")?;
    let rendered: String = template.render(context! {
        current_user => auth_session.user,
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}
