use crate::app_error::AppError;
use crate::models::timeline_event::{
    collapse_adjacent_notifications, find_notification_events, mark_notifications_seen,
};
use crate::models::user::AuthSession;
use crate::web::context::CommonContext;
use crate::web::handlers::FEED_PAGE_SIZE;
use crate::web::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum_messages::Messages;
use minijinja::context;

pub async fn list_notifications(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
) -> Result<Response, AppError> {
    let user = auth_session.user.as_ref().ok_or(AppError::Unauthorized)?;

    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    // Badge count is resolved before this visit marks everything seen
    let common_ctx = CommonContext::build(&mut tx, Some(user.id)).await?;
    let identity = common_ctx
        .identity
        .clone()
        .ok_or_else(|| anyhow::anyhow!("user {} has no local identity", user.id))?;

    let mut events = find_notification_events(&mut tx, identity.id, FEED_PAGE_SIZE).await?;
    collapse_adjacent_notifications(&mut events);

    mark_notifications_seen(&mut tx, identity.id).await?;

    tx.commit().await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("notifications.jinja")?;
    let rendered = template.render(context! {
        current_user => auth_session.user,
        current_page => "notifications",
        allows_refresh => true,
        events => events,
        messages => messages.into_iter().collect::<Vec<_>>(),
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}
