use crate::app_error::AppError;
use crate::models::interaction::get_post_interactions;
use crate::models::post::{find_federated_public_posts, find_local_public_posts};
use crate::models::user::AuthSession;
use crate::web::context::CommonContext;
use crate::web::handlers::FEED_PAGE_SIZE;
use crate::web::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum_messages::Messages;
use minijinja::context;

/// Public posts written on this server. No login required.
pub async fn local_feed(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
) -> Result<Response, AppError> {
    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx =
        CommonContext::build(&mut tx, auth_session.user.as_ref().map(|u| u.id)).await?;

    let posts = find_local_public_posts(&mut tx, FEED_PAGE_SIZE).await?;
    let viewer_id = common_ctx.identity.as_ref().map(|identity| identity.id);
    let interactions = get_post_interactions(&mut tx, &posts, viewer_id).await?;

    tx.commit().await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("local.jinja")?;
    let rendered = template.render(context! {
        current_user => auth_session.user,
        current_page => "local",
        allows_refresh => true,
        posts => posts,
        interactions => interactions,
        messages => messages.into_iter().collect::<Vec<_>>(),
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}

/// Public top-level posts from everywhere this server knows about.
pub async fn federated_feed(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
) -> Result<Response, AppError> {
    let user = auth_session.user.as_ref().ok_or(AppError::Unauthorized)?;

    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx = CommonContext::build(&mut tx, Some(user.id)).await?;

    let posts = find_federated_public_posts(&mut tx, FEED_PAGE_SIZE).await?;
    let viewer_id = common_ctx.identity.as_ref().map(|identity| identity.id);
    let interactions = get_post_interactions(&mut tx, &posts, viewer_id).await?;

    tx.commit().await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("federated.jinja")?;
    let rendered = template.render(context! {
        current_user => auth_session.user,
        current_page => "federated",
        allows_refresh => true,
        posts => posts,
        interactions => interactions,
        messages => messages.into_iter().collect::<Vec<_>>(),
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}
