use crate::app_error::AppError;
use crate::models::hashtag::{canonical_hashtag, find_public_hashtag, find_public_posts_by_hashtag};
use crate::models::interaction::get_post_interactions;
use crate::models::user::AuthSession;
use crate::web::context::CommonContext;
use crate::web::handlers::FEED_PAGE_SIZE;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_messages::Messages;
use minijinja::context;

/// Public feed of posts carrying a hashtag.
pub async fn tag_feed(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
    Path(hashtag): Path<String>,
) -> Result<Response, AppError> {
    // SEO sanitize: send every casing/prefix variant to one URL, before any
    // database work happens
    let canonical = canonical_hashtag(&hashtag);
    if canonical != hashtag {
        let location = format!("/tags/{}/", urlencoding::encode(&canonical));
        return Ok(Redirect::permanent(&location).into_response());
    }

    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx =
        CommonContext::build(&mut tx, auth_session.user.as_ref().map(|u| u.id)).await?;

    let tag = find_public_hashtag(&mut tx, &canonical)
        .await?
        .ok_or_else(|| AppError::NotFound("Hashtag".to_string()))?;

    let posts = find_public_posts_by_hashtag(&mut tx, &tag.hashtag, FEED_PAGE_SIZE).await?;
    let viewer_id = common_ctx.identity.as_ref().map(|identity| identity.id);
    let interactions = get_post_interactions(&mut tx, &posts, viewer_id).await?;

    tx.commit().await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("tag.jinja")?;
    let rendered = template.render(context! {
        current_user => auth_session.user,
        current_page => "tag",
        allows_refresh => true,
        hashtag => tag,
        posts => posts,
        interactions => interactions,
        messages => messages.into_iter().collect::<Vec<_>>(),
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}
