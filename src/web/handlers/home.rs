use crate::app_error::AppError;
use crate::models::interaction::get_event_interactions;
use crate::models::post::{create_local_post, PostDraft};
use crate::models::system_config::get_system_value;
use crate::models::timeline_event::find_home_timeline;
use crate::models::user::AuthSession;
use crate::text_utils::linebreaks;
use crate::web::context::CommonContext;
use crate::web::handlers::FEED_PAGE_SIZE;
use crate::web::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_messages::Messages;
use minijinja::context;
use serde::{Deserialize, Serialize};

const DEFAULT_CONTENT_WARNING_LABEL: &str = "Content warning";

#[derive(Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub content_warning: String,
}

#[derive(Debug)]
pub struct ValidPostForm {
    pub text: String,
    pub content_warning: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl PostForm {
    /// Field-level validation. Whitespace-only text does not count as
    /// content; the content warning is optional and trimmed.
    pub fn validate(&self) -> Result<ValidPostForm, Vec<FieldError>> {
        let mut errors = Vec::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.push(FieldError {
                field: "text",
                message: "This field is required.",
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let content_warning = self.content_warning.trim();
        Ok(ValidPostForm {
            text: text.to_string(),
            content_warning: (!content_warning.is_empty()).then(|| content_warning.to_string()),
        })
    }
}

pub async fn home(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
) -> Result<Response, AppError> {
    render_home(&state, &auth_session, messages, &PostForm::default(), &[]).await
}

pub async fn do_create_post(
    auth_session: AuthSession,
    State(state): State<AppState>,
    messages: Messages,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let user = auth_session.user.as_ref().ok_or(AppError::Unauthorized)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => {
            // Re-render with field errors; nothing is written
            return render_home(&state, &auth_session, messages, &form, &errors).await;
        }
    };

    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx = CommonContext::build(&mut tx, Some(user.id)).await?;
    let identity = common_ctx
        .identity
        .ok_or_else(|| anyhow::anyhow!("user {} has no local identity", user.id))?;

    create_local_post(
        &mut tx,
        PostDraft {
            author_id: identity.id,
            content: linebreaks(&valid.text),
            summary: valid.content_warning,
            visibility: identity.default_post_visibility,
        },
    )
    .await?;

    tx.commit().await?;

    // Redirect back so a refresh cannot resubmit the form
    Ok(Redirect::to("/").into_response())
}

async fn render_home(
    state: &AppState,
    auth_session: &AuthSession,
    messages: Messages,
    form: &PostForm,
    form_errors: &[FieldError],
) -> Result<Response, AppError> {
    let user = auth_session.user.as_ref().ok_or(AppError::Unauthorized)?;

    let db = &state.db_pool;
    let mut tx = db.begin().await?;

    let common_ctx = CommonContext::build(&mut tx, Some(user.id)).await?;
    let identity = common_ctx
        .identity
        .clone()
        .ok_or_else(|| anyhow::anyhow!("user {} has no local identity", user.id))?;

    let events = find_home_timeline(&mut tx, identity.id, FEED_PAGE_SIZE).await?;
    let interactions = get_event_interactions(&mut tx, &events, Some(identity.id)).await?;
    let content_warning_text = get_system_value(&mut tx, "content_warning_text")
        .await?
        .unwrap_or_else(|| DEFAULT_CONTENT_WARNING_LABEL.to_string());

    tx.commit().await?;

    let template: minijinja::Template<'_, '_> = state.env.get_template("home.jinja")?;
    let rendered = template.render(context! {
        current_user => auth_session.user.clone(),
        current_page => "home",
        allows_refresh => true,
        identity => identity,
        events => events,
        interactions => interactions,
        content_warning_text => content_warning_text,
        form_text => form.text.clone(),
        form_content_warning => form.content_warning.clone(),
        form_errors => form_errors,
        messages => messages.into_iter().collect::<Vec<_>>(),
        unseen_notification_count => common_ctx.unseen_notification_count,
    })?;

    Ok(Html(rendered).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(text: &str, content_warning: &str) -> PostForm {
        PostForm {
            text: text.to_string(),
            content_warning: content_warning.to_string(),
        }
    }

    #[test]
    fn empty_text_is_rejected() {
        let errors = form("", "").validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "text");
    }

    #[test]
    fn whitespace_text_is_rejected() {
        assert!(form("   \n\t", "").validate().is_err());
    }

    #[test]
    fn valid_text_passes_trimmed() {
        let valid = form("  hello  ", "").validate().unwrap();
        assert_eq!(valid.text, "hello");
        assert_eq!(valid.content_warning, None);
    }

    #[test]
    fn content_warning_is_optional_and_trimmed() {
        let valid = form("hello", "  spoilers  ").validate().unwrap();
        assert_eq!(valid.content_warning.as_deref(), Some("spoilers"));

        let valid = form("hello", "   ").validate().unwrap();
        assert_eq!(valid.content_warning, None);
    }
}
