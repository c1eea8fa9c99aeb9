use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    // Wrap anyhow errors so handlers can use `?` on any fallible call
    Anyhow(anyhow::Error),

    Unauthorized,
    NotFound(String),
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, sentry_level) = match &self {
            AppError::Anyhow(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Something went wrong: {}", err),
                sentry::Level::Error,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized".to_string(),
                sentry::Level::Info,
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                format!("{} not found", resource),
                sentry::Level::Info,
            ),
        };

        sentry::capture_message(&message, sentry_level);

        (status, message).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Anyhow(err) => write!(f, "{}", err),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::NotFound(resource) => write!(f, "{} not found", resource),
        }
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::Anyhow(err.into())
    }
}
