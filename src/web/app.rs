use super::state::AppState;
use crate::models::user::Backend;
use crate::web::handlers::auth::{do_login, do_logout, login};
use crate::web::handlers::feeds::{federated_feed, local_feed};
use crate::web::handlers::handler_404;
use crate::web::handlers::hashtag::tag_feed;
use crate::web::handlers::home::{do_create_post, home};
use crate::web::handlers::notifications::list_notifications;
use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use axum_login::{login_required, AuthManagerLayerBuilder};
use axum_messages::MessagesManagerLayer;
use std::net::SocketAddr;
use time::Duration;
use tokio::signal;
use tokio::task::AbortHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{session_store::ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

pub struct App {
    state: AppState,
}

impl App {
    pub async fn new(state: AppState) -> Result<Self, Box<dyn std::error::Error>> {
        sqlx::migrate!().run(&state.db_pool).await?;

        Ok(Self { state })
    }

    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let authn_backend = Backend {
            db: self.state.db_pool.clone(),
        };

        let session_store = PostgresStore::new(self.state.db_pool.clone())
            .with_table_name("sessions")
            .unwrap()
            .with_schema_name("public")
            .unwrap();
        session_store.migrate().await?;

        let deletion_task = tokio::task::spawn(
            session_store
                .clone()
                .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
        );

        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(self.state.config.env == "production")
            .with_same_site(SameSite::Lax)
            .with_expiry(Expiry::OnInactivity(Duration::seconds(60 * 60 * 24 * 30)));

        let auth_layer = AuthManagerLayerBuilder::new(authn_backend, session_layer).build();

        let static_router = Router::new().nest_service("/static", ServeDir::new("static"));

        let protected_router = Router::new()
            .route("/", get(home))
            .route("/", post(do_create_post))
            .route("/federated/", get(federated_feed))
            .route("/notifications/", get(list_notifications))
            .route("/logout", post(do_logout))
            .route_layer(login_required!(Backend, login_url = "/login"));

        let app = Router::new()
            .route("/tags/:hashtag/", get(tag_feed))
            .route("/local/", get(local_feed))
            .route("/login", get(login))
            .route("/login", post(do_login))
            .fallback(handler_404)
            .merge(protected_router)
            .layer(MessagesManagerLayer)
            .layer(auth_layer)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
            .merge(static_router);

        // run our app with hyper, listening globally on port 3000
        let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("listening on {}", addr);

        // Ensure we use a shutdown signal to abort the deletion task.
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
            .await?;

        deletion_task.await??;

        Ok(())
    }
}

async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}
