use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::app_error::AppError;
use crate::models::identity::{find_identity_by_user_id, Identity};
use crate::models::timeline_event::get_unseen_notification_count;

/// Common context data needed by most template renders
pub struct CommonContext {
    pub identity: Option<Identity>,
    pub unseen_notification_count: i64,
}

impl CommonContext {
    /// Resolve the current identity and its unseen notification count.
    /// Anonymous requests get no identity and a zero badge.
    pub async fn build(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Option<Uuid>,
    ) -> Result<Self, AppError> {
        match user_id {
            Some(user_id) => {
                let identity = find_identity_by_user_id(tx, user_id).await?;
                let unseen_notification_count = match &identity {
                    Some(identity) => get_unseen_notification_count(tx, identity.id)
                        .await
                        .unwrap_or(0),
                    None => 0,
                };
                Ok(CommonContext {
                    identity,
                    unseen_notification_count,
                })
            }
            None => Ok(CommonContext {
                identity: None,
                unseen_notification_count: 0,
            }),
        }
    }
}
