use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{query_as, Postgres, Transaction};
use uuid::Uuid;

use crate::models::post::Visibility;

/// An actor in the social graph. Local identities are backed by a user row
/// and have no domain; remote identities are written by the federation
/// subsystem and only read here.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub domain: Option<String>,
    pub display_name: String,
    pub user_id: Option<Uuid>,
    pub default_post_visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    pub fn handle(&self) -> String {
        match &self.domain {
            Some(domain) => format!("@{}@{}", self.username, domain),
            None => format!("@{}", self.username),
        }
    }
}

pub async fn find_identity_by_user_id(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Option<Identity>> {
    let q = query_as::<_, Identity>(
        "
            SELECT
                id,
                username,
                domain,
                display_name,
                user_id,
                default_post_visibility,
                created_at,
                updated_at
            FROM identities
            WHERE user_id = $1
        ",
    )
    .bind(user_id);
    Ok(q.fetch_optional(&mut **tx).await?)
}

pub async fn create_local_identity(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    username: &str,
    display_name: &str,
) -> Result<Identity> {
    let identity = query_as::<_, Identity>(
        "
            INSERT INTO identities (username, display_name, user_id)
            VALUES ($1, $2, $3)
            RETURNING
                id,
                username,
                domain,
                display_name,
                user_id,
                default_post_visibility,
                created_at,
                updated_at
        ",
    )
    .bind(username)
    .bind(display_name)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity(username: &str, domain: Option<&str>) -> Identity {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        Identity {
            id: Uuid::nil(),
            username: username.to_string(),
            domain: domain.map(str::to_string),
            display_name: String::new(),
            user_id: None,
            default_post_visibility: Visibility::Public,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn local_handle_has_no_domain() {
        let id = identity("ada", None);
        assert!(id.is_local());
        assert_eq!(id.handle(), "@ada");
    }

    #[test]
    fn remote_handle_includes_domain() {
        let id = identity("grace", Some("example.social"));
        assert!(!id.is_local());
        assert_eq!(id.handle(), "@grace@example.social");
    }
}
