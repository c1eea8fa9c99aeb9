use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query_as, Postgres, Transaction};
use uuid::Uuid;

use crate::models::attachment::{get_attachments_for_posts, Attachment};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Followers,
    Mentioned,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub summary: Option<String>,
    pub visibility: Visibility,
    pub in_reply_to: Option<Uuid>,
    pub local: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn path(&self) -> String {
        format!("/posts/{}", self.id)
    }
}

pub struct PostDraft {
    pub author_id: Uuid,
    pub content: String,
    pub summary: Option<String>,
    pub visibility: Visibility,
}

/// Create a locally-authored post. Content is expected to already be
/// paragraph HTML (see text_utils::linebreaks). Timeline fan-out happens
/// elsewhere; this only writes the post row.
pub async fn create_local_post(
    tx: &mut Transaction<'_, Postgres>,
    draft: PostDraft,
) -> Result<Post> {
    let post = query_as::<_, Post>(
        "
            INSERT INTO posts (author_id, content, summary, visibility, local)
            VALUES ($1, $2, $3, $4, true)
            RETURNING id, author_id, content, summary, visibility, in_reply_to, local, created_at
        ",
    )
    .bind(draft.author_id)
    .bind(&draft.content)
    .bind(&draft.summary)
    .bind(draft.visibility)
    .fetch_one(&mut **tx)
    .await?;

    Ok(post)
}

/// Author fields carried alongside each rendered post.
#[derive(Clone, Debug, Serialize)]
pub struct IdentityRef {
    pub id: Uuid,
    pub username: String,
    pub domain: Option<String>,
    pub display_name: String,
    pub handle: String,
}

impl IdentityRef {
    pub fn new(id: Uuid, username: String, domain: Option<String>, display_name: String) -> Self {
        let handle = match &domain {
            Some(d) => format!("@{}@{}", username, d),
            None => format!("@{}", username),
        };
        Self {
            id,
            username,
            domain,
            display_name,
            handle,
        }
    }
}

/// A post joined with its author and attachments, ready for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub content: String,
    pub summary: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub author: IdentityRef,
    pub attachments: Vec<Attachment>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostWithAuthorRow {
    pub id: Uuid,
    pub content: String,
    pub summary: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_domain: Option<String>,
    pub author_display_name: String,
}

pub(crate) async fn assemble_post_details(
    tx: &mut Transaction<'_, Postgres>,
    rows: Vec<PostWithAuthorRow>,
) -> Result<Vec<PostDetail>> {
    let post_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut attachments = get_attachments_for_posts(tx, &post_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| PostDetail {
            id: row.id,
            content: row.content,
            summary: row.summary,
            visibility: row.visibility,
            created_at: row.created_at,
            author: IdentityRef::new(
                row.author_id,
                row.author_username,
                row.author_domain,
                row.author_display_name,
            ),
            attachments: attachments.remove(&row.id).unwrap_or_default(),
        })
        .collect())
}

/// Public posts authored on this server, newest first.
pub async fn find_local_public_posts(
    tx: &mut Transaction<'_, Postgres>,
    limit: i64,
) -> Result<Vec<PostDetail>> {
    let rows = query_as::<_, PostWithAuthorRow>(
        "
            SELECT
                posts.id,
                posts.content,
                posts.summary,
                posts.visibility,
                posts.created_at,
                identities.id AS author_id,
                identities.username AS author_username,
                identities.domain AS author_domain,
                identities.display_name AS author_display_name
            FROM posts
            JOIN identities ON posts.author_id = identities.id
            WHERE posts.local
            AND posts.visibility = 'public'
            ORDER BY posts.created_at DESC
            LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    assemble_post_details(tx, rows).await
}

/// Public top-level posts from anywhere, local or remote, newest first.
/// Replies are excluded.
pub async fn find_federated_public_posts(
    tx: &mut Transaction<'_, Postgres>,
    limit: i64,
) -> Result<Vec<PostDetail>> {
    let rows = query_as::<_, PostWithAuthorRow>(
        "
            SELECT
                posts.id,
                posts.content,
                posts.summary,
                posts.visibility,
                posts.created_at,
                identities.id AS author_id,
                identities.username AS author_username,
                identities.domain AS author_domain,
                identities.display_name AS author_display_name
            FROM posts
            JOIN identities ON posts.author_id = identities.id
            WHERE posts.visibility = 'public'
            AND posts.in_reply_to IS NULL
            ORDER BY posts.created_at DESC
            LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    assemble_post_details(tx, rows).await
}
