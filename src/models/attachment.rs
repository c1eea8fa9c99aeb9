use anyhow::Result;
use serde::Serialize;
use sqlx::{query_as, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub url: String,
    pub media_type: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// Fetch attachments for a page of posts in one query, bucketed by post id
/// and ordered by sort_order within each post.
pub async fn get_attachments_for_posts(
    tx: &mut Transaction<'_, Postgres>,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Attachment>>> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = query_as::<_, Attachment>(
        "
            SELECT id, post_id, url, media_type, description, sort_order
            FROM post_attachments
            WHERE post_id = ANY($1)
            ORDER BY post_id, sort_order
        ",
    )
    .bind(post_ids)
    .fetch_all(&mut **tx)
    .await?;

    let mut by_post: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
    for attachment in rows {
        by_post.entry(attachment.post_id).or_default().push(attachment);
    }
    Ok(by_post)
}
