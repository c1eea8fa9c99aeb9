use anyhow::Result;
use serde::Serialize;
use sqlx::{query_as, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::post::PostDetail;
use crate::models::timeline_event::TimelineEntry;

/// Per-post like/boost aggregate for one page of results, including whether
/// the viewing identity interacted.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct InteractionSummary {
    pub likes: i64,
    pub boosts: i64,
    pub viewer_liked: bool,
    pub viewer_boosted: bool,
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    post_id: Uuid,
    likes: i64,
    boosts: i64,
    viewer_liked: bool,
    viewer_boosted: bool,
}

/// Aggregate interactions for a set of posts. Posts without any
/// interactions are absent from the returned map; templates treat a missing
/// entry as all-zero. The viewer may be anonymous.
pub async fn get_interactions_for_posts(
    tx: &mut Transaction<'_, Postgres>,
    post_ids: &[Uuid],
    viewer_id: Option<Uuid>,
) -> Result<HashMap<Uuid, InteractionSummary>> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = query_as::<_, InteractionRow>(
        "
            SELECT
                post_id,
                COUNT(*) FILTER (WHERE type = 'like') AS likes,
                COUNT(*) FILTER (WHERE type = 'boost') AS boosts,
                COALESCE(BOOL_OR(type = 'like' AND identity_id = $2), false) AS viewer_liked,
                COALESCE(BOOL_OR(type = 'boost' AND identity_id = $2), false) AS viewer_boosted
            FROM post_interactions
            WHERE post_id = ANY($1)
            GROUP BY post_id
        ",
    )
    .bind(post_ids)
    .bind(viewer_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.post_id,
                InteractionSummary {
                    likes: row.likes,
                    boosts: row.boosts,
                    viewer_liked: row.viewer_liked,
                    viewer_boosted: row.viewer_boosted,
                },
            )
        })
        .collect())
}

/// Interaction summaries for a page of rendered posts.
pub async fn get_post_interactions(
    tx: &mut Transaction<'_, Postgres>,
    posts: &[PostDetail],
    viewer_id: Option<Uuid>,
) -> Result<HashMap<Uuid, InteractionSummary>> {
    let post_ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
    get_interactions_for_posts(tx, &post_ids, viewer_id).await
}

/// Interaction summaries for the posts behind a page of timeline events.
pub async fn get_event_interactions(
    tx: &mut Transaction<'_, Postgres>,
    events: &[TimelineEntry],
    viewer_id: Option<Uuid>,
) -> Result<HashMap<Uuid, InteractionSummary>> {
    let post_ids: Vec<Uuid> = events.iter().map(|event| event.post.id).collect();
    get_interactions_for_posts(tx, &post_ids, viewer_id).await
}
