use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, Postgres, Transaction};
use uuid::Uuid;

use crate::models::attachment::get_attachments_for_posts;
use crate::models::post::{IdentityRef, PostDetail, Visibility};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "timeline_event_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimelineEventType {
    Post,
    Boost,
    Mentioned,
    Boosted,
    Liked,
    Followed,
}

/// A home timeline entry: a post or boost event joined with its subject
/// post, author and attachments.
#[derive(Clone, Debug, Serialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub event_type: TimelineEventType,
    pub created_at: DateTime<Utc>,
    pub post: PostDetail,
}

#[derive(sqlx::FromRow)]
struct TimelineEntryRow {
    id: Uuid,
    event_type: TimelineEventType,
    created_at: DateTime<Utc>,
    post_id: Uuid,
    post_content: String,
    post_summary: Option<String>,
    post_visibility: Visibility,
    post_created_at: DateTime<Utc>,
    author_id: Uuid,
    author_username: String,
    author_domain: Option<String>,
    author_display_name: String,
}

/// Post and boost events fanned out to the given identity, newest first.
pub async fn find_home_timeline(
    tx: &mut Transaction<'_, Postgres>,
    identity_id: Uuid,
    limit: i64,
) -> Result<Vec<TimelineEntry>> {
    let rows = query_as::<_, TimelineEntryRow>(
        "
            SELECT
                timeline_events.id,
                timeline_events.type AS event_type,
                timeline_events.created_at,
                posts.id AS post_id,
                posts.content AS post_content,
                posts.summary AS post_summary,
                posts.visibility AS post_visibility,
                posts.created_at AS post_created_at,
                identities.id AS author_id,
                identities.username AS author_username,
                identities.domain AS author_domain,
                identities.display_name AS author_display_name
            FROM timeline_events
            JOIN posts ON timeline_events.subject_post_id = posts.id
            JOIN identities ON posts.author_id = identities.id
            WHERE timeline_events.identity_id = $1
            AND timeline_events.type IN ('post', 'boost')
            ORDER BY timeline_events.created_at DESC
            LIMIT $2
        ",
    )
    .bind(identity_id)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    let post_ids: Vec<Uuid> = rows.iter().map(|row| row.post_id).collect();
    let mut attachments = get_attachments_for_posts(tx, &post_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| TimelineEntry {
            id: row.id,
            event_type: row.event_type,
            created_at: row.created_at,
            post: PostDetail {
                id: row.post_id,
                content: row.post_content,
                summary: row.post_summary,
                visibility: row.post_visibility,
                created_at: row.post_created_at,
                author: IdentityRef::new(
                    row.author_id,
                    row.author_username,
                    row.author_domain,
                    row.author_display_name,
                ),
                attachments: attachments.remove(&row.post_id).unwrap_or_default(),
            },
        })
        .collect())
}

/// The post a notification refers to, with enough context to render a
/// one-line preview.
#[derive(Clone, Debug, Serialize)]
pub struct NotificationPost {
    pub id: Uuid,
    pub content: String,
    pub summary: Option<String>,
    pub author: IdentityRef,
}

/// A notifications page entry. `collapsed` is a display hint set by
/// collapse_adjacent_notifications, never stored.
#[derive(Clone, Debug, Serialize)]
pub struct NotificationEntry {
    pub id: Uuid,
    pub event_type: TimelineEventType,
    pub created_at: DateTime<Utc>,
    pub seen: bool,
    pub collapsed: bool,
    pub subject_post_id: Option<Uuid>,
    pub subject_post: Option<NotificationPost>,
    pub subject_identity: Option<IdentityRef>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    event_type: TimelineEventType,
    created_at: DateTime<Utc>,
    seen: bool,
    subject_post_id: Option<Uuid>,
    post_content: Option<String>,
    post_summary: Option<String>,
    post_author_id: Option<Uuid>,
    post_author_username: Option<String>,
    post_author_domain: Option<String>,
    post_author_display_name: Option<String>,
    subject_identity_id: Option<Uuid>,
    subject_username: Option<String>,
    subject_domain: Option<String>,
    subject_display_name: Option<String>,
}

/// Interaction events (mentions, boosts, likes, follows) for the given
/// identity, newest first, with subject post, its author, and the acting
/// identity joined.
pub async fn find_notification_events(
    tx: &mut Transaction<'_, Postgres>,
    identity_id: Uuid,
    limit: i64,
) -> Result<Vec<NotificationEntry>> {
    let rows = query_as::<_, NotificationRow>(
        "
            SELECT
                timeline_events.id,
                timeline_events.type AS event_type,
                timeline_events.created_at,
                timeline_events.seen,
                timeline_events.subject_post_id,
                posts.content AS post_content,
                posts.summary AS post_summary,
                post_authors.id AS post_author_id,
                post_authors.username AS post_author_username,
                post_authors.domain AS post_author_domain,
                post_authors.display_name AS post_author_display_name,
                subjects.id AS subject_identity_id,
                subjects.username AS subject_username,
                subjects.domain AS subject_domain,
                subjects.display_name AS subject_display_name
            FROM timeline_events
            LEFT JOIN posts ON timeline_events.subject_post_id = posts.id
            LEFT JOIN identities post_authors ON posts.author_id = post_authors.id
            LEFT JOIN identities subjects
                ON timeline_events.subject_identity_id = subjects.id
            WHERE timeline_events.identity_id = $1
            AND timeline_events.type IN ('mentioned', 'boosted', 'liked', 'followed')
            ORDER BY timeline_events.created_at DESC
            LIMIT $2
        ",
    )
    .bind(identity_id)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let subject_post = match (row.subject_post_id, row.post_author_id) {
                (Some(post_id), Some(author_id)) => Some(NotificationPost {
                    id: post_id,
                    content: row.post_content.unwrap_or_default(),
                    summary: row.post_summary,
                    author: IdentityRef::new(
                        author_id,
                        row.post_author_username.unwrap_or_default(),
                        row.post_author_domain,
                        row.post_author_display_name.unwrap_or_default(),
                    ),
                }),
                _ => None,
            };
            let subject_identity = row.subject_identity_id.map(|id| {
                IdentityRef::new(
                    id,
                    row.subject_username.unwrap_or_default(),
                    row.subject_domain,
                    row.subject_display_name.unwrap_or_default(),
                )
            });
            NotificationEntry {
                id: row.id,
                event_type: row.event_type,
                created_at: row.created_at,
                seen: row.seen,
                collapsed: false,
                subject_post_id: row.subject_post_id,
                subject_post,
                subject_identity,
            }
        })
        .collect())
}

/// Mark an interaction event as collapsed when the event right after it in
/// page order is a like/boost/mention on the same subject post. Every event
/// is still rendered; collapsed ones show as a combined entry. Follows never
/// collapse and never cause a predecessor to collapse. Only immediately
/// adjacent events within one fetched page are considered.
pub fn collapse_adjacent_notifications(events: &mut [NotificationEntry]) {
    for i in 1..events.len() {
        let collapsible = matches!(
            events[i].event_type,
            TimelineEventType::Liked | TimelineEventType::Boosted | TimelineEventType::Mentioned
        );
        if collapsible && events[i].subject_post_id == events[i - 1].subject_post_id {
            events[i - 1].collapsed = true;
        }
    }
}

pub async fn get_unseen_notification_count(
    tx: &mut Transaction<'_, Postgres>,
    identity_id: Uuid,
) -> Result<i64> {
    let count = query_scalar::<_, i64>(
        "
            SELECT COUNT(*) FROM timeline_events
            WHERE identity_id = $1
            AND seen = false
            AND type IN ('mentioned', 'boosted', 'liked', 'followed')
        ",
    )
    .bind(identity_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

pub async fn mark_notifications_seen(
    tx: &mut Transaction<'_, Postgres>,
    identity_id: Uuid,
) -> Result<u64> {
    let result = query(
        "
            UPDATE timeline_events
            SET seen = true
            WHERE identity_id = $1
            AND seen = false
            AND type IN ('mentioned', 'boosted', 'liked', 'followed')
        ",
    )
    .bind(identity_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(event_type: TimelineEventType, subject_post: Option<u128>) -> NotificationEntry {
        NotificationEntry {
            id: Uuid::from_u128(stable_id(event_type, subject_post)),
            event_type,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            seen: false,
            collapsed: false,
            subject_post_id: subject_post.map(Uuid::from_u128),
            subject_post: None,
            subject_identity: None,
        }
    }

    fn stable_id(event_type: TimelineEventType, subject_post: Option<u128>) -> u128 {
        // Stable but distinct per (type, subject) pair; value is irrelevant
        (event_type as u128) << 64 | subject_post.unwrap_or(0)
    }

    fn collapsed_flags(events: &[NotificationEntry]) -> Vec<bool> {
        events.iter().map(|e| e.collapsed).collect()
    }

    #[test]
    fn interaction_after_same_post_collapses_predecessor() {
        let mut events = vec![
            entry(TimelineEventType::Liked, Some(5)),
            entry(TimelineEventType::Boosted, Some(5)),
        ];
        collapse_adjacent_notifications(&mut events);
        assert_eq!(collapsed_flags(&events), vec![true, false]);
    }

    #[test]
    fn different_posts_do_not_collapse() {
        let mut events = vec![
            entry(TimelineEventType::Liked, Some(5)),
            entry(TimelineEventType::Liked, Some(6)),
        ];
        collapse_adjacent_notifications(&mut events);
        assert_eq!(collapsed_flags(&events), vec![false, false]);
    }

    #[test]
    fn follow_breaks_adjacency() {
        // liked(5), boosted(5), followed, mentioned(5): the follow keeps the
        // final mention from collapsing the events before it
        let mut events = vec![
            entry(TimelineEventType::Liked, Some(5)),
            entry(TimelineEventType::Boosted, Some(5)),
            entry(TimelineEventType::Followed, None),
            entry(TimelineEventType::Mentioned, Some(5)),
        ];
        collapse_adjacent_notifications(&mut events);
        assert_eq!(collapsed_flags(&events), vec![true, false, false, false]);
    }

    #[test]
    fn run_of_interactions_collapses_all_but_last() {
        let mut events = vec![
            entry(TimelineEventType::Liked, Some(7)),
            entry(TimelineEventType::Boosted, Some(7)),
            entry(TimelineEventType::Mentioned, Some(7)),
        ];
        collapse_adjacent_notifications(&mut events);
        assert_eq!(collapsed_flags(&events), vec![true, true, false]);
    }

    #[test]
    fn follow_never_collapses() {
        let mut events = vec![
            entry(TimelineEventType::Followed, None),
            entry(TimelineEventType::Followed, None),
        ];
        collapse_adjacent_notifications(&mut events);
        assert_eq!(collapsed_flags(&events), vec![false, false]);
    }

    #[test]
    fn empty_and_single_pages_are_untouched() {
        let mut empty: Vec<NotificationEntry> = vec![];
        collapse_adjacent_notifications(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![entry(TimelineEventType::Liked, Some(1))];
        collapse_adjacent_notifications(&mut single);
        assert_eq!(collapsed_flags(&single), vec![false]);
    }
}
