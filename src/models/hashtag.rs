use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{query_as, Postgres, Transaction};

use crate::models::post::{assemble_post_details, PostDetail, PostWithAuthorRow};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Hashtag {
    pub hashtag: String,
    pub is_public: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical form of a hashtag as stored and as used in URLs: lowercase with
/// every leading '#' stripped.
pub fn canonical_hashtag(input: &str) -> String {
    input.to_lowercase().trim_start_matches('#').to_string()
}

/// Look up a hashtag by canonical name among publicly visible tags. Tags are
/// visible unless explicitly marked non-public.
pub async fn find_public_hashtag(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<Option<Hashtag>> {
    let hashtag = query_as::<_, Hashtag>(
        "
            SELECT hashtag, is_public, created_at, updated_at
            FROM hashtags
            WHERE hashtag = $1
            AND is_public IS DISTINCT FROM false
        ",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(hashtag)
}

/// Public posts tagged with the given canonical hashtag, newest first.
pub async fn find_public_posts_by_hashtag(
    tx: &mut Transaction<'_, Postgres>,
    hashtag: &str,
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
            JOIN post_hashtags ON posts.id = post_hashtags.post_id
            JOIN identities ON posts.author_id = identities.id
            WHERE post_hashtags.hashtag = $1
            AND posts.visibility = 'public'
            ORDER BY posts.created_at DESC
            LIMIT $2
        ",
    )
    .bind(hashtag)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    assemble_post_details(tx, rows).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_input() {
        assert_eq!(canonical_hashtag("Rust"), "rust");
        assert_eq!(canonical_hashtag("RUST"), "rust");
    }

    #[test]
    fn strips_leading_hashes() {
        assert_eq!(canonical_hashtag("#rust"), "rust");
        assert_eq!(canonical_hashtag("##rust"), "rust");
    }

    #[test]
    fn strips_and_lowercases_together() {
        assert_eq!(canonical_hashtag("#Rust"), "rust");
    }

    #[test]
    fn interior_hashes_are_kept() {
        assert_eq!(canonical_hashtag("c#"), "c#");
    }

    #[test]
    fn canonical_input_is_unchanged() {
        assert_eq!(canonical_hashtag("rust"), "rust");
    }
}
