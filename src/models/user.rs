use anyhow::Result;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHashString, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use axum::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use sqlx::{query_as, PgPool, Postgres, Transaction};

pub struct UserDraft {
    pub login_name: String,
    pub password_hash: String,
}

impl UserDraft {
    pub fn new(login_name: String, password: String) -> Result<Self> {
        if password.len() < 8 {
            return Err(anyhow::anyhow!("password must be at least 8 characters"));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)?
            .serialize()
            .to_string();

        Ok(Self {
            login_name,
            password_hash,
        })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub login_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn verify_password(&self, password: &str) -> Result<(), argon2::password_hash::Error> {
        let argon2 = Argon2::default();
        let pwstr = PasswordHashString::new(&self.password_hash)?;
        let password_hash = pwstr.password_hash();
        argon2.verify_password(password.as_bytes(), &password_hash)
    }
}

pub async fn create_user(
    tx: &mut Transaction<'_, Postgres>,
    user_draft: UserDraft,
) -> Result<User> {
    let user = query_as::<_, User>(
        "
            INSERT INTO users (login_name, password_hash)
            VALUES ($1, $2)
            RETURNING id, login_name, password_hash, created_at, updated_at
        ",
    )
    .bind(&user_draft.login_name)
    .bind(&user_draft.password_hash)
    .fetch_one(&mut **tx)
    .await?;

    Ok(user)
}

pub async fn update_password(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    new_password: String,
) -> Result<User> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(new_password.as_bytes(), &salt)?
        .serialize()
        .to_string();

    let user = query_as::<_, User>(
        "
            UPDATE users
            SET password_hash = $1, updated_at = now()
            WHERE id = $2
            RETURNING id, login_name, password_hash, created_at, updated_at
        ",
    )
    .bind(&password_hash)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(user)
}

pub async fn find_user_by_id(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Option<User>> {
    let q = query_as::<_, User>(
        "SELECT id, login_name, password_hash, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(id);
    Ok(q.fetch_optional(&mut **tx).await?)
}

pub async fn find_user_by_login_name(
    tx: &mut Transaction<'_, Postgres>,
    login_name: &str,
) -> Result<Option<User>> {
    let q = query_as::<_, User>(
        "SELECT id, login_name, password_hash, created_at, updated_at FROM users WHERE login_name = $1",
    )
    .bind(login_name);
    Ok(q.fetch_optional(&mut **tx).await?)
}

impl AuthUser for User {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.password_hash.as_bytes()
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub login_name: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Backend {
    pub db: PgPool,
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = User;
    type Credentials = Credentials;
    type Error = sqlx::Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user = query_as::<_, User>(
            "SELECT id, login_name, password_hash, created_at, updated_at FROM users WHERE login_name = $1",
        )
        .bind(&creds.login_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(user.filter(|user| user.verify_password(&creds.password).is_ok()))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        let user = query_as::<_, User>(
            "SELECT id, login_name, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
