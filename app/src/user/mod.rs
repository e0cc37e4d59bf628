//! User accounts: signup, lookups and profile updates. Usernames and emails are unique; the
//! uniqueness is checked up front and enforced again by the store.

use crate::{auth, database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod entities;

pub use entities::{
    Id, Lookup, NewUser, ProfileUpdate, Signup, SignupRequest, UpdateRequest, User,
    DEFAULT_ABOUT, DEFAULT_AVATAR,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("user not found")]
    NotFound,
    #[error("a user with this email or username already exists")]
    AlreadyExists,
    #[error("{0}")]
    Credential(#[from] auth::CredentialError),
    #[error("{0}")]
    Store(#[from] database::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`Error::AlreadyExists`] if the username or email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, Error>;
    async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, database::Error>;
    async fn find_users(&self) -> Result<Vec<User>, database::Error>;
    async fn find_users_by_id(&self, ids: &[Id]) -> Result<Vec<User>, database::Error>;
    /// Finds a user other than `except` holding either the username or the email.
    async fn find_conflicting_user(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Id>,
    ) -> Result<Option<User>, database::Error>;
    /// Returns `None` if the user does not exist.
    async fn update_user(
        &self,
        id: Id,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, Error>;
}

pub async fn signup<S: Store + ?Sized>(store: &S, signup: Signup) -> Result<User, Error> {
    if store
        .find_conflicting_user(Some(&signup.username), Some(&signup.email), None)
        .await?
        .is_some()
    {
        return Err(Error::AlreadyExists);
    }
    let password = auth::PasswordHash::generate(signup.password).await?;
    let user = store
        .insert_user(NewUser {
            password,
            username: signup.username,
            email: signup.email,
            about: signup.about,
            avatar: signup.avatar,
            created: Utc::now(),
        })
        .await?;
    log::info!("user {:?} signed up as {:?}", user.id, user.username);
    Ok(user)
}

pub async fn find_all<S: Store + ?Sized>(store: &S) -> Result<Vec<User>, Error> {
    Ok(store.find_users().await?)
}

pub async fn find_by_id<S: Store + ?Sized>(store: &S, id: Id) -> Result<User, Error> {
    store
        .find_user(Lookup::Id(id))
        .await?
        .ok_or(Error::NotFound)
}

pub async fn find_by_username<S: Store + ?Sized>(store: &S, username: &str) -> Result<User, Error> {
    store
        .find_user(Lookup::Username(username))
        .await?
        .ok_or(Error::NotFound)
}

pub async fn update<S: Store + ?Sized>(
    store: &S,
    id: Id,
    update: ProfileUpdate,
) -> Result<User, Error> {
    find_by_id(store, id).await?;
    if store
        .find_conflicting_user(update.username.as_deref(), update.email.as_deref(), Some(id))
        .await?
        .is_some()
    {
        return Err(Error::AlreadyExists);
    }
    store
        .update_user(id, &update, Utc::now())
        .await?
        .ok_or(Error::NotFound)
}

pub(crate) mod queries {
    use super::{Error, Id, Lookup, NewUser, ProfileUpdate, Store, User};
    use crate::database::{self, Database};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use const_format::formatcp;

    const COLUMNS: &str = "id, username, email, about, avatar, created, updated";

    #[async_trait]
    impl Store for Database {
        async fn insert_user(&self, user: NewUser) -> Result<User, Error> {
            sqlx::query_as::<_, UserRow>(formatcp!(
                r#"INSERT INTO users (username, email, password, about, avatar, created, updated)
                    VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {}"#,
                COLUMNS
            ))
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(&user.about)
            .bind(&user.avatar)
            .bind(user.created)
            .fetch_one(self)
            .await
            .map(UserRow::into_entity)
            .map_err(unique_violation_as_conflict)
        }

        async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, database::Error> {
            let row = match lookup {
                Lookup::Id(id) => return Ok(by_id(self, id).await?),
                Lookup::Username(username) => {
                    sqlx::query_as::<_, UserRow>(formatcp!(
                        "SELECT {} FROM users WHERE username = $1",
                        COLUMNS
                    ))
                    .bind(username)
                    .fetch_optional(self)
                    .await?
                }
            };
            Ok(row.map(UserRow::into_entity))
        }

        async fn find_users(&self) -> Result<Vec<User>, database::Error> {
            Ok(
                sqlx::query_as::<_, UserRow>(formatcp!("SELECT {} FROM users ORDER BY id", COLUMNS))
                    .fetch_all(self)
                    .await?
                    .into_iter()
                    .map(UserRow::into_entity)
                    .collect(),
            )
        }

        async fn find_users_by_id(&self, ids: &[Id]) -> Result<Vec<User>, database::Error> {
            let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
            Ok(sqlx::query_as::<_, UserRow>(formatcp!(
                "SELECT {} FROM users WHERE id = ANY($1) ORDER BY id",
                COLUMNS
            ))
            .bind(ids)
            .fetch_all(self)
            .await?
            .into_iter()
            .map(UserRow::into_entity)
            .collect())
        }

        async fn find_conflicting_user(
            &self,
            username: Option<&str>,
            email: Option<&str>,
            except: Option<Id>,
        ) -> Result<Option<User>, database::Error> {
            if username.is_none() && email.is_none() {
                return Ok(None);
            }
            Ok(sqlx::query_as::<_, UserRow>(formatcp!(
                r#"SELECT {} FROM users WHERE (username = $1 OR email = $2)
                    AND ($3::BIGINT IS NULL OR id <> $3) LIMIT 1"#,
                COLUMNS
            ))
            .bind(username)
            .bind(email)
            .bind(except.map(|id| id.0))
            .fetch_optional(self)
            .await?
            .map(UserRow::into_entity))
        }

        async fn update_user(
            &self,
            id: Id,
            update: &ProfileUpdate,
            now: DateTime<Utc>,
        ) -> Result<Option<User>, Error> {
            sqlx::query_as::<_, UserRow>(formatcp!(
                r#"UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email),
                    about = COALESCE($4, about), avatar = COALESCE($5, avatar), updated = $6
                    WHERE id = $1 RETURNING {}"#,
                COLUMNS
            ))
            .bind(id.0)
            .bind(update.username.as_deref())
            .bind(update.email.as_deref())
            .bind(update.about.as_deref())
            .bind(update.avatar.as_deref())
            .bind(now)
            .fetch_optional(self)
            .await
            .map(|row| row.map(UserRow::into_entity))
            .map_err(unique_violation_as_conflict)
        }
    }

    pub(crate) async fn by_id<'e, E>(executor: E, id: Id) -> Result<Option<User>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_as::<_, UserRow>(formatcp!("SELECT {} FROM users WHERE id = $1", COLUMNS))
            .bind(id.0)
            .fetch_optional(executor)
            .await
            .map(|row| row.map(UserRow::into_entity))
    }

    fn unique_violation_as_conflict(e: sqlx::Error) -> Error {
        if database::is_unique_violation(&e) {
            Error::AlreadyExists
        } else {
            Error::Store(e.into())
        }
    }

    #[derive(sqlx::FromRow, Debug)]
    struct UserRow {
        id: i64,
        username: String,
        email: String,
        about: String,
        avatar: String,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
    }

    impl UserRow {
        fn into_entity(self) -> User {
            User {
                id: Id(self.id),
                username: self.username,
                email: self.email,
                about: self.about,
                avatar: self.avatar,
                created: self.created,
                updated: self.updated,
            }
        }
    }
}
