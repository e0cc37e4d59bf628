use crate::database;
use async_trait::async_trait;
use thiserror::Error;

mod entities;

pub use entities::{
    AccessDenied, CredentialError, Credentials, Grant, IssuedToken, PasswordHash, Token, TokenHash,
    TokenId,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    AccessDenied(#[from] AccessDenied),
    #[error("{0}")]
    Credential(#[from] CredentialError),
    #[error("{0}")]
    Store(#[from] database::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_credentials(&self, username: &str)
        -> Result<Option<Credentials>, database::Error>;
    async fn insert_token(&self, token: &Token, hash: &TokenHash) -> Result<(), database::Error>;
    async fn find_token(&self, hash: &TokenHash) -> Result<Option<Token>, database::Error>;
}

/// Checks the password and issues a new token. Unknown users and wrong passwords are
/// indistinguishable to the caller.
pub async fn signin<S: Store + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<IssuedToken, Error> {
    let credentials = store
        .find_credentials(username)
        .await?
        .ok_or(AccessDenied)?;
    if !credentials.password.verify(password).await? {
        log::info!("failed sign-in for {:?}", username);
        return Err(AccessDenied.into());
    }
    let issued = IssuedToken::generate(credentials.user_id);
    store.insert_token(&issued.token, &issued.hash).await?;
    log::info!("issued token {:?} to user {:?}", issued.token.id, issued.token.user_id);
    Ok(issued)
}

pub async fn get_grant<S: Store + ?Sized>(store: &S, token: &str) -> Result<Grant, Error> {
    Ok(store
        .find_token(&TokenHash::generate(token))
        .await?
        .ok_or(AccessDenied)?
        .grant()?)
}

pub(crate) mod queries {
    use super::{Credentials, PasswordHash, Store, Token, TokenHash, TokenId};
    use crate::database::{self, Database};
    use crate::user;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    #[async_trait]
    impl Store for Database {
        async fn find_credentials(
            &self,
            username: &str,
        ) -> Result<Option<Credentials>, database::Error> {
            Ok(sqlx::query_as::<_, CredentialsRow>(
                "SELECT id, password FROM users WHERE username = $1",
            )
            .bind(username)
            .fetch_optional(self)
            .await?
            .map(|row| Credentials {
                user_id: user::Id(row.id),
                password: PasswordHash::from_stored(row.password),
            }))
        }

        async fn insert_token(
            &self,
            token: &Token,
            hash: &TokenHash,
        ) -> Result<(), database::Error> {
            sqlx::query(
                r#"INSERT INTO auth_tokens (id, user_id, token_hash, created, disabled)
                    VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(token.id.0)
            .bind(token.user_id.0)
            .bind(hash.as_str())
            .bind(token.created)
            .bind(token.disabled)
            .execute(self)
            .await?;
            Ok(())
        }

        async fn find_token(&self, hash: &TokenHash) -> Result<Option<Token>, database::Error> {
            Ok(sqlx::query_as::<_, TokenRow>(
                "SELECT id, user_id, created, disabled FROM auth_tokens WHERE token_hash = $1",
            )
            .bind(hash.as_str())
            .fetch_optional(self)
            .await?
            .map(|row| row.into_entity()))
        }
    }

    #[derive(Debug, sqlx::FromRow)]
    struct CredentialsRow {
        id: i64,
        password: String,
    }

    #[derive(Debug, sqlx::FromRow)]
    struct TokenRow {
        id: Uuid,
        user_id: i64,
        created: DateTime<Utc>,
        disabled: Option<DateTime<Utc>>,
    }

    impl TokenRow {
        fn into_entity(self) -> Token {
            Token {
                id: TokenId(self.id),
                user_id: user::Id(self.user_id),
                created: self.created,
                disabled: self.disabled,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Memory;
    use crate::user;

    async fn store_with_alice() -> (Memory, user::User) {
        let store = Memory::default();
        let signup = user::SignupRequest {
            username: "alice".to_owned(),
            email: "alice@example.com".to_owned(),
            password: "wonderland".to_owned(),
            about: None,
            avatar: None,
        }
        .validate()
        .unwrap();
        let alice = user::signup(&store, signup).await.unwrap();
        (store, alice)
    }

    #[tokio::test]
    async fn signin_issues_a_token_that_resolves_to_the_user() {
        let (store, alice) = store_with_alice().await;
        let issued = signin(&store, "alice", "wonderland").await.unwrap();

        let grant = get_grant(&store, &issued.plain).await.unwrap();
        assert_eq!(grant.user_id, alice.id);
        assert_eq!(grant.token_id, issued.token.id);
    }

    #[tokio::test]
    async fn signin_rejects_wrong_password_and_unknown_user() {
        let (store, _) = store_with_alice().await;
        assert!(matches!(
            signin(&store, "alice", "looking-glass").await,
            Err(Error::AccessDenied(_))
        ));
        assert!(matches!(
            signin(&store, "bob", "wonderland").await,
            Err(Error::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn unknown_token_is_denied() {
        let (store, _) = store_with_alice().await;
        assert!(matches!(
            get_grant(&store, "made-up").await,
            Err(Error::AccessDenied(_))
        ));
    }
}
