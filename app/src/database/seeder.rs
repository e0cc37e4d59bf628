use super::Repository;
use crate::validation::ValidationError;
use crate::{user, wish};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{0}")]
    User(#[from] user::Error),
    #[error("{0}")]
    Wish(#[from] wish::Error),
    #[error("{0}")]
    Invalid(#[from] ValidationError),
}

/// Creates two test users, `test-1` and `test-2` (the password equals the username), and a
/// wish owned by `test-1`. Safe to run repeatedly.
pub async fn seed_development_data<S: Repository + ?Sized>(store: &S) -> Result<(), SeedError> {
    let owner = seed_test_user(store, 1).await?;
    seed_test_user(store, 2).await?;
    if wish::find_by_owner(store, owner.id).await?.is_empty() {
        let draft = wish::WishRequest {
            name: "Mechanical keyboard".to_owned(),
            link: "https://example.com/keyboard".to_owned(),
            image: "https://example.com/keyboard.png".to_owned(),
            price: "120.00".to_owned(),
            description: "Tactile switches, full size.".to_owned(),
        }
        .validate()?;
        wish::create(store, owner.id, draft).await?;
    }
    log::info!("development data seeded");
    Ok(())
}

async fn seed_test_user<S: Repository + ?Sized>(
    store: &S,
    index: u32,
) -> Result<user::User, SeedError> {
    let username = format!("test-{}", index);
    match user::find_by_username(store, &username).await {
        Ok(user) => return Ok(user),
        Err(user::Error::NotFound) => {}
        Err(e) => return Err(e.into()),
    }
    let signup = user::SignupRequest {
        email: format!("{}@user.net", username),
        password: username.clone(),
        username,
        about: None,
        avatar: None,
    }
    .validate()?;
    Ok(user::signup(store, signup).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth, database::Memory};

    #[tokio::test]
    async fn seeding_twice_changes_nothing() {
        let store = Memory::default();
        seed_development_data(&store).await.unwrap();
        seed_development_data(&store).await.unwrap();

        assert_eq!(user::find_all(&store).await.unwrap().len(), 2);
        assert_eq!(wish::find_all(&store).await.unwrap().len(), 1);
        assert!(auth::signin(&store, "test-2", "test-2").await.is_ok());
    }
}
