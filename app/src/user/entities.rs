use crate::auth::PasswordHash;
use crate::validation::{self, ValidationError};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use validator::Validate;

pub const DEFAULT_ABOUT: &str = "Nothing here yet.";
pub const DEFAULT_AVATAR: &str = "https://i.pravatar.cc/300";

/// Taken by the `/users/me` routes, so nobody may register it.
const RESERVED_USERNAMES: &[&str] = &["me"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub about: String,
    pub avatar: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// How a single user is looked up.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Id(Id),
    Username(&'a str),
}

/// A user about to be stored. The password is already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub about: String,
    pub avatar: String,
    pub password: PasswordHash,
    pub created: DateTime<Utc>,
}

/// Raw signup input.
#[derive(Debug, Clone, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 64, message = "must be between 1 and 64 characters long"),
        custom = "username_rules"
    )]
    pub username: String,
    #[validate(email(message = "must be an email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "must be between 6 and 128 characters long"))]
    pub password: String,
    #[validate(length(max = 200, message = "must be at most 200 characters long"))]
    pub about: Option<String>,
    #[validate(url(message = "must be a URL"))]
    pub avatar: Option<String>,
}

/// Signup input that passed validation.
#[derive(Debug, Clone)]
pub struct Signup {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) about: String,
    pub(crate) avatar: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<Signup, ValidationError> {
        validation::check(&self)?;
        Ok(Signup {
            username: self.username,
            email: self.email,
            password: self.password,
            about: self.about.unwrap_or_else(|| DEFAULT_ABOUT.to_owned()),
            avatar: self.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_owned()),
        })
    }
}

/// Raw profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateRequest {
    #[validate(
        length(min = 1, max = 64, message = "must be between 1 and 64 characters long"),
        custom = "username_rules"
    )]
    pub username: Option<String>,
    #[validate(email(message = "must be an email address"))]
    pub email: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters long"))]
    pub about: Option<String>,
    #[validate(url(message = "must be a URL"))]
    pub avatar: Option<String>,
}

/// Profile update that passed validation.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub(crate) username: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) about: Option<String>,
    pub(crate) avatar: Option<String>,
}

impl UpdateRequest {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationError> {
        validation::check(&self)?;
        Ok(ProfileUpdate {
            username: self.username,
            email: self.email,
            about: self.about,
            avatar: self.avatar,
        })
    }
}

impl ProfileUpdate {
    pub(crate) fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(ref username) = self.username {
            user.username = username.clone();
        }
        if let Some(ref email) = self.email {
            user.email = email.clone();
        }
        if let Some(ref about) = self.about {
            user.about = about.clone();
        }
        if let Some(ref avatar) = self.avatar {
            user.avatar = avatar.clone();
        }
        user.updated = now;
    }
}

fn username_rules(username: &str) -> Result<(), validator::ValidationError> {
    let message = if username.chars().any(|c| c.is_whitespace() || c == '/') {
        "must not contain whitespace or slashes"
    } else if RESERVED_USERNAMES.contains(&username) {
        "is reserved"
    } else {
        return Ok(());
    };
    let mut error = validator::ValidationError::new("username");
    error.message = Some(Cow::from(message));
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn base_request() -> SignupRequest {
        SignupRequest {
            username: "alice".to_owned(),
            email: "alice@example.com".to_owned(),
            password: "correct horse".to_owned(),
            about: None,
            avatar: None,
        }
    }

    #[fixture]
    fn request() -> SignupRequest {
        base_request()
    }

    #[rstest]
    fn signup_fills_defaults(request: SignupRequest) {
        let signup = request.validate().unwrap();
        assert_eq!(signup.about, DEFAULT_ABOUT);
        assert_eq!(signup.avatar, DEFAULT_AVATAR);
    }

    #[rstest]
    #[case::empty_username(SignupRequest { username: String::new(), ..base_request() }, "username")]
    #[case::reserved(SignupRequest { username: "me".to_owned(), ..base_request() }, "username")]
    #[case::spaces(SignupRequest { username: "a b".to_owned(), ..base_request() }, "username")]
    #[case::email(SignupRequest { email: "alice".to_owned(), ..base_request() }, "email")]
    #[case::password(SignupRequest { password: "short".to_owned(), ..base_request() }, "password")]
    #[case::about(SignupRequest { about: Some("x".repeat(201)), ..base_request() }, "about")]
    #[case::long_username(SignupRequest { username: "u".repeat(65), ..base_request() }, "username")]
    #[case::slash(SignupRequest { username: "a/b".to_owned(), ..base_request() }, "username")]
    #[case::avatar(SignupRequest { avatar: Some("avatar.png".to_owned()), ..base_request() }, "avatar")]
    fn signup_rejects_bad_fields(#[case] request: SignupRequest, #[case] field: &str) {
        assert_eq!(request.validate().unwrap_err().field, field);
    }

    #[test]
    fn update_only_checks_present_fields() {
        let update = UpdateRequest {
            about: Some("Collects board games".to_owned()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(update.username, None);

        let error = UpdateRequest {
            email: Some("nope".to_owned()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(error.field, "email");

        let error = UpdateRequest {
            username: Some("me".to_owned()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(error.to_string(), "username: is reserved");
    }
}
