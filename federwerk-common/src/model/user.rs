use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const MESSAGE_FIELD_REQUIRED: &str = "This field must not be empty";
pub const MESSAGE_EMAIL_INVALID: &str = "Enter a valid email address";
pub const MESSAGE_USERNAME_TAKEN: &str = "This username is already taken";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub email: Email,
}

/// Payload for inserting a new user. The password arrives already hashed;
/// plaintext never reaches the storage layer.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub password_hash: String,
    pub email: Email,
}

/// Non-empty username, trimmed at construction. Uniqueness across users is
/// the storage layer's concern.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0:?}")]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            Err(InvalidUsernameError(username))
        } else {
            Ok(Username(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

/// Email address, trimmed at construction and checked against a small
/// grammar: one `@`, a non-empty local part, a dotted domain, no whitespace.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0:?}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let trimmed = email.trim();
        if valid_address_grammar(trimmed) {
            Ok(Email(trimmed.to_owned()))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

fn valid_address_grammar(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.contains('@')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Raw signup form fields, exactly as submitted.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct SignupFields {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Trimmed, grammar-checked signup data ready for hashing and insertion.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidatedSignup {
    pub username: Username,
    pub password: String,
    pub email: Email,
}

/// Per-field signup violations. Validation accumulates every violation so
/// the caller can report all of them at once.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct SignupErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'static str>,
}

impl SignupErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.email.is_none()
    }
}

impl SignupFields {
    pub fn validate(&self) -> Result<ValidatedSignup, SignupErrors> {
        let mut errors = SignupErrors::default();

        let username = match Username::new(self.username.clone()) {
            Ok(username) => Some(username),
            Err(_) => {
                errors.username = Some(MESSAGE_FIELD_REQUIRED);
                None
            }
        };

        let password = self.password.trim();
        if password.is_empty() {
            errors.password = Some(MESSAGE_FIELD_REQUIRED);
        }

        let email = if self.email.trim().is_empty() {
            errors.email = Some(MESSAGE_FIELD_REQUIRED);
            None
        } else {
            match Email::new(self.email.clone()) {
                Ok(email) => Some(email),
                Err(_) => {
                    errors.email = Some(MESSAGE_EMAIL_INVALID);
                    None
                }
            }
        };

        match (username, email, errors.is_empty()) {
            (Some(username), Some(email), true) => Ok(ValidatedSignup {
                username,
                password: password.to_owned(),
                email,
            }),
            _ => Err(errors),
        }
    }
}
