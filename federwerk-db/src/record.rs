use federwerk_common::model::ModelValidationError;
use federwerk_common::model::post::Post;
use federwerk_common::model::user::{Email, User, Username};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: i64,
    pub username: String,
    pub title: String,
    pub body: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
            email: Email::new(value.email)?,
        })
    }
}

impl CredentialsRecord {
    /// Splits the row into the public user and the stored password hash.
    pub(crate) fn into_user_and_hash(self) -> Result<(User, String), ModelValidationError> {
        let user = User {
            id: self.id.into(),
            username: Username::new(self.username)?,
            email: Email::new(self.email)?,
        };

        Ok((user, self.password_hash))
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
            title: value.title,
            body: value.body,
        })
    }
}
