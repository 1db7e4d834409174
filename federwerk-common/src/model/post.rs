use crate::model::Id;
use crate::model::user::{MESSAGE_FIELD_REQUIRED, Username};
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A published post. `username` is the author's name as it was at creation
/// time; posts are never edited or deleted.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub username: Username,
    pub title: String,
    pub body: String,
}

/// Payload for inserting a new post. Construction rejects empty title or
/// body, so the storage layer never sees a blank post.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    username: Username,
    title: String,
    body: String,
}

/// Per-field violations for post creation, accumulated like signup errors.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct PostFieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'static str>,
}

impl CreatePost {
    pub fn new(username: Username, title: &str, body: &str) -> Result<Self, PostFieldErrors> {
        let mut errors = PostFieldErrors::default();

        let title = title.trim();
        if title.is_empty() {
            errors.title = Some(MESSAGE_FIELD_REQUIRED);
        }

        let body = body.trim();
        if body.is_empty() {
            errors.body = Some(MESSAGE_FIELD_REQUIRED);
        }

        if errors.title.is_some() || errors.body.is_some() {
            return Err(errors);
        }

        Ok(Self {
            username,
            title: title.to_owned(),
            body: body.to_owned(),
        })
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}
