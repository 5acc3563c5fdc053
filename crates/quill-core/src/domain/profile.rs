use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile entity - one-to-one extension of a [`super::User`] holding the avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    /// Avatar path relative to the media root.
    pub image: String,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Avatar every new account starts with.
    pub const DEFAULT_IMAGE: &'static str = "default.jpg";

    /// Directory (under the media root) uploaded avatars are stored in.
    pub const IMAGE_DIR: &'static str = "profile_pics";

    /// Create the default profile for a freshly registered user.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            image: Self::DEFAULT_IMAGE.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_default_image(&self) -> bool {
        self.image == Self::DEFAULT_IMAGE
    }
}
