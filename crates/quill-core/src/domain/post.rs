use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a blog entry owned by a single author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub date_posted: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(author_id: Uuid, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            content,
            date_posted: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` is the author of this post.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Canonical API location of this post.
    pub fn absolute_url(&self) -> String {
        format!("/api/posts/{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership() {
        let author = Uuid::new_v4();
        let post = Post::new(author, "Title".into(), "Body".into());

        assert!(post.is_owned_by(author));
        assert!(!post.is_owned_by(Uuid::new_v4()));
        assert_eq!(post.date_posted, post.updated_at);
        assert_eq!(post.absolute_url(), format!("/api/posts/{}", post.id));
    }
}
