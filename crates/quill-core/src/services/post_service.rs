//! Post use cases: paginated listings, detail, and owner-only edits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::Post;
use crate::error::{DomainError, RepoError};
use crate::pagination::{Page, Paginator};
use crate::ports::{PostRepository, UserRepository};
use crate::validation::{self, ValidationErrors};

/// Submitted post fields. The author never comes from the client.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

impl PostInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::validate_post(&mut errors, &self.title, &self.content);
        errors.into_result()
    }
}

/// A post together with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    paginator: Paginator,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            users,
            paginator,
        }
    }

    /// Every post, newest first.
    pub async fn list(&self, page: Option<&str>) -> Result<Page<PostView>, DomainError> {
        self.list_for(None, page).await
    }

    /// Posts by `username`, newest first.
    pub async fn list_by_author(
        &self,
        username: &str,
        page: Option<&str>,
    ) -> Result<Page<PostView>, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;

        let page = self.list_for(Some(author.id), page).await?;
        Ok(page.map(|mut view| {
            view.author.clone_from(&author.username);
            view
        }))
    }

    async fn list_for(
        &self,
        author_id: Option<Uuid>,
        page: Option<&str>,
    ) -> Result<Page<PostView>, DomainError> {
        let total = self.posts.count(author_id).await?;
        let request = self.paginator.resolve(page, total).map_err(|e| {
            tracing::debug!(error = %e, "Rejected page request");
            DomainError::not_found("page", page.unwrap_or_default())
        })?;

        let posts = self
            .posts
            .list_recent(author_id, request.offset(), request.limit())
            .await?;
        let views = self.attach_authors(posts).await?;

        Ok(Page::new(views, request))
    }

    pub async fn get(&self, id: Uuid) -> Result<PostView, DomainError> {
        let post = self.find(id).await?;
        let mut views = self.attach_authors(vec![post]).await?;
        views
            .pop()
            .ok_or_else(|| DomainError::Internal("post vanished during lookup".to_string()))
    }

    pub async fn create(&self, author_id: Uuid, input: PostInput) -> Result<PostView, DomainError> {
        input.validate()?;

        let post = Post::new(author_id, input.title, input.content);
        let saved = self.posts.insert(post).await?;
        tracing::info!(post_id = %saved.id, author_id = %author_id, "Post created");

        self.get(saved.id).await
    }

    /// Replace title and content of a post the requester owns.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: PostInput,
    ) -> Result<PostView, DomainError> {
        let mut post = self.find_owned(user_id, id).await?;
        input.validate()?;

        post.title = input.title;
        post.content = input.content;
        post.author_id = user_id;
        post.updated_at = Utc::now();

        let saved = self.posts.update(post).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::not_found("post", id),
            other => other.into(),
        })?;
        tracing::info!(post_id = %saved.id, "Post updated");

        self.get(saved.id).await
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.find_owned(user_id, id).await?;

        self.posts.delete(id).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::not_found("post", id),
            other => other.into(),
        })?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> Result<Post, DomainError> {
        let post = self.find(id).await?;
        if !post.is_owned_by(user_id) {
            tracing::warn!(post_id = %id, user_id = %user_id, "Rejected edit by non-author");
            return Err(DomainError::Forbidden);
        }
        Ok(post)
    }

    async fn attach_authors(&self, posts: Vec<Post>) -> Result<Vec<PostView>, DomainError> {
        let mut ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let names: HashMap<Uuid, String> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| {
                let author = names.get(&post.author_id).cloned().unwrap_or_else(|| {
                    tracing::warn!(post_id = %post.id, "Post author is missing");
                    String::new()
                });
                PostView { post, author }
            })
            .collect())
    }
}
