//! In-memory repositories - used when no database is configured, and in tests.
//!
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Post, Profile, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, ProfileRepository, UserRepository};

/// Keyed map behind an async lock, shared by the three repositories.
struct Table<T> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn insert(&self, id: Uuid, row: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, row: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(slot) => {
                *slot = row.clone();
                Ok(row)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

/// Mirrors the unique index on `LOWER(users.username)`. Callers hold the write guard.
fn ensure_username_free(rows: &HashMap<Uuid, User>, user: &User) -> Result<(), RepoError> {
    let wanted = user.username.to_lowercase();
    let taken = rows
        .values()
        .any(|u| u.id != user.id && u.username.to_lowercase() == wanted);
    if taken {
        return Err(RepoError::Constraint(format!(
            "username {} already exists",
            user.username
        )));
    }
    Ok(())
}

pub struct InMemoryUserRepository {
    table: Table<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut rows = self.table.rows.write().await;
        if rows.contains_key(&user.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        ensure_username_free(&rows, &user)?;
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut rows = self.table.rows.write().await;
        ensure_username_free(&rows, &user)?;
        match rows.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.table.delete(id).await
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let rows = self.table.rows.read().await;
        Ok(rows.values().find(|u| u.username == username).cloned())
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        let wanted = username.to_lowercase();
        let rows = self.table.rows.read().await;
        Ok(rows
            .values()
            .any(|u| Some(u.id) != except && u.username.to_lowercase() == wanted))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let rows = self.table.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

pub struct InMemoryProfileRepository {
    table: Table<Profile>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Profile, Uuid> for InMemoryProfileRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        Ok(self.table.get(user_id).await)
    }

    async fn insert(&self, profile: Profile) -> Result<Profile, RepoError> {
        self.table.insert(profile.user_id, profile).await
    }

    async fn update(&self, profile: Profile) -> Result<Profile, RepoError> {
        self.table.update(profile.user_id, profile).await
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.table.delete(user_id).await
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {}

pub struct InMemoryPostRepository {
    table: Table<Post>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryPostRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.table.get(id).await)
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        self.table.insert(post.id, post).await
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        self.table.update(post.id, post).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.table.delete(id).await
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, author_id: Option<Uuid>) -> Result<u64, RepoError> {
        let rows = self.table.rows.read().await;
        let count = rows
            .values()
            .filter(|p| author_id.is_none_or(|a| p.author_id == a))
            .count();
        Ok(count as u64)
    }

    async fn list_recent(
        &self,
        author_id: Option<Uuid>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let rows = self.table.rows.read().await;
        let mut posts: Vec<Post> = rows
            .values()
            .filter(|p| author_id.is_none_or(|a| p.author_id == a))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.date_posted
                .cmp(&a.date_posted)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
