use std::sync::Arc;

use quill_core::Paginator;
use quill_core::domain::User;
use quill_core::ports::{MediaStore, PasswordService};
use quill_core::services::{AccountService, PostService, RegisterInput};
use quill_infra::{
    Argon2PasswordService, InMemoryPostRepository, InMemoryProfileRepository,
    InMemoryUserRepository, JwtConfig, JwtTokenService, LocalMediaStore, MediaConfig,
};

pub struct Harness {
    pub accounts: AccountService,
    pub posts: PostService,
    pub media_root: tempfile::TempDir,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(Argon2PasswordService::new()), None)
}

/// Harness with a custom password service and, optionally, a custom media store.
pub fn harness_with(
    passwords: Arc<dyn PasswordService>,
    media: Option<Arc<dyn MediaStore>>,
) -> Harness {
    let media_root = tempfile::tempdir().expect("temp dir");
    let media_config = MediaConfig {
        root: media_root.path().to_path_buf(),
        url_prefix: "/media".to_string(),
        max_avatar_bytes: 1024,
    };

    let users = Arc::new(InMemoryUserRepository::new());
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let post_repo = Arc::new(InMemoryPostRepository::new());

    let media = media.unwrap_or_else(|| Arc::new(LocalMediaStore::new(&media_config)));

    let accounts = AccountService::new(
        users.clone(),
        profiles,
        passwords,
        Arc::new(JwtTokenService::new(JwtConfig {
            secret: "integration-secret".to_string(),
            ..JwtConfig::default()
        })),
        media,
        media_config.max_avatar_bytes,
    );
    let posts = PostService::new(post_repo, users, Paginator::default());

    Harness {
        accounts,
        posts,
        media_root,
    }
}

pub fn registration(username: &str) -> RegisterInput {
    RegisterInput {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password1: "correct-horse-battery".to_string(),
        password2: "correct-horse-battery".to_string(),
    }
}

pub async fn register(h: &Harness, username: &str) -> User {
    h.accounts
        .register(registration(username))
        .await
        .expect("registration succeeds")
}
