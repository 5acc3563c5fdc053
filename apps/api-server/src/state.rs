//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::Paginator;
use quill_core::ports::{
    MediaStore, PasswordService, PostRepository, ProfileRepository, TokenService, UserRepository,
};
use quill_core::services::{AccountService, PostService};
use quill_infra::{
    Argon2PasswordService, InMemoryPostRepository, InMemoryProfileRepository,
    InMemoryUserRepository, JwtTokenService, LocalMediaStore,
};

#[cfg(feature = "rate-limit")]
use quill_core::ports::RateLimiter;
#[cfg(feature = "rate-limit")]
use quill_infra::InMemoryRateLimiter;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub posts: Arc<PostService>,
    pub tokens: Arc<dyn TokenService>,
    #[cfg(feature = "rate-limit")]
    pub auth_limiter: Arc<dyn RateLimiter>,
    #[cfg(feature = "rate-limit")]
    pub trust_proxy: bool,
}

/// Repository set backing the services.
struct Repositories {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    posts: Arc<dyn PostRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            profiles: Arc::new(InMemoryProfileRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
        }
    }

    #[cfg(feature = "postgres")]
    async fn postgres(config: &AppConfig) -> Option<Self> {
        use quill_infra::database::{
            PostgresPostRepository, PostgresProfileRepository, PostgresUserRepository,
        };

        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return None;
        };

        let conn = match quill_infra::connect(db_config).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                return None;
            }
        };

        if config.run_migrations {
            use migration::MigratorTrait;

            if let Err(e) = migration::Migrator::up(&conn, None).await {
                tracing::error!("Migrations failed: {}. Using in-memory fallback.", e);
                return None;
            }
            tracing::info!("Database migrations applied");
        }

        Some(Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn)),
        })
    }
}

impl AppState {
    /// Build the application state, preferring PostgreSQL when configured.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let repos = match Repositories::postgres(config).await {
            Some(repos) => repos,
            None => Repositories::in_memory(),
        };

        #[cfg(not(feature = "postgres"))]
        let repos = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            Repositories::in_memory()
        };

        let state = Self::assemble(config, repos);
        tracing::info!("Application state initialized");
        state
    }

    /// State over fresh in-memory repositories.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::assemble(config, Repositories::in_memory())
    }

    fn assemble(config: &AppConfig, repos: Repositories) -> Self {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&config.media));

        let accounts = AccountService::new(
            repos.users.clone(),
            repos.profiles,
            passwords,
            tokens.clone(),
            media,
            config.media.max_avatar_bytes,
        );
        let posts = PostService::new(
            repos.posts,
            repos.users,
            Paginator::new(config.posts_per_page),
        );

        Self {
            accounts: Arc::new(accounts),
            posts: Arc::new(posts),
            tokens,
            #[cfg(feature = "rate-limit")]
            auth_limiter: Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone())),
            #[cfg(feature = "rate-limit")]
            trust_proxy: config.trust_proxy,
        }
    }
}
