//! Account use cases: registration, login and the profile page.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Profile, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{MediaStore, PasswordService, ProfileRepository, TokenService, UserRepository};
use crate::validation::{self, AvatarImage, ValidationErrors};

pub const REGISTERED_MESSAGE: &str = "Your account has been created. You are now able to log in.";
pub const PROFILE_UPDATED_MESSAGE: &str = "Your account has been updated!";

const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Base64 image payload as submitted by the client.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub content_type: String,
    pub data: String,
}

/// Combined user and profile forms.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image: Option<AvatarUpload>,
}

/// What the profile page shows.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: User,
    pub profile: Profile,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    media: Arc<dyn MediaStore>,
    max_avatar_bytes: usize,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        media: Arc<dyn MediaStore>,
        max_avatar_bytes: usize,
    ) -> Self {
        Self {
            users,
            profiles,
            passwords,
            tokens,
            media,
            max_avatar_bytes,
        }
    }

    /// Create an account and its default profile. Does not log the user in.
    pub async fn register(&self, input: RegisterInput) -> Result<User, DomainError> {
        let mut errors = ValidationErrors::new();
        validation::validate_username(&mut errors, &input.username);
        validation::validate_email(&mut errors, &input.email);
        validation::validate_new_password(
            &mut errors,
            &input.username,
            &input.password1,
            &input.password2,
        );
        if !errors.has("username") && self.users.username_taken(&input.username, None).await? {
            errors.add("username", USERNAME_TAKEN);
        }
        errors.into_result()?;

        let password_hash = self.passwords.hash(&input.password1).await?;
        // A concurrent registration can claim the name while the password hashes.
        let user = self
            .users
            .insert(User::new(input.username, input.email, password_hash))
            .await
            .map_err(username_conflict)?;

        if let Err(e) = self.profiles.insert(Profile::new(user.id)).await {
            tracing::error!(user_id = %user.id, error = %e, "Profile creation failed, rolling back user");
            if let Err(cleanup) = self.users.delete(user.id).await {
                tracing::error!(user_id = %user.id, error = %cleanup, "User rollback failed");
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, DomainError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            // Spend the same hashing time as a real check so unknown usernames don't stand out.
            let _ = self.passwords.hash(password).await;
            return Err(DomainError::Unauthorized);
        };

        if !self.passwords.verify(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(DomainError::Unauthorized);
        }

        let access_token = self.tokens.generate_token(user.id, &user.username)?;

        Ok(LoginOutcome {
            user,
            access_token,
            expires_in: self.tokens.expiration_seconds(),
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileView, DomainError> {
        let user = self.find_user(user_id).await?;
        let profile = self.profile_for(user_id).await?;
        Ok(self.view(user, profile))
    }

    /// Apply the user and profile forms together: nothing is saved unless both validate.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<ProfileView, DomainError> {
        let mut user = self.find_user(user_id).await?;
        let mut profile = self.profile_for(user_id).await?;

        let mut errors = ValidationErrors::new();
        validation::validate_username(&mut errors, &update.username);
        validation::validate_email(&mut errors, &update.email);
        if !errors.has("username")
            && self
                .users
                .username_taken(&update.username, Some(user_id))
                .await?
        {
            errors.add("username", USERNAME_TAKEN);
        }

        let avatar = match &update.image {
            Some(upload) => match validation::decode_avatar(
                &upload.content_type,
                &upload.data,
                self.max_avatar_bytes,
            ) {
                Ok(image) => Some(image),
                Err(image_errors) => {
                    errors.merge(image_errors);
                    None
                }
            },
            None => None,
        };
        errors.into_result()?;

        // The file goes first so a storage failure leaves both rows untouched.
        let stored = match avatar {
            Some(image) => Some(self.store_avatar(user_id, image).await?),
            None => None,
        };

        user.username = update.username;
        user.email = update.email;
        user.updated_at = Utc::now();
        let user = match self.users.update(user).await {
            Ok(user) => user,
            Err(e) => {
                self.discard(stored.as_deref()).await;
                return Err(match e {
                    RepoError::NotFound => DomainError::not_found("user", user_id),
                    other => username_conflict(other),
                });
            }
        };

        if let Some(stored) = stored {
            profile = self.swap_avatar(profile, stored).await?;
        }

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(self.view(user, profile))
    }

    async fn store_avatar(&self, user_id: Uuid, image: AvatarImage) -> Result<String, DomainError> {
        let name = format!(
            "{}_{}.{}",
            user_id.simple(),
            &Uuid::new_v4().simple().to_string()[..8],
            image.extension
        );
        Ok(self
            .media
            .save(Profile::IMAGE_DIR, &name, &image.bytes)
            .await?)
    }

    /// Point the profile at `stored`, then drop the previous file unless it is the default.
    async fn swap_avatar(&self, mut profile: Profile, stored: String) -> Result<Profile, DomainError> {
        let previous = std::mem::replace(&mut profile.image, stored.clone());
        profile.updated_at = Utc::now();

        let profile = match self.profiles.update(profile).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard(Some(&stored)).await;
                return Err(e.into());
            }
        };

        if previous != Profile::DEFAULT_IMAGE {
            if let Err(e) = self.media.delete(&previous).await {
                tracing::warn!(path = %previous, error = %e, "Could not remove old avatar");
            }
        }

        Ok(profile)
    }

    async fn discard(&self, stored: Option<&str>) {
        let Some(path) = stored else { return };
        if let Err(e) = self.media.delete(path).await {
            tracing::warn!(path = %path, error = %e, "Orphaned avatar left behind");
        }
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))
    }

    /// Accounts always have a profile; recreate the default one if it went missing.
    async fn profile_for(&self, user_id: Uuid) -> Result<Profile, DomainError> {
        match self.profiles.find_by_id(user_id).await? {
            Some(profile) => Ok(profile),
            None => {
                tracing::warn!(user_id = %user_id, "Profile missing, creating default");
                Ok(self.profiles.insert(Profile::new(user_id)).await?)
            }
        }
    }

    fn view(&self, user: User, profile: Profile) -> ProfileView {
        let image_url = self.media.url(&profile.image);
        ProfileView {
            user,
            profile,
            image_url,
        }
    }
}

/// A unique-index violation on users means the username was taken meanwhile.
fn username_conflict(err: RepoError) -> DomainError {
    match err {
        RepoError::Constraint(_) => {
            let mut errors = ValidationErrors::new();
            errors.add("username", USERNAME_TAKEN);
            DomainError::Validation(errors)
        }
        other => other.into(),
    }
}
