//! Use-case services orchestrating the ports.
//!
//! Callers are expected to have authenticated the requester already; services take
//! the requester's user id and enforce ownership themselves.

mod account_service;
mod post_service;

pub use account_service::{
    AccountService, AvatarUpload, LoginOutcome, PROFILE_UPDATED_MESSAGE, ProfileUpdate,
    ProfileView, REGISTERED_MESSAGE, RegisterInput,
};
pub use post_service::{PostInput, PostService, PostView};
