//! SeaORM entities mirroring the `users`, `profiles` and `posts` tables.

pub mod post;
pub mod profile;
pub mod user;
