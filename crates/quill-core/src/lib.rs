//! # Quill Core
//!
//! The domain layer of the Quill blog backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, the ports infrastructure must implement, pagination, form-style
//! validation and the use-case services built on top of them.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod services;
pub mod validation;

pub use error::DomainError;
pub use pagination::{Page, PageRequest, Paginator};
pub use validation::ValidationErrors;
