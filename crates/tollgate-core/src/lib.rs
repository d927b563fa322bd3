//! Core types and utilities for tollgate.
//!
//! This crate provides the foundational types used throughout the tollgate service:
//!
//! - **Identifiers**: Strongly-typed IDs for users and issued tokens
//! - **Roles**: The role names understood by the role gate
//!
//! # Example
//!
//! ```
//! use tollgate_core::{TokenId, UserId};
//!
//! // Parse a user ID from its UUID form
//! let user_id: UserId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // Generate a fresh token ID
//! let token_id = TokenId::generate();
//! assert_ne!(token_id.to_string(), user_id.to_string());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod role;

pub use ids::{IdError, TokenId, UserId};
