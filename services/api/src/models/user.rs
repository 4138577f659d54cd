//! Account model as seen by the api service

use chrono::{DateTime, Utc};
use common::Role;
use serde::Serialize;
use uuid::Uuid;

/// User entity (the credential hash never leaves the auth service)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// What happened to an account removed by an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRemoval {
    /// Kept for history, flagged inactive
    Deactivated,
    /// No activity on record, row removed
    Deleted,
}

/// Admin dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_books: i64,
    pub total_users: i64,
    pub total_publishers: i64,
    pub total_borrowed: i64,
}

/// Publisher dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublisherStats {
    pub published_books: i64,
    pub available_copies: i64,
    pub borrowed_count: i64,
    pub average_rating: f64,
}
