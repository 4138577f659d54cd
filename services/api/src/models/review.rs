//! Review model and rating aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub rating: i16,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Review submission payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub content: String,
}

/// Count and sum of ratings, as returned by an aggregate query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingSummary {
    pub count: i64,
    pub total: i64,
}

impl RatingSummary {
    pub fn from_ratings<I: IntoIterator<Item = i16>>(ratings: I) -> Self {
        ratings.into_iter().fold(Self::default(), |acc, r| Self {
            count: acc.count + 1,
            total: acc.total + r as i64,
        })
    }

    /// Arithmetic mean, 0 when there are no ratings
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}
