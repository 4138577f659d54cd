//! Borrowing records and ledger results

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a borrowing: created active, returned once, never reopened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowingStatus {
    Active,
    Returned,
}

/// Borrowing entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrowing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl Borrowing {
    /// A fresh, active borrowing due `loan_period` after `now`
    pub fn open(user_id: Uuid, book_id: Uuid, now: DateTime<Utc>, loan_period: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            borrowed_date: now,
            due_date: now + loan_period,
            returned_date: None,
            is_returned: false,
        }
    }

    pub fn status(&self) -> BorrowingStatus {
        if self.is_returned {
            BorrowingStatus::Returned
        } else {
            BorrowingStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == BorrowingStatus::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date < now
    }

    /// The ACTIVE -> RETURNED transition
    pub fn mark_returned(&mut self, at: DateTime<Utc>) {
        self.is_returned = true;
        self.returned_date = Some(at);
    }
}

/// Borrowing joined with its book title, as shown in history listings
#[derive(Debug, Clone, Serialize)]
pub struct BorrowingView {
    #[serde(flatten)]
    pub borrowing: Borrowing,
    pub book_title: String,
    pub status: BorrowingStatus,
    pub overdue: bool,
}

impl BorrowingView {
    pub fn new(borrowing: Borrowing, book_title: String, now: DateTime<Utc>) -> Self {
        Self {
            status: borrowing.status(),
            overdue: borrowing.is_overdue(now),
            borrowing,
            book_title,
        }
    }
}

/// Per-user borrowing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BorrowStats {
    pub active: i64,
    pub completed: i64,
}

/// Result of a return request
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    /// The copy went back on the shelf
    Returned(Borrowing),
    /// Nothing changed; the borrowing had been returned before
    AlreadyReturned(Borrowing),
}

impl ReturnOutcome {
    pub fn borrowing(&self) -> &Borrowing {
        match self {
            ReturnOutcome::Returned(b) | ReturnOutcome::AlreadyReturned(b) => b,
        }
    }
}
