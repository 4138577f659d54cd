//! Persistence seam for the library operations
//!
//! Every state change goes through a [`LedgerTx`] obtained from
//! [`LibraryStore::begin`]. Fetches made through the transaction lock the rows
//! they return until the transaction ends. A transaction dropped without
//! `commit` rolls back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{
    AdminStats, Book, BookQuery, BorrowStats, Borrowing, BorrowingView, CatalogLabels,
    RatingSummary, Review, User,
};

#[cfg(test)]
pub mod memory;

/// Constraint and index names the domain layer knows how to translate
pub mod constraints {
    pub const ACTIVE_BORROWING: &str = "borrowings_active_user_book_idx";
    pub const REVIEW_PER_USER: &str = "reviews_user_book_key";
    pub const BOOK_ISBN: &str = "books_isbn_key";
    pub const BOOK_COPIES: &str = "books_copies_check";
}

/// Publisher figures gathered by one aggregate query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherFigures {
    pub published_books: i64,
    pub available_copies: i64,
    pub borrowed_count: i64,
    pub ratings: RatingSummary,
}

/// Read access plus the entry point for transactional writes
#[async_trait]
pub trait LibraryStore: Clone + Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Start a transaction
    async fn begin(&self) -> DatabaseResult<Self::Tx>;

    async fn find_book(&self, id: Uuid) -> DatabaseResult<Option<Book>>;

    /// One page of books matching the query, with the total match count
    async fn list_books(&self, query: &BookQuery) -> DatabaseResult<(Vec<Book>, i64)>;

    async fn catalog_labels(&self) -> DatabaseResult<CatalogLabels>;

    /// Borrowings newest first, for one user or for everyone
    async fn borrowing_history(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<BorrowingView>>;

    async fn borrow_stats(&self, user_id: Uuid) -> DatabaseResult<BorrowStats>;

    /// Reviews of a book, newest first
    async fn reviews_for_book(&self, book_id: Uuid) -> DatabaseResult<Vec<Review>>;

    async fn rating_summary(&self, book_id: Uuid) -> DatabaseResult<RatingSummary>;

    async fn find_user(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Every account except `excluded`, newest first
    async fn list_users_except(&self, excluded: Uuid) -> DatabaseResult<Vec<User>>;

    async fn admin_stats(&self) -> DatabaseResult<AdminStats>;

    async fn publisher_figures(&self, publisher_id: Uuid) -> DatabaseResult<PublisherFigures>;
}

/// Unit of work spanning one library operation
#[async_trait]
pub trait LedgerTx: Send {
    /// Fetch a book and hold its row lock
    async fn lock_book(&mut self, id: Uuid) -> DatabaseResult<Option<Book>>;

    /// Fetch a borrowing and hold its row lock
    async fn lock_borrowing(&mut self, id: Uuid) -> DatabaseResult<Option<Borrowing>>;

    /// Fetch an account and hold its row lock
    async fn lock_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn find_active_borrowing(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> DatabaseResult<Option<Borrowing>>;

    async fn count_active_borrowings(&mut self, book_id: Uuid) -> DatabaseResult<i64>;

    /// Whether the account has any borrowing (any status) or published book
    async fn has_activity(&mut self, user_id: Uuid) -> DatabaseResult<bool>;

    async fn find_review(&mut self, user_id: Uuid, book_id: Uuid)
    -> DatabaseResult<Option<Review>>;

    async fn insert_book(&mut self, book: &Book) -> DatabaseResult<()>;

    /// Write back every mutable column of the book, copy counts included
    async fn update_book(&mut self, book: &Book) -> DatabaseResult<()>;

    /// Shift the shelf count by `delta` relative to the stored value
    async fn adjust_available_copies(&mut self, book_id: Uuid, delta: i32)
    -> DatabaseResult<()>;

    /// Remove a book with its returned borrowings and its reviews
    async fn delete_book(&mut self, book_id: Uuid) -> DatabaseResult<()>;

    async fn insert_borrowing(&mut self, borrowing: &Borrowing) -> DatabaseResult<()>;

    async fn mark_returned(&mut self, borrowing_id: Uuid, at: DateTime<Utc>)
    -> DatabaseResult<()>;

    async fn insert_review(&mut self, review: &Review) -> DatabaseResult<()>;

    async fn deactivate_user(&mut self, user_id: Uuid) -> DatabaseResult<()>;

    async fn delete_user(&mut self, user_id: Uuid) -> DatabaseResult<()>;

    async fn commit(self) -> DatabaseResult<()>;
}
