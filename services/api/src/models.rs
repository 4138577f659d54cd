//! API models for entities, request and response payloads

pub mod book;
pub mod borrowing;
pub mod review;
pub mod user;

pub use book::{
    Book, BookPage, BookQuery, BookSummary, BookType, BookUpdate, CatalogLabels, CopiesRequest,
    NewBook,
};
pub use borrowing::{BorrowStats, Borrowing, BorrowingView, ReturnOutcome};
pub use review::{RatingSummary, Review, ReviewRequest};
pub use user::{AdminStats, PublisherStats, User, UserRemoval};
