//! Book model and catalog payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{LibraryError, LibraryResult};

pub const DEFAULT_CATEGORY: &str = "General";

/// Format a book is lent in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookType {
    #[default]
    Physical,
    #[serde(rename = "E-book")]
    EBook,
}

impl BookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Physical => "Physical",
            BookType::EBook => "E-book",
        }
    }
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Physical" => Ok(BookType::Physical),
            "E-book" => Ok(BookType::EBook),
            other => Err(format!("Unknown book type: {}", other)),
        }
    }
}

/// Book entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: String,
    pub genre: Option<String>,
    pub book_type: BookType,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub cover_image: Option<String>,
    pub pdf_file: Option<String>,
    pub publisher_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    pub fn copies_consistent(&self) -> bool {
        0 <= self.available_copies && self.available_copies <= self.total_copies
    }

    /// Change the number of owned copies, keeping the copies on loan intact.
    pub fn resize(&mut self, new_total: i32) -> LibraryResult<()> {
        let on_loan = self.on_loan();
        if new_total < 1 || new_total < on_loan {
            return Err(LibraryError::InvalidCopyCount {
                requested: new_total,
                on_loan,
            });
        }

        self.total_copies = new_total;
        self.available_copies = new_total - on_loan;
        Ok(())
    }
}

/// Read-only JSON projection of a book
#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub available_copies: i32,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            available_copies: book.available_copies,
        }
    }
}

/// New book creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub book_type: Option<BookType>,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub total_copies: i32,
}

/// Book update payload; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub book_type: Option<BookType>,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub total_copies: Option<i32>,
}

/// Request to change the number of copies of a book
#[derive(Debug, Clone, Deserialize)]
pub struct CopiesRequest {
    pub total_copies: i32,
}

/// Query parameters for catalog listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
    /// Case-insensitive match on title or author
    pub search: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub book_type: Option<BookType>,
    /// `available` keeps only books with a copy on the shelf
    pub status: Option<String>,
}

impl BookQuery {
    pub const DEFAULT_LIMIT: u32 = 9;
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }

    pub fn available_only(&self) -> bool {
        self.status.as_deref() == Some("available")
    }

    /// Search term with surrounding whitespace removed, if any remains
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Response for catalog listing with pagination
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

/// Distinct labels used to build catalog filters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogLabels {
    pub categories: Vec<String>,
    pub genres: Vec<String>,
    pub book_types: Vec<String>,
}
