//! Row mapping shared by the Postgres store and its transactions

use common::Role;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{Row, postgres::PgRow};

use crate::models::{Book, BookType, Borrowing, Review, User};

pub const BOOK_COLUMNS: &str = "id, title, author, isbn, category, genre, book_type, description, \
     publication_year, total_copies, available_copies, cover_image, pdf_file, publisher_id, created_at";

pub const BORROWING_COLUMNS: &str =
    "id, user_id, book_id, borrowed_date, due_date, returned_date, is_returned";

pub const REVIEW_COLUMNS: &str = "id, user_id, book_id, rating, content, created_at";

pub const USER_COLUMNS: &str = "id, username, email, role, is_active, created_at";

pub fn book(row: &PgRow) -> DatabaseResult<Book> {
    let book_type: String = row.try_get("book_type")?;
    let book_type = book_type
        .parse::<BookType>()
        .map_err(DatabaseError::Corrupt)?;

    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
        category: row.try_get("category")?,
        genre: row.try_get("genre")?,
        book_type,
        description: row.try_get("description")?,
        publication_year: row.try_get("publication_year")?,
        total_copies: row.try_get("total_copies")?,
        available_copies: row.try_get("available_copies")?,
        cover_image: row.try_get("cover_image")?,
        pdf_file: row.try_get("pdf_file")?,
        publisher_id: row.try_get("publisher_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn borrowing(row: &PgRow) -> DatabaseResult<Borrowing> {
    Ok(Borrowing {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        book_id: row.try_get("book_id")?,
        borrowed_date: row.try_get("borrowed_date")?,
        due_date: row.try_get("due_date")?,
        returned_date: row.try_get("returned_date")?,
        is_returned: row.try_get("is_returned")?,
    })
}

pub fn review(row: &PgRow) -> DatabaseResult<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        book_id: row.try_get("book_id")?,
        rating: row.try_get("rating")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn user(row: &PgRow) -> DatabaseResult<User> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| DatabaseError::Corrupt(e.to_string()))?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn collect<T>(
    rows: Vec<PgRow>,
    map: fn(&PgRow) -> DatabaseResult<T>,
) -> DatabaseResult<Vec<T>> {
    rows.iter().map(map).collect()
}
