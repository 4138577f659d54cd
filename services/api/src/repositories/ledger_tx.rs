//! Postgres transaction used by the ledger, catalog and review operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::rows;
use crate::models::{Book, Borrowing, Review, User};
use crate::store::LedgerTx;

/// One database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    pub(super) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_book(&mut self, id: Uuid) -> DatabaseResult<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            rows::BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(rows::book).transpose()
    }

    async fn lock_borrowing(&mut self, id: Uuid) -> DatabaseResult<Option<Borrowing>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM borrowings WHERE id = $1 FOR UPDATE",
            rows::BORROWING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(rows::borrowing).transpose()
    }

    async fn lock_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            rows::USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(rows::user).transpose()
    }

    async fn find_active_borrowing(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> DatabaseResult<Option<Borrowing>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM borrowings WHERE user_id = $1 AND book_id = $2 AND NOT is_returned",
            rows::BORROWING_COLUMNS
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(rows::borrowing).transpose()
    }

    async fn count_active_borrowings(&mut self, book_id: Uuid) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE book_id = $1 AND NOT is_returned",
        )
        .bind(book_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn has_activity(&mut self, user_id: Uuid) -> DatabaseResult<bool> {
        let active = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM borrowings WHERE user_id = $1)
                OR EXISTS (SELECT 1 FROM books WHERE publisher_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(active)
    }

    async fn find_review(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> DatabaseResult<Option<Review>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reviews WHERE user_id = $1 AND book_id = $2",
            rows::REVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(rows::review).transpose()
    }

    async fn insert_book(&mut self, book: &Book) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, category, genre, book_type, description,
                               publication_year, total_copies, available_copies, cover_image,
                               pdf_file, publisher_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.genre)
        .bind(book.book_type.as_str())
        .bind(&book.description)
        .bind(book.publication_year)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.cover_image)
        .bind(&book.pdf_file)
        .bind(book.publisher_id)
        .bind(book.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_book(&mut self, book: &Book) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, category = $5, genre = $6, book_type = $7,
                description = $8, publication_year = $9, total_copies = $10,
                available_copies = $11, cover_image = $12, pdf_file = $13, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.genre)
        .bind(book.book_type.as_str())
        .bind(&book.description)
        .bind(book.publication_year)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.cover_image)
        .bind(&book.pdf_file)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn adjust_available_copies(&mut self, book_id: Uuid, delta: i32) -> DatabaseResult<()> {
        // Relative so books_copies_check also rejects a lost update
        sqlx::query(
            "UPDATE books SET available_copies = available_copies + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(book_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_book(&mut self, book_id: Uuid) -> DatabaseResult<()> {
        // Borrowings and reviews go with the book through ON DELETE CASCADE
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_borrowing(&mut self, borrowing: &Borrowing) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowings (id, user_id, book_id, borrowed_date, due_date,
                                    returned_date, is_returned)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(borrowing.id)
        .bind(borrowing.user_id)
        .bind(borrowing.book_id)
        .bind(borrowing.borrowed_date)
        .bind(borrowing.due_date)
        .bind(borrowing.returned_date)
        .bind(borrowing.is_returned)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn mark_returned(
        &mut self,
        borrowing_id: Uuid,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE borrowings SET is_returned = TRUE, returned_date = $2 WHERE id = $1",
        )
        .bind(borrowing_id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_review(&mut self, review: &Review) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, book_id, rating, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.book_id)
        .bind(review.rating)
        .bind(&review.content)
        .bind(review.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn deactivate_user(&mut self, user_id: Uuid) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_user(&mut self, user_id: Uuid) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self) -> DatabaseResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
