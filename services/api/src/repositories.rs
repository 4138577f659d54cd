//! Postgres implementation of the library store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{
    AdminStats, Book, BookQuery, BorrowStats, BorrowingView, CatalogLabels,
    RatingSummary, Review, User,
};
use crate::store::{LibraryStore, PublisherFigures};

mod ledger_tx;
mod rows;

pub use ledger_tx::PgLedgerTx;

/// Library store backed by a Postgres pool
#[derive(Clone)]
pub struct PgLibraryStore {
    pool: PgPool,
}

impl PgLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Substring pattern for ILIKE with the term's own `%`, `_` and `\` taken literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append the WHERE clause shared by the page query and the count query
fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE TRUE");

    if let Some(term) = query.search_term() {
        let pattern = contains_pattern(term);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR author ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(genre) = &query.genre {
        builder.push(" AND genre = ").push_bind(genre.clone());
    }
    if let Some(book_type) = query.book_type {
        builder.push(" AND book_type = ").push_bind(book_type.as_str());
    }
    if query.available_only() {
        builder.push(" AND available_copies > 0");
    }
}

#[async_trait]
impl LibraryStore for PgLibraryStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> DatabaseResult<PgLedgerTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx::new(tx))
    }

    async fn find_book(&self, id: Uuid) -> DatabaseResult<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE id = $1",
            rows::BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(rows::book).transpose()
    }

    async fn list_books(&self, query: &BookQuery) -> DatabaseResult<(Vec<Book>, i64)> {
        let mut page = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM books",
            rows::BOOK_COLUMNS
        ));
        push_book_filters(&mut page, query);
        page.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset());
        let found = page.build().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        push_book_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows::collect(found, rows::book)?, total))
    }

    async fn catalog_labels(&self) -> DatabaseResult<CatalogLabels> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM books ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        let genres: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT genre FROM books WHERE genre IS NOT NULL ORDER BY genre",
        )
        .fetch_all(&self.pool)
        .await?;
        let book_types: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT book_type FROM books ORDER BY book_type")
                .fetch_all(&self.pool)
                .await?;

        Ok(CatalogLabels {
            categories,
            genres,
            book_types,
        })
    }

    async fn borrowing_history(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<BorrowingView>> {
        let found = sqlx::query(
            r#"
            SELECT br.id, br.user_id, br.book_id, br.borrowed_date, br.due_date,
                   br.returned_date, br.is_returned, b.title AS book_title
            FROM borrowings br
            JOIN books b ON b.id = br.book_id
            WHERE $1::uuid IS NULL OR br.user_id = $1
            ORDER BY br.borrowed_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        found
            .iter()
            .map(|row| -> DatabaseResult<BorrowingView> {
                let title: String = row.try_get("book_title")?;
                Ok(BorrowingView::new(rows::borrowing(row)?, title, now))
            })
            .collect()
    }

    async fn borrow_stats(&self, user_id: Uuid) -> DatabaseResult<BorrowStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE NOT is_returned) AS active,
                   COUNT(*) FILTER (WHERE is_returned) AS completed
            FROM borrowings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BorrowStats {
            active: row.try_get("active")?,
            completed: row.try_get("completed")?,
        })
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> DatabaseResult<Vec<Review>> {
        let found = sqlx::query(&format!(
            "SELECT {} FROM reviews WHERE book_id = $1 ORDER BY created_at DESC",
            rows::REVIEW_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        rows::collect(found, rows::review)
    }

    async fn rating_summary(&self, book_id: Uuid) -> DatabaseResult<RatingSummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(rating), 0)::BIGINT AS total
            FROM reviews
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary {
            count: row.try_get("count")?,
            total: row.try_get("total")?,
        })
    }

    async fn find_user(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1",
            rows::USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(rows::user).transpose()
    }

    async fn list_users_except(&self, excluded: Uuid) -> DatabaseResult<Vec<User>> {
        let found = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id <> $1 ORDER BY created_at DESC",
            rows::USER_COLUMNS
        ))
        .bind(excluded)
        .fetch_all(&self.pool)
        .await?;

        rows::collect(found, rows::user)
    }

    async fn admin_stats(&self) -> DatabaseResult<AdminStats> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM books) AS total_books,
                   (SELECT COUNT(*) FROM users WHERE role <> 'admin') AS total_users,
                   (SELECT COUNT(*) FROM users WHERE role = 'publisher') AS total_publishers,
                   (SELECT COUNT(*) FROM borrowings WHERE NOT is_returned) AS total_borrowed
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStats {
            total_books: row.try_get("total_books")?,
            total_users: row.try_get("total_users")?,
            total_publishers: row.try_get("total_publishers")?,
            total_borrowed: row.try_get("total_borrowed")?,
        })
    }

    async fn publisher_figures(&self, publisher_id: Uuid) -> DatabaseResult<PublisherFigures> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM books WHERE publisher_id = $1) AS published_books,
                   (SELECT COALESCE(SUM(available_copies), 0)::BIGINT
                      FROM books WHERE publisher_id = $1) AS available_copies,
                   (SELECT COUNT(*) FROM borrowings br
                      JOIN books b ON b.id = br.book_id
                     WHERE b.publisher_id = $1) AS borrowed_count,
                   (SELECT COUNT(*) FROM reviews r
                      JOIN books b ON b.id = r.book_id
                     WHERE b.publisher_id = $1) AS rating_count,
                   (SELECT COALESCE(SUM(r.rating), 0)::BIGINT FROM reviews r
                      JOIN books b ON b.id = r.book_id
                     WHERE b.publisher_id = $1) AS rating_total
            "#,
        )
        .bind(publisher_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PublisherFigures {
            published_books: row.try_get("published_books")?,
            available_copies: row.try_get("available_copies")?,
            borrowed_count: row.try_get("borrowed_count")?,
            ratings: RatingSummary {
                count: row.try_get("rating_count")?,
                total: row.try_get("rating_total")?,
            },
        })
    }
}
