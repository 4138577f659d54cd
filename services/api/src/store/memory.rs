//! In-memory store used by the unit tests
//!
//! Transactions take the whole state lock, work on a copy and swap it back on
//! commit, so they behave as serialised transactions with rollback on drop.
//! The same constraints the schema declares are checked on write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Role;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerTx, LibraryStore, PublisherFigures, constraints};
use crate::models::{
    AdminStats, Book, BookQuery, BorrowStats, Borrowing, BorrowingView, CatalogLabels,
    RatingSummary, Review, User,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: HashMap<Uuid, User>,
    pub books: HashMap<Uuid, Book>,
    pub borrowings: HashMap<Uuid, Borrowing>,
    pub reviews: HashMap<Uuid, Review>,
}

impl MemoryState {
    fn check_book(&self, book: &Book) -> DatabaseResult<()> {
        if !book.copies_consistent() {
            return Err(DatabaseError::CheckViolation(
                constraints::BOOK_COPIES.to_string(),
            ));
        }
        if let Some(isbn) = &book.isbn {
            let taken = self
                .books
                .values()
                .any(|b| b.id != book.id && b.isbn.as_ref() == Some(isbn));
            if taken {
                return Err(DatabaseError::UniqueViolation(
                    constraints::BOOK_ISBN.to_string(),
                ));
            }
        }
        Ok(())
    }

    fn book_mut(&mut self, id: Uuid) -> DatabaseResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::Query(sqlx::Error::RowNotFound))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn add_user(&self, username: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_book(&self, book: Book) -> Book {
        self.state.lock().await.books.insert(book.id, book.clone());
        book
    }

    pub async fn add_borrowing(&self, borrowing: Borrowing) -> Borrowing {
        self.state
            .lock()
            .await
            .borrowings
            .insert(borrowing.id, borrowing.clone());
        borrowing
    }

    pub async fn book(&self, id: Uuid) -> Option<Book> {
        self.state.lock().await.books.get(&id).cloned()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LibraryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> DatabaseResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn find_book(&self, id: Uuid) -> DatabaseResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn list_books(&self, query: &BookQuery) -> DatabaseResult<(Vec<Book>, i64)> {
        let state = self.state.lock().await;
        let needle = query.search_term().map(str::to_lowercase);
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| {
                needle.as_ref().is_none_or(|n| {
                    b.title.to_lowercase().contains(n) || b.author.to_lowercase().contains(n)
                })
            })
            .filter(|b| query.category.as_ref().is_none_or(|c| &b.category == c))
            .filter(|b| query.genre.is_none() || b.genre == query.genre)
            .filter(|b| query.book_type.is_none_or(|t| b.book_type == t))
            .filter(|b| !query.available_only() || b.is_available())
            .cloned()
            .collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = books.len() as i64;
        let page = books
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn catalog_labels(&self) -> DatabaseResult<CatalogLabels> {
        let state = self.state.lock().await;
        let mut labels = CatalogLabels::default();
        for book in state.books.values() {
            labels.categories.push(book.category.clone());
            labels.genres.extend(book.genre.clone());
            labels.book_types.push(book.book_type.to_string());
        }
        for list in [
            &mut labels.categories,
            &mut labels.genres,
            &mut labels.book_types,
        ] {
            list.sort();
            list.dedup();
        }
        Ok(labels)
    }

    async fn borrowing_history(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<BorrowingView>> {
        let state = self.state.lock().await;
        let mut rows: Vec<BorrowingView> = state
            .borrowings
            .values()
            .filter(|b| user_id.is_none_or(|id| b.user_id == id))
            .map(|b| {
                let title = state
                    .books
                    .get(&b.book_id)
                    .map(|book| book.title.clone())
                    .unwrap_or_default();
                BorrowingView::new(b.clone(), title, now)
            })
            .collect();
        rows.sort_by(|a, b| b.borrowing.borrowed_date.cmp(&a.borrowing.borrowed_date));
        Ok(rows)
    }

    async fn borrow_stats(&self, user_id: Uuid) -> DatabaseResult<BorrowStats> {
        let state = self.state.lock().await;
        let mut stats = BorrowStats::default();
        for b in state.borrowings.values().filter(|b| b.user_id == user_id) {
            if b.is_returned {
                stats.completed += 1;
            } else {
                stats.active += 1;
            }
        }
        Ok(stats)
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> DatabaseResult<Vec<Review>> {
        let state = self.state.lock().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn rating_summary(&self, book_id: Uuid) -> DatabaseResult<RatingSummary> {
        let state = self.state.lock().await;
        Ok(RatingSummary::from_ratings(
            state
                .reviews
                .values()
                .filter(|r| r.book_id == book_id)
                .map(|r| r.rating),
        ))
    }

    async fn find_user(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_users_except(&self, excluded: Uuid) -> DatabaseResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.id != excluded)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn admin_stats(&self) -> DatabaseResult<AdminStats> {
        let state = self.state.lock().await;
        Ok(AdminStats {
            total_books: state.books.len() as i64,
            total_users: state.users.values().filter(|u| u.role != Role::Admin).count() as i64,
            total_publishers: state
                .users
                .values()
                .filter(|u| u.role == Role::Publisher)
                .count() as i64,
            total_borrowed: state.borrowings.values().filter(|b| !b.is_returned).count() as i64,
        })
    }

    async fn publisher_figures(&self, publisher_id: Uuid) -> DatabaseResult<PublisherFigures> {
        let state = self.state.lock().await;
        let owned: Vec<&Book> = state
            .books
            .values()
            .filter(|b| b.publisher_id == Some(publisher_id))
            .collect();
        let owns = |book_id: &Uuid| owned.iter().any(|b| &b.id == book_id);

        Ok(PublisherFigures {
            published_books: owned.len() as i64,
            available_copies: owned.iter().map(|b| b.available_copies as i64).sum(),
            borrowed_count: state.borrowings.values().filter(|b| owns(&b.book_id)).count() as i64,
            ratings: RatingSummary::from_ratings(
                state
                    .reviews
                    .values()
                    .filter(|r| owns(&r.book_id))
                    .map(|r| r.rating),
            ),
        })
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_book(&mut self, id: Uuid) -> DatabaseResult<Option<Book>> {
        Ok(self.working.books.get(&id).cloned())
    }

    async fn lock_borrowing(&mut self, id: Uuid) -> DatabaseResult<Option<Borrowing>> {
        Ok(self.working.borrowings.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_active_borrowing(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> DatabaseResult<Option<Borrowing>> {
        Ok(self
            .working
            .borrowings
            .values()
            .find(|b| b.user_id == user_id && b.book_id == book_id && !b.is_returned)
            .cloned())
    }

    async fn count_active_borrowings(&mut self, book_id: Uuid) -> DatabaseResult<i64> {
        Ok(self
            .working
            .borrowings
            .values()
            .filter(|b| b.book_id == book_id && !b.is_returned)
            .count() as i64)
    }

    async fn has_activity(&mut self, user_id: Uuid) -> DatabaseResult<bool> {
        Ok(self.working.borrowings.values().any(|b| b.user_id == user_id)
            || self
                .working
                .books
                .values()
                .any(|b| b.publisher_id == Some(user_id)))
    }

    async fn find_review(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> DatabaseResult<Option<Review>> {
        Ok(self
            .working
            .reviews
            .values()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
            .cloned())
    }

    async fn insert_book(&mut self, book: &Book) -> DatabaseResult<()> {
        self.working.check_book(book)?;
        self.working.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn update_book(&mut self, book: &Book) -> DatabaseResult<()> {
        self.working.check_book(book)?;
        *self.working.book_mut(book.id)? = book.clone();
        Ok(())
    }

    async fn adjust_available_copies(&mut self, book_id: Uuid, delta: i32) -> DatabaseResult<()> {
        let mut book = self.working.book_mut(book_id)?.clone();
        book.available_copies += delta;
        self.working.check_book(&book)?;
        self.working.books.insert(book_id, book);
        Ok(())
    }

    async fn delete_book(&mut self, book_id: Uuid) -> DatabaseResult<()> {
        self.working.books.remove(&book_id);
        self.working.borrowings.retain(|_, b| b.book_id != book_id);
        self.working.reviews.retain(|_, r| r.book_id != book_id);
        Ok(())
    }

    async fn insert_borrowing(&mut self, borrowing: &Borrowing) -> DatabaseResult<()> {
        let duplicate = self.working.borrowings.values().any(|b| {
            !b.is_returned && b.user_id == borrowing.user_id && b.book_id == borrowing.book_id
        });
        if duplicate && !borrowing.is_returned {
            return Err(DatabaseError::UniqueViolation(
                constraints::ACTIVE_BORROWING.to_string(),
            ));
        }
        self.working
            .borrowings
            .insert(borrowing.id, borrowing.clone());
        Ok(())
    }

    async fn mark_returned(
        &mut self,
        borrowing_id: Uuid,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let borrowing = self
            .working
            .borrowings
            .get_mut(&borrowing_id)
            .ok_or_else(|| DatabaseError::Query(sqlx::Error::RowNotFound))?;
        borrowing.mark_returned(at);
        Ok(())
    }

    async fn insert_review(&mut self, review: &Review) -> DatabaseResult<()> {
        let duplicate = self
            .working
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.book_id == review.book_id);
        if duplicate {
            return Err(DatabaseError::UniqueViolation(
                constraints::REVIEW_PER_USER.to_string(),
            ));
        }
        self.working.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn deactivate_user(&mut self, user_id: Uuid) -> DatabaseResult<()> {
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.is_active = false;
        }
        Ok(())
    }

    async fn delete_user(&mut self, user_id: Uuid) -> DatabaseResult<()> {
        self.working.users.remove(&user_id);
        self.working.reviews.retain(|_, r| r.user_id != user_id);
        Ok(())
    }

    async fn commit(self) -> DatabaseResult<()> {
        let MemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
