//! Borrowing ledger
//!
//! Mediates every change to a book's available copies and every transition of
//! a borrowing record. Each operation runs in a single store transaction: the
//! book row (or borrowing row) is locked first, the rules are checked against
//! the locked state, and all writes commit together or not at all.

use chrono::{Duration, Utc};
use common::Action;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{LibraryError, LibraryResult},
    identity::Identity,
    models::{Book, Borrowing, ReturnOutcome, UserRemoval},
    store::{LedgerTx, LibraryStore},
};

/// Loan period applied when none is configured
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

#[derive(Clone)]
pub struct BorrowingLedger<S> {
    store: S,
    loan_period: Duration,
}

impl<S: LibraryStore> BorrowingLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_loan_period(store, DEFAULT_LOAN_PERIOD_DAYS)
    }

    pub fn with_loan_period(store: S, days: i64) -> Self {
        Self {
            store,
            loan_period: Duration::days(days),
        }
    }

    /// Take one copy of a book on loan for the calling user.
    ///
    /// Fails with `Unavailable` when no copy is on the shelf, then with
    /// `AlreadyBorrowed` when the caller still holds a copy of the same book.
    pub async fn borrow_book(
        &self,
        identity: &Identity,
        book_id: Uuid,
    ) -> LibraryResult<Borrowing> {
        identity.require(Action::Borrow)?;

        let mut tx = self.store.begin().await?;
        let book = tx
            .lock_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;

        if !book.is_available() {
            return Err(LibraryError::Unavailable);
        }

        if tx
            .find_active_borrowing(identity.user_id, book_id)
            .await?
            .is_some()
        {
            return Err(LibraryError::AlreadyBorrowed);
        }

        let borrowing = Borrowing::open(identity.user_id, book_id, Utc::now(), self.loan_period);
        tx.adjust_available_copies(book_id, -1).await?;
        tx.insert_borrowing(&borrowing).await?;
        tx.commit().await?;

        info!(
            borrowing_id = %borrowing.id,
            user_id = %identity.user_id,
            book_id = %book_id,
            available_copies = book.available_copies - 1,
            "Book borrowed"
        );
        Ok(borrowing)
    }

    /// Close a borrowing and put its copy back on the shelf.
    ///
    /// Only the borrower or an admin may return. Returning twice changes
    /// nothing and reports `AlreadyReturned`.
    pub async fn return_book(
        &self,
        identity: &Identity,
        borrowing_id: Uuid,
    ) -> LibraryResult<ReturnOutcome> {
        let mut tx = self.store.begin().await?;
        let mut borrowing = tx
            .lock_borrowing(borrowing_id)
            .await?
            .ok_or(LibraryError::NotFound("Borrowing"))?;

        if borrowing.user_id != identity.user_id {
            identity.require(Action::ReturnOthers)?;
        }

        if borrowing.is_returned {
            info!(borrowing_id = %borrowing_id, "Borrowing already returned");
            return Ok(ReturnOutcome::AlreadyReturned(borrowing));
        }

        let book = tx
            .lock_book(borrowing.book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;

        if book.available_copies >= book.total_copies {
            error!(
                book_id = %book.id,
                available_copies = book.available_copies,
                total_copies = book.total_copies,
                "Return would exceed total copies"
            );
            return Err(LibraryError::CopyAccounting(book.id));
        }

        let now = Utc::now();
        borrowing.mark_returned(now);
        tx.mark_returned(borrowing_id, now).await?;
        tx.adjust_available_copies(book.id, 1).await?;
        tx.commit().await?;

        info!(
            borrowing_id = %borrowing_id,
            book_id = %book.id,
            available_copies = book.available_copies + 1,
            "Book returned"
        );
        Ok(ReturnOutcome::Returned(borrowing))
    }

    /// Delete a book that has no copy out on loan.
    ///
    /// Returns the deleted book so its stored files can be cleaned up.
    pub async fn delete_book(&self, identity: &Identity, book_id: Uuid) -> LibraryResult<Book> {
        identity.require(Action::ManageCatalog)?;

        let mut tx = self.store.begin().await?;
        let book = tx
            .lock_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;
        identity.require_owner(book.publisher_id)?;

        let active = tx.count_active_borrowings(book_id).await?;
        if active > 0 {
            warn!(book_id = %book_id, active, "Refusing to delete a book on loan");
            return Err(LibraryError::BookInUse(active));
        }

        tx.delete_book(book_id).await?;
        tx.commit().await?;

        info!(book_id = %book_id, title = %book.title, "Book deleted");
        Ok(book)
    }

    /// Change how many copies of a book exist without touching the copies on loan
    pub async fn edit_book_copies(
        &self,
        identity: &Identity,
        book_id: Uuid,
        new_total: i32,
    ) -> LibraryResult<Book> {
        identity.require(Action::ManageCatalog)?;

        let mut tx = self.store.begin().await?;
        let book = resize_locked(&mut tx, identity, book_id, new_total).await?;
        tx.commit().await?;

        info!(
            book_id = %book_id,
            total_copies = book.total_copies,
            available_copies = book.available_copies,
            "Book copies updated"
        );
        Ok(book)
    }

    /// Remove an account: deactivate it when it has history, delete it otherwise.
    pub async fn deactivate_or_delete_user(
        &self,
        identity: &Identity,
        user_id: Uuid,
    ) -> LibraryResult<UserRemoval> {
        identity.require(Action::ManageUsers)?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .lock_user(user_id)
            .await?
            .ok_or(LibraryError::NotFound("User"))?;

        if user.role == common::Role::Admin {
            return Err(LibraryError::ProtectedAccount);
        }

        let removal = if tx.has_activity(user_id).await? {
            tx.deactivate_user(user_id).await?;
            UserRemoval::Deactivated
        } else {
            tx.delete_user(user_id).await?;
            UserRemoval::Deleted
        };
        tx.commit().await?;

        info!(user_id = %user_id, username = %user.username, ?removal, "User removed");
        Ok(removal)
    }
}

/// Lock a book in `tx`, check ownership and apply a copy-count change.
///
/// Used by the copy edit and by the full book update, inside the caller's
/// transaction.
pub(crate) async fn resize_locked<T: LedgerTx>(
    tx: &mut T,
    identity: &Identity,
    book_id: Uuid,
    new_total: i32,
) -> LibraryResult<Book> {
    let mut book = tx
        .lock_book(book_id)
        .await?
        .ok_or(LibraryError::NotFound("Book"))?;
    identity.require_owner(book.publisher_id)?;

    book.resize(new_total)?;
    tx.update_book(&book).await?;
    Ok(book)
}
