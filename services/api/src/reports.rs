//! Read-only views: borrowing history, statistics and dashboards

use chrono::Utc;
use common::{Action, Role};

use crate::{
    error::LibraryResult,
    identity::Identity,
    models::{AdminStats, BorrowStats, BorrowingView, PublisherStats, User},
    store::LibraryStore,
};

#[derive(Clone)]
pub struct Reports<S> {
    store: S,
}

impl<S: LibraryStore> Reports<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The caller's own borrowings, or every borrowing for admins
    pub async fn borrowing_history(&self, identity: &Identity) -> LibraryResult<Vec<BorrowingView>> {
        let scope = if identity.role.permits(Action::ViewAllHistory) {
            None
        } else {
            Some(identity.user_id)
        };
        Ok(self.store.borrowing_history(scope, Utc::now()).await?)
    }

    pub async fn borrow_stats(&self, identity: &Identity) -> LibraryResult<BorrowStats> {
        Ok(self.store.borrow_stats(identity.user_id).await?)
    }

    pub async fn admin_dashboard(&self, identity: &Identity) -> LibraryResult<AdminStats> {
        identity.require(Action::ManageUsers)?;
        Ok(self.store.admin_stats().await?)
    }

    pub async fn list_users(&self, identity: &Identity) -> LibraryResult<Vec<User>> {
        identity.require(Action::ManageUsers)?;
        Ok(self.store.list_users_except(identity.user_id).await?)
    }

    pub async fn publisher_dashboard(&self, identity: &Identity) -> LibraryResult<PublisherStats> {
        identity.require(Action::ManageCatalog)?;
        if identity.role != Role::Publisher {
            // Admins have no catalog of their own
            return Ok(PublisherStats::default());
        }

        let figures = self.store.publisher_figures(identity.user_id).await?;
        Ok(PublisherStats {
            published_books: figures.published_books,
            available_copies: figures.available_copies,
            borrowed_count: figures.borrowed_count,
            average_rating: figures.ratings.average(),
        })
    }
}
