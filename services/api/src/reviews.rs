//! Review submission and rating aggregation

use chrono::Utc;
use common::Action;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{LibraryError, LibraryResult},
    identity::Identity,
    models::{Book, BookSummary, Review},
    store::{LedgerTx, LibraryStore},
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Book page content: the book, its reviews and their mean rating
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub summary: BookSummary,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
}

#[derive(Clone)]
pub struct ReviewService<S> {
    store: S,
}

impl<S: LibraryStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store a rating and review; one per user and book
    pub async fn add_review(
        &self,
        identity: &Identity,
        book_id: Uuid,
        rating: i32,
        content: &str,
    ) -> LibraryResult<Review> {
        identity.require(Action::Review)?;
        let (rating, content) = validate_review(rating, content)?;

        let mut tx = self.store.begin().await?;
        tx.lock_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;

        if tx.find_review(identity.user_id, book_id).await?.is_some() {
            return Err(LibraryError::DuplicateReview);
        }

        let review = Review {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            book_id,
            rating,
            content,
            created_at: Utc::now(),
        };
        tx.insert_review(&review).await?;
        tx.commit().await?;

        info!(review_id = %review.id, book_id = %book_id, rating, "Review added");
        Ok(review)
    }

    /// Mean rating of a book, 0 when it has no reviews
    pub async fn average_rating(&self, book_id: Uuid) -> LibraryResult<f64> {
        Ok(self.store.rating_summary(book_id).await?.average())
    }

    pub async fn book_detail(&self, book_id: Uuid) -> LibraryResult<BookDetail> {
        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;
        let reviews = self.store.reviews_for_book(book_id).await?;
        let average_rating = self.average_rating(book_id).await?;

        Ok(BookDetail {
            summary: BookSummary::from(&book),
            book,
            reviews,
            average_rating,
        })
    }
}

fn validate_review(rating: i32, content: &str) -> LibraryResult<(i16, String)> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(LibraryError::InvalidReview(format!(
            "Rating must be between {} and {}.",
            MIN_RATING, MAX_RATING
        )));
    }

    let content = content.trim();
    if content.is_empty() {
        return Err(LibraryError::InvalidReview(
            "Review content is required.".to_string(),
        ));
    }

    Ok((rating as i16, content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookType;
    use crate::store::memory::MemoryStore;
    use common::Role;

    async fn setup() -> (ReviewService<MemoryStore>, MemoryStore, Book) {
        let store = MemoryStore::new();
        let book = store
            .add_book(Book {
                id: Uuid::new_v4(),
                title: "Season of Migration to the North".to_string(),
                author: "Tayeb Salih".to_string(),
                isbn: None,
                category: "General".to_string(),
                genre: None,
                book_type: BookType::EBook,
                description: None,
                publication_year: Some(1966),
                total_copies: 1,
                available_copies: 1,
                cover_image: None,
                pdf_file: None,
                publisher_id: None,
                created_at: Utc::now(),
            })
            .await;
        (ReviewService::new(store.clone()), store, book)
    }

    async fn reader(store: &MemoryStore, name: &str) -> Identity {
        let user = store.add_user(name, Role::User).await;
        Identity::new(user.id, user.role)
    }

    #[tokio::test]
    async fn out_of_range_rating_is_invalid() {
        let (service, store, book) = setup().await;
        let user = reader(&store, "critic").await;

        for rating in [0, 6, -1] {
            let err = service
                .add_review(&user, book.id, rating, "Great")
                .await
                .unwrap_err();
            assert!(matches!(err, LibraryError::InvalidReview(_)));
        }
    }

    #[tokio::test]
    async fn blank_content_is_invalid() {
        let (service, store, book) = setup().await;
        let user = reader(&store, "critic").await;
        let err = service
            .add_review(&user, book.id, 4, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidReview(_)));
    }

    #[tokio::test]
    async fn second_review_is_a_duplicate() {
        let (service, store, book) = setup().await;
        let user = reader(&store, "critic").await;

        service
            .add_review(&user, book.id, 4, "Haunting.")
            .await
            .unwrap();
        let err = service
            .add_review(&user, book.id, 4, "Still haunting.")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::DuplicateReview));
    }

    #[tokio::test]
    async fn reviewing_a_missing_book_is_not_found() {
        let (service, store, _) = setup().await;
        let user = reader(&store, "critic").await;
        let err = service
            .add_review(&user, Uuid::new_v4(), 4, "?")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound("Book")));
    }

    #[tokio::test]
    async fn average_rating_is_zero_then_mean() {
        let (service, store, book) = setup().await;
        assert_eq!(service.average_rating(book.id).await.unwrap(), 0.0);

        let first = reader(&store, "first").await;
        let second = reader(&store, "second").await;
        service.add_review(&first, book.id, 3, "Fine").await.unwrap();
        service
            .add_review(&second, book.id, 5, "Superb")
            .await
            .unwrap();

        assert_eq!(service.average_rating(book.id).await.unwrap(), 4.0);

        let detail = service.book_detail(book.id).await.unwrap();
        assert_eq!(detail.reviews.len(), 2);
        assert_eq!(detail.average_rating, 4.0);
        assert_eq!(detail.summary.title, book.title);
    }
}
