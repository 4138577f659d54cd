//! Catalog operations: creating, editing, listing and attaching files to books

use chrono::{Datelike, Utc};
use common::Action;
use tracing::info;
use uuid::Uuid;

use crate::{
    blob::BlobKind,
    error::{LibraryError, LibraryResult},
    identity::Identity,
    ledger,
    models::{Book, BookPage, BookQuery, BookUpdate, CatalogLabels, NewBook, book::DEFAULT_CATEGORY},
    store::{LedgerTx, LibraryStore},
};

#[derive(Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S: LibraryStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Add a book owned by the calling publisher; every copy starts on the shelf
    pub async fn create_book(&self, identity: &Identity, new_book: NewBook) -> LibraryResult<Book> {
        identity.require(Action::ManageCatalog)?;
        validate_book_fields(
            Some(&new_book.title),
            Some(&new_book.author),
            new_book.publication_year,
            Some(new_book.total_copies),
        )?;

        let book = Book {
            id: Uuid::new_v4(),
            title: new_book.title.trim().to_string(),
            author: new_book.author.trim().to_string(),
            isbn: normalize(new_book.isbn),
            category: normalize(new_book.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            genre: normalize(new_book.genre),
            book_type: new_book.book_type.unwrap_or_default(),
            description: normalize(new_book.description),
            publication_year: new_book.publication_year,
            total_copies: new_book.total_copies,
            available_copies: new_book.total_copies,
            cover_image: None,
            pdf_file: None,
            publisher_id: Some(identity.user_id),
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        tx.insert_book(&book).await?;
        tx.commit().await?;

        info!(book_id = %book.id, title = %book.title, publisher_id = %identity.user_id, "Book created");
        Ok(book)
    }

    /// Edit the descriptive fields of a book, and its copy count when given
    pub async fn update_book(
        &self,
        identity: &Identity,
        book_id: Uuid,
        update: BookUpdate,
    ) -> LibraryResult<Book> {
        identity.require(Action::ManageCatalog)?;
        validate_book_fields(
            update.title.as_ref(),
            update.author.as_ref(),
            update.publication_year,
            None,
        )?;

        let mut tx = self.store.begin().await?;
        let mut book = match update.total_copies {
            Some(total) => ledger::resize_locked(&mut tx, identity, book_id, total).await?,
            None => {
                let book = tx
                    .lock_book(book_id)
                    .await?
                    .ok_or(LibraryError::NotFound("Book"))?;
                identity.require_owner(book.publisher_id)?;
                book
            }
        };

        if let Some(title) = update.title {
            book.title = title.trim().to_string();
        }
        if let Some(author) = update.author {
            book.author = author.trim().to_string();
        }
        if update.isbn.is_some() {
            book.isbn = normalize(update.isbn);
        }
        if let Some(category) = normalize(update.category) {
            book.category = category;
        }
        if update.genre.is_some() {
            book.genre = normalize(update.genre);
        }
        if let Some(book_type) = update.book_type {
            book.book_type = book_type;
        }
        if update.description.is_some() {
            book.description = normalize(update.description);
        }
        if update.publication_year.is_some() {
            book.publication_year = update.publication_year;
        }

        tx.update_book(&book).await?;
        tx.commit().await?;

        info!(book_id = %book.id, "Book updated");
        Ok(book)
    }

    /// Record a stored file on a book; returns the book and the file it replaced
    pub async fn attach_file(
        &self,
        identity: &Identity,
        book_id: Uuid,
        kind: BlobKind,
        stored_name: String,
    ) -> LibraryResult<(Book, Option<String>)> {
        identity.require(Action::ManageCatalog)?;

        let mut tx = self.store.begin().await?;
        let mut book = tx
            .lock_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))?;
        identity.require_owner(book.publisher_id)?;

        let slot = match kind {
            BlobKind::Cover => &mut book.cover_image,
            BlobKind::Pdf => &mut book.pdf_file,
        };
        let replaced = slot.replace(stored_name);

        tx.update_book(&book).await?;
        tx.commit().await?;

        info!(book_id = %book.id, ?kind, "Book file attached");
        Ok((book, replaced))
    }

    pub async fn get_book(&self, book_id: Uuid) -> LibraryResult<Book> {
        self.store
            .find_book(book_id)
            .await?
            .ok_or(LibraryError::NotFound("Book"))
    }

    pub async fn list_books(&self, query: &BookQuery) -> LibraryResult<BookPage> {
        let (items, total) = self.store.list_books(query).await?;
        Ok(BookPage {
            items,
            page: query.page(),
            limit: query.limit(),
            total,
        })
    }

    pub async fn labels(&self) -> LibraryResult<CatalogLabels> {
        Ok(self.store.catalog_labels().await?)
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check the book form fields that are present, collecting every problem
fn validate_book_fields(
    title: Option<&String>,
    author: Option<&String>,
    publication_year: Option<i32>,
    total_copies: Option<i32>,
) -> LibraryResult<()> {
    let mut errors = Vec::new();

    if title.is_some_and(|t| t.trim().is_empty()) {
        errors.push("Book title is required.".to_string());
    }
    if author.is_some_and(|a| a.trim().is_empty()) {
        errors.push("Author name is required.".to_string());
    }
    if let Some(year) = publication_year {
        let current_year = Utc::now().year();
        if !(1000..=current_year).contains(&year) {
            errors.push(format!(
                "Publication year must be between 1000 and {}.",
                current_year
            ));
        }
    }
    if total_copies.is_some_and(|c| c < 1) {
        errors.push("Total copies must be at least 1.".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LibraryError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookType;
    use crate::store::memory::MemoryStore;
    use common::Role;

    fn new_book(title: &str, total_copies: i32) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Chinua Achebe".to_string(),
            isbn: None,
            category: None,
            genre: Some("Fiction".to_string()),
            book_type: None,
            description: None,
            publication_year: Some(1958),
            total_copies,
        }
    }

    async fn setup() -> (MemoryStore, Catalog<MemoryStore>, Identity) {
        let store = MemoryStore::new();
        let publisher = store.add_user("press", Role::Publisher).await;
        let catalog = Catalog::new(store.clone());
        (store, catalog, Identity::new(publisher.id, publisher.role))
    }

    #[tokio::test]
    async fn created_book_has_every_copy_available() {
        let (_, catalog, publisher) = setup().await;
        let book = catalog
            .create_book(&publisher, new_book("Things Fall Apart", 4))
            .await
            .unwrap();

        assert_eq!((book.total_copies, book.available_copies), (4, 4));
        assert_eq!(book.publisher_id, Some(publisher.user_id));
        assert_eq!(book.category, DEFAULT_CATEGORY);
        assert_eq!(book.book_type, BookType::Physical);
    }

    #[tokio::test]
    async fn readers_cannot_create_books() {
        let (store, catalog, _) = setup().await;
        let reader = store.add_user("reader", Role::User).await;
        let err = catalog
            .create_book(&Identity::new(reader.id, reader.role), new_book("Arrow of God", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Forbidden));
    }

    #[tokio::test]
    async fn invalid_fields_are_reported_together() {
        let (_, catalog, publisher) = setup().await;
        let mut draft = new_book("  ", 0);
        draft.author = String::new();
        draft.publication_year = Some(99);

        match catalog.create_book(&publisher, draft).await {
            Err(LibraryError::Validation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected() {
        let (_, catalog, publisher) = setup().await;
        let mut first = new_book("No Longer at Ease", 1);
        first.isbn = Some("9780385474559".to_string());
        catalog.create_book(&publisher, first.clone()).await.unwrap();

        let err = catalog.create_book(&publisher, first).await.unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));
    }

    #[tokio::test]
    async fn update_applies_copy_rules_with_the_details() {
        let (store, catalog, publisher) = setup().await;
        let book = catalog
            .create_book(&publisher, new_book("Anthills of the Savannah", 3))
            .await
            .unwrap();
        let mut on_loan = store.book(book.id).await.unwrap();
        on_loan.available_copies = 1;
        store.add_book(on_loan).await;

        let rejected = catalog
            .update_book(
                &publisher,
                book.id,
                BookUpdate {
                    title: Some("Renamed".to_string()),
                    total_copies: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(rejected, LibraryError::InvalidCopyCount { .. }));
        assert_eq!(store.book(book.id).await.unwrap().title, book.title);

        let updated = catalog
            .update_book(
                &publisher,
                book.id,
                BookUpdate {
                    title: Some("Renamed".to_string()),
                    genre: Some(String::new()),
                    total_copies: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.genre, None);
        assert_eq!((updated.total_copies, updated.available_copies), (5, 3));
    }

    #[tokio::test]
    async fn attaching_a_cover_reports_the_replaced_file() {
        let (_, catalog, publisher) = setup().await;
        let book = catalog
            .create_book(&publisher, new_book("Girls at War", 1))
            .await
            .unwrap();

        let (_, replaced) = catalog
            .attach_file(&publisher, book.id, BlobKind::Cover, "a.png".to_string())
            .await
            .unwrap();
        assert_eq!(replaced, None);

        let (book, replaced) = catalog
            .attach_file(&publisher, book.id, BlobKind::Cover, "b.png".to_string())
            .await
            .unwrap();
        assert_eq!(replaced.as_deref(), Some("a.png"));
        assert_eq!(book.cover_image.as_deref(), Some("b.png"));
    }

    #[tokio::test]
    async fn listing_filters_and_pages() {
        let (_, catalog, publisher) = setup().await;
        for title in ["Half of a Yellow Sun", "Purple Hibiscus", "Americanah"] {
            catalog
                .create_book(&publisher, new_book(title, 1))
                .await
                .unwrap();
        }

        let page = catalog
            .list_books(&BookQuery {
                search: Some("HIBISCUS".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Purple Hibiscus");

        let page = catalog
            .list_books(&BookQuery {
                limit: Some(2),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);

        let labels = catalog.labels().await.unwrap();
        assert_eq!(labels.categories, vec![DEFAULT_CATEGORY.to_string()]);
        assert_eq!(labels.genres, vec!["Fiction".to_string()]);
    }
}
