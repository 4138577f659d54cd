//! Application state shared across handlers

use common::cache::RedisPool;
use sqlx::PgPool;

use crate::{
    blob::BlobStore, catalog::Catalog, ledger::BorrowingLedger, middleware::TokenVerifier,
    reports::Reports, repositories::PgLibraryStore, reviews::ReviewService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub store: PgLibraryStore,
    pub ledger: BorrowingLedger<PgLibraryStore>,
    pub catalog: Catalog<PgLibraryStore>,
    pub reviews: ReviewService<PgLibraryStore>,
    pub reports: Reports<PgLibraryStore>,
    pub blobs: BlobStore,
    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        redis_pool: RedisPool,
        blobs: BlobStore,
        tokens: TokenVerifier,
        loan_period_days: i64,
    ) -> Self {
        let store = PgLibraryStore::new(db_pool.clone());
        Self {
            ledger: BorrowingLedger::with_loan_period(store.clone(), loan_period_days),
            catalog: Catalog::new(store.clone()),
            reviews: ReviewService::new(store.clone()),
            reports: Reports::new(store.clone()),
            store,
            db_pool,
            redis_pool,
            blobs,
            tokens,
        }
    }
}
