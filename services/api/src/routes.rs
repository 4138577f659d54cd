//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    blob::{self, BlobKind},
    error::{ApiError, ApiResult, LibraryError},
    identity::Identity,
    middleware::auth_middleware,
    models::{Book, BookQuery, BookUpdate, CopiesRequest, NewBook, ReturnOutcome, ReviewRequest},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let protected_routes = Router::new()
        .route("/books", post(create_book))
        .route("/books/:id", put(update_book).delete(delete_book))
        .route("/books/:id/copies", put(edit_copies))
        .route("/books/:id/cover", post(upload_cover))
        .route("/books/:id/pdf", post(upload_pdf))
        .route("/books/:id/download", get(download_pdf))
        .route("/books/:id/borrow", post(borrow_book))
        .route("/books/:id/reviews", post(add_review))
        .route("/borrowings/history", get(borrowing_history))
        .route("/borrowings/:id/return", post(return_book))
        .route("/me/stats", get(my_stats))
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(remove_user))
        .route("/publisher/dashboard", get(publisher_dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
        .route("/books/:id/detail", get(book_detail))
        .route("/books/:id/cover", get(get_cover))
        .route("/categories", get(list_categories))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let redis = state.redis_pool.health_check().await.unwrap_or(false);

    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "api-service",
            "database": database,
            "redis": redis,
        })),
    )
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog.list_books(&query).await?))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog.get_book(id).await?))
}

pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reviews.book_detail(id).await?))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog.labels().await?))
}

pub async fn create_book(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<NewBook>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.create_book(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog.update_book(&identity, id, payload).await?))
}

pub async fn edit_copies(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CopiesRequest>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .ledger
        .edit_book_copies(&identity, id, payload.total_copies)
        .await?;
    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let book = state.ledger.delete_book(&identity, id).await?;

    if let Some(cover) = &book.cover_image {
        state.blobs.remove(BlobKind::Cover, cover).await;
    }
    if let Some(pdf) = &book.pdf_file {
        state.blobs.remove(BlobKind::Pdf, pdf).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_cover(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    attach_upload(&state, &identity, id, BlobKind::Cover, multipart).await
}

pub async fn upload_pdf(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    attach_upload(&state, &identity, id, BlobKind::Pdf, multipart).await
}

/// Store the multipart `file` field and record it on the book
async fn attach_upload(
    state: &AppState,
    identity: &Identity,
    book_id: Uuid,
    kind: BlobKind,
    mut multipart: Multipart,
) -> ApiResult<Json<Book>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let stored = state.blobs.save(kind, &file_name, &data).await?;
        let (book, replaced) = match state
            .catalog
            .attach_file(identity, book_id, kind, stored.clone())
            .await
        {
            Ok(attached) => attached,
            Err(e) => {
                state.blobs.remove(kind, &stored).await;
                return Err(e.into());
            }
        };
        if let Some(old) = replaced {
            state.blobs.remove(kind, &old).await;
        }

        return Ok(Json(book));
    }

    Err(ApiError::BadRequest("Missing file field".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Serve inline instead of as an attachment
    #[serde(default)]
    pub view: bool,
}

pub async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.get_book(id).await?;
    let stored = book.pdf_file.ok_or(LibraryError::NotFound("PDF"))?;
    let bytes = state.blobs.read(BlobKind::Pdf, &stored).await?;

    let file_name = stored.split_once('_').map_or(stored.as_str(), |(_, name)| name);
    let disposition = if query.view { "inline" } else { "attachment" };

    Ok((
        [
            (header::CONTENT_TYPE, blob::content_type(&stored).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{}\"", disposition, file_name),
            ),
        ],
        bytes,
    ))
}

pub async fn get_cover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.get_book(id).await?;
    let stored = book.cover_image.ok_or(LibraryError::NotFound("Cover"))?;
    let bytes = state.blobs.read(BlobKind::Cover, &stored).await?;

    Ok(([(header::CONTENT_TYPE, blob::content_type(&stored))], bytes))
}

pub async fn borrow_book(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let borrowing = state.ledger.borrow_book(&identity, id).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

pub async fn return_book(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.ledger.return_book(&identity, id).await?;
    let (status, message) = match &outcome {
        ReturnOutcome::Returned(_) => ("returned", "Book returned successfully"),
        ReturnOutcome::AlreadyReturned(_) => ("already_returned", "This book was already returned"),
    };

    Ok(Json(json!({
        "status": status,
        "message": message,
        "borrowing": outcome.borrowing(),
    })))
}

pub async fn borrowing_history(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reports.borrowing_history(&identity).await?))
}

pub async fn my_stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reports.borrow_stats(&identity).await?))
}

pub async fn add_review(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = state
        .reviews
        .add_review(&identity, id, payload.rating, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reports.admin_dashboard(&identity).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reports.list_users(&identity).await?))
}

pub async fn remove_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let removal = state
        .ledger
        .deactivate_or_delete_user(&identity, id)
        .await?;

    info!(admin_id = %identity.user_id, user_id = %id, ?removal, "User removed");
    Ok(Json(json!({ "user_id": id, "result": removal })))
}

pub async fn publisher_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.reports.publisher_dashboard(&identity).await?))
}
