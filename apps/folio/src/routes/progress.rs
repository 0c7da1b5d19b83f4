//! Reading progress API routes
//!
//! Only readers have progress; the gateway-supplied identity is checked by
//! [`RequireReader`] on every route.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::RequireReader;
use crate::db::{ProgressRepository, ReadingProgress};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the progress router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_progress).post(save_progress))
        .route("/:book_id", get(get_progress))
}

/// Book id as sent by clients: catalog ids are numeric, but strings are accepted
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BookIdInput {
    Number(u64),
    Text(String),
}

impl BookIdInput {
    /// Normalized key, `None` when the id is empty or zero
    pub fn into_key(self) -> Option<String> {
        match self {
            Self::Number(0) => None,
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

/// Page number as sent by clients: a number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LastPageInput {
    Number(u64),
    Text(String),
}

impl LastPageInput {
    /// Page number, `None` when zero, non-numeric or out of range
    pub fn into_page(self) -> Option<u32> {
        let page = match self {
            Self::Number(n) => u32::try_from(n).ok()?,
            Self::Text(s) => s.trim().parse().ok()?,
        };
        (page > 0).then_some(page)
    }
}

/// Save request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub book_id: Option<BookIdInput>,
    pub last_page: Option<LastPageInput>,
}

#[derive(Debug, Serialize)]
pub struct LastPageResponse {
    pub last_page: u32,
}

#[derive(Debug, Serialize)]
pub struct ProgressEntry {
    pub book_id: String,
    pub last_page: u32,
    pub updated_at: String,
}

/// Stored page as served to clients; rows outside `u32` are corrupt
fn stored_page(progress: &ReadingProgress) -> Result<u32> {
    u32::try_from(progress.last_page).map_err(|_| {
        AppError::Internal(format!(
            "stored last_page {} for book {} is out of range",
            progress.last_page, progress.book_id
        ))
    })
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// List all progress of the caller
async fn list_progress(
    State(state): State<AppState>,
    RequireReader(reader): RequireReader,
) -> Result<Json<Vec<ProgressEntry>>> {
    let repo = ProgressRepository::new(state.db());
    let progress = repo
        .list(&reader.user_id)
        .await?
        .into_iter()
        .map(|p| -> Result<ProgressEntry> {
            Ok(ProgressEntry {
                last_page: stored_page(&p)?,
                book_id: p.book_id,
                updated_at: p.updated_at,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(progress))
}

/// Get the last page for a book; page 1 when nothing was saved
async fn get_progress(
    State(state): State<AppState>,
    RequireReader(reader): RequireReader,
    Path(book_id): Path<String>,
) -> Result<Json<LastPageResponse>> {
    let repo = ProgressRepository::new(state.db());
    let last_page = match repo.get(&reader.user_id, &book_id).await? {
        Some(progress) => stored_page(&progress)?,
        None => 1,
    };
    Ok(Json(LastPageResponse { last_page }))
}

/// Save the last page for a book
async fn save_progress(
    State(state): State<AppState>,
    RequireReader(reader): RequireReader,
    payload: std::result::Result<Json<SaveProgressRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let book_id = request.book_id.and_then(BookIdInput::into_key);
    let last_page = request.last_page.and_then(LastPageInput::into_page);
    let (Some(book_id), Some(last_page)) = (book_id, last_page) else {
        return Err(AppError::BadRequest("Missing data".to_string()));
    };

    let repo = ProgressRepository::new(state.db());
    repo.upsert(&reader.user_id, &book_id, i64::from(last_page)).await?;

    tracing::info!(user_id = %reader.user_id, book_id = %book_id, last_page, "Progress saved");
    Ok(Json(MessageResponse {
        message: "Progress saved",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::auth::{READER_ID_HEADER, READER_ROLE_HEADER};
    use crate::config::Config;
    use crate::db::create_pool;
    use crate::routes::build_router;

    async fn app() -> Router {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        build_router(AppState::new(Config::default(), pool))
    }

    fn request(method: &str, uri: &str, role: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder
                .header(READER_ID_HEADER, "u1")
                .header(READER_ROLE_HEADER, role);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_book_reads_page_one() {
        let app = app().await;
        let response = app
            .oneshot(request("GET", "/api/progress/99", Some("user"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({ "last_page": 1 }));
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/progress",
                Some("reader"),
                Some(r#"{"bookId": 5, "lastPage": 17}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": "Progress saved" })
        );

        let response = app
            .clone()
            .oneshot(request("GET", "/api/progress/5", Some("reader"), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!({ "last_page": 17 }));

        let response = app
            .oneshot(request("GET", "/api/progress", Some("reader"), None))
            .await
            .unwrap();
        let list = json_body(response).await;
        assert_eq!(list[0]["book_id"], "5");
        assert_eq!(list[0]["last_page"], 17);
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_request() {
        let app = app().await;
        for body in [
            r#"{"lastPage": 3}"#,
            r#"{"bookId": "5"}"#,
            r#"{"bookId": 5, "lastPage": 0}"#,
            r#"{"bookId": "", "lastPage": 2}"#,
            r#"not json"#,
        ] {
            let response = app
                .clone()
                .oneshot(request("POST", "/api/progress", Some("user"), Some(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_identity_required() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/progress/5", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(request("GET", "/api/progress/5", Some("admin"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_numeric_string_page_is_accepted() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/progress",
                Some("reader"),
                Some(r#"{"bookId": "abc", "lastPage": " 3 "}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/progress/abc", Some("reader"), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!({ "last_page": 3 }));

        let response = app
            .oneshot(request(
                "POST",
                "/api/progress",
                Some("reader"),
                Some(r#"{"bookId": "abc", "lastPage": "three"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_last_page_input() {
        assert_eq!(LastPageInput::Number(7).into_page(), Some(7));
        assert_eq!(LastPageInput::Number(0).into_page(), None);
        assert_eq!(LastPageInput::Number(u64::MAX).into_page(), None);
        assert_eq!(LastPageInput::Text("12".to_string()).into_page(), Some(12));
        assert_eq!(LastPageInput::Text("0".to_string()).into_page(), None);
        assert_eq!(LastPageInput::Text("-4".to_string()).into_page(), None);
    }

    #[tokio::test]
    async fn test_out_of_range_stored_page_is_internal_error() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        ProgressRepository::new(&pool)
            .upsert("u1", "9", i64::from(u32::MAX) + 1)
            .await
            .unwrap();
        let app = build_router(AppState::new(Config::default(), pool));

        let response = app
            .clone()
            .oneshot(request("GET", "/api/progress/9", Some("reader"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "internal_error");

        let response = app
            .oneshot(request("GET", "/api/progress", Some("reader"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
