//! HTTP surface: `GET /rooms` lists every open room.
//!
//! The caller must present a valid session either as the raw
//! `Authorization` header value (a `Bearer ` prefix is tolerated) or as
//! the `sessionId` query parameter.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use raidforge_protocol::RoomSnapshot;
use raidforge_session::{SessionError, SessionStore};
use raidforge_store::KvStore;
use serde::{Deserialize, Serialize};

use crate::RaidError;
use crate::catalog::UserCatalog;
use crate::coordinator::RaidCoordinator;
use crate::reward::LedgerService;

/// State shared by the HTTP handlers.
pub(crate) struct HttpState<S, U, L, A> {
    pub(crate) coordinator: RaidCoordinator<S, U, L>,
    pub(crate) sessions: Arc<A>,
}

impl<S, U, L, A> Clone for HttpState<S, U, L, A> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// JSON body of a failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// Adapts [`RaidError`] to an HTTP response.
pub(crate) struct ApiError(RaidError);

impl<E: Into<RaidError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the router for the HTTP listener.
pub(crate) fn router<S, U, L, A>(state: HttpState<S, U, L, A>) -> Router
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    Router::new()
        .route("/rooms", get(list_rooms::<S, U, L, A>))
        .with_state(state)
}

async fn list_rooms<S, U, L, A>(
    State(state): State<HttpState<S, U, L, A>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<RoomSnapshot>>, ApiError>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    let token = session_token(&headers, &query).ok_or_else(|| {
        SessionError::Unauthorized("missing session".into())
    })?;
    let user_id = state.sessions.resolve_session(&token).await?;
    let rooms = state.coordinator.list_rooms().await?;
    tracing::debug!(%user_id, count = rooms.len(), "listed rooms");
    Ok(Json(rooms))
}

/// Picks the session token from the request, header first.
fn session_token(headers: &HeaderMap, query: &SessionQuery) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty());
    match from_header {
        Some(token) => Some(token.to_string()),
        None => query.session_id.clone().filter(|s| !s.is_empty()),
    }
}
