use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use st_core::aggregate::{ArticleView, SummaryView};
use st_core::listing::fetch_first_page;
use st_core::pages::{article_page, listing_page, thread_key, ArticleDetailView, ListingPageView, RenderState};
use st_core::{
    resolve_revision, ArticleListingState, Cursor, Error, ListingController, LoadOutcome, PreviewSession,
};

use crate::discussion::ScriptAttributes;
use crate::logging::Logger;
use crate::AppState;

pub const PREVIEW_COOKIE: &str = "io.prismic.preview";

pub enum ApiError {
    Core(Error),
    UnknownListing(Uuid),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Core(err) => err,
            ApiError::UnknownListing(id) => {
                let body = json!({ "error": format!("Unknown listing session: {}", id), "kind": "unknown_listing" });
                return (StatusCode::NOT_FOUND, Json(body)).into_response();
            }
        };
        let status = match &err {
            Error::PreviewResolution(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::ArticleNotFound(_) => StatusCode::NOT_FOUND,
            Error::ListingFetch(_) | Error::Http(_) | Error::Repository(_) | Error::Mapping(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": err.to_string(), "kind": err.kind() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub preview: bool,
    pub token: Option<String>,
}

fn preview_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Preview state of this request: an explicit `token` wins over the cookie,
/// and either one switches preview on.
pub fn preview_session(headers: &HeaderMap, query: &PreviewQuery) -> PreviewSession {
    let token = query.token.clone().or_else(|| preview_cookie(headers));
    PreviewSession {
        active: query.preview || token.is_some(),
        revision_ref: token,
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<ListingPageView>> {
    let session = preview_session(&headers, &query);
    let page = listing_page(state.repository.as_ref(), &session, state.page_size).await?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct ListingSessionView {
    pub id: Uuid,
    pub items: Vec<SummaryView>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
    pub page_index: u32,
    pub preview: bool,
}

impl ListingSessionView {
    fn new(id: Uuid, listing: &ArticleListingState, preview: bool) -> Self {
        Self {
            id,
            items: listing.items.iter().map(SummaryView::from).collect(),
            cursor: listing.cursor.clone(),
            has_more: listing.has_more(),
            page_index: listing.page_index,
            preview,
        }
    }
}

async fn listing(state: &AppState, id: Uuid) -> ApiResult<Arc<ListingController>> {
    state.listing(&id).await.ok_or(ApiError::UnknownListing(id))
}

pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<ListingSessionView>)> {
    let session = preview_session(&headers, &query);
    let revision = resolve_revision(&session)?;
    let first_page = fetch_first_page(state.repository.as_ref(), &revision, state.page_size).await?;

    let preview = revision.is_draft();
    let controller =
        ListingController::initialize(state.repository.clone(), revision, state.page_size, first_page.clone())?;
    let id = state.insert_listing(controller).await;
    let view = ListingSessionView::new(id, &first_page, preview);

    Logger::new()
        .with_prefix(format!("[listing {}]", id))
        .info(&format!("Created with {} articles", view.items.len()));
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListingSessionView>> {
    let controller = listing(&state, id).await?;
    let snapshot = controller.snapshot().await;
    Ok(Json(ListingSessionView::new(id, &snapshot, controller.revision().is_draft())))
}

pub async fn delete_listing(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> StatusCode {
    if state.remove_listing(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Serialize)]
pub struct LoadNextResponse {
    pub outcome: &'static str,
    pub appended: usize,
    pub listing: ListingSessionView,
}

pub async fn load_next(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<LoadNextResponse>)> {
    let controller = listing(&state, id).await?;
    let logger = Logger::new().with_prefix(format!("[listing {}]", id));

    let outcome = controller.load_next().await.map_err(|e| {
        logger.warn(&format!("Load more failed, keeping loaded items: {}", e));
        e
    })?;
    let (status, name, appended) = match outcome {
        LoadOutcome::Appended(n) => (StatusCode::OK, "appended", n),
        LoadOutcome::Exhausted => (StatusCode::OK, "exhausted", 0),
        LoadOutcome::Ignored => (StatusCode::CONFLICT, "ignored", 0),
    };
    logger.debug(&format!("load_next: {}", name));

    let snapshot = controller.snapshot().await;
    Ok((
        status,
        Json(LoadNextResponse {
            outcome: name,
            appended,
            listing: ListingSessionView::new(id, &snapshot, controller.revision().is_draft()),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleView>,
    pub preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion: Option<ScriptAttributes>,
}

impl PostResponse {
    fn from_state(render: RenderState<ArticleDetailView>, discussion: ScriptAttributes) -> (StatusCode, Self) {
        match render {
            RenderState::Loading => (
                StatusCode::ACCEPTED,
                Self { state: "loading", article: None, preview: false, discussion: None },
            ),
            RenderState::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Self { state: "not_found", article: None, preview: false, discussion: None },
            ),
            RenderState::Ready(view) => (
                StatusCode::OK,
                Self {
                    state: "ready",
                    article: Some(view.article),
                    preview: view.preview,
                    discussion: Some(discussion),
                },
            ),
        }
    }
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let session = preview_session(&headers, &query);
    let logger = Logger::new().with_prefix(format!("[post {}]", uid));
    let discussion = state.discussion.script_attributes(&thread_key(&uid));

    let render = async {
        RenderState::from_result(
            article_page(
                state.repository.as_ref(),
                state.renderer.as_ref(),
                state.discussion.as_ref(),
                &uid,
                &session,
            )
            .await,
        )
    };

    let rendered = if state.is_known(&uid).await {
        render.await?
    } else {
        let Some(_resolution) = state.begin_resolution(&uid) else {
            logger.debug("Fallback resolution already running");
            let (status, body) = PostResponse::from_state(RenderState::Loading, discussion);
            return Ok((status, Json(body)));
        };
        logger.info("Not precomputed, resolving on demand");
        let rendered = render.await?;
        if rendered.is_ready() && !session.active {
            state.paths.write().await.insert(uid.clone());
        }
        rendered
    };

    let (status, body) = PostResponse::from_state(rendered, discussion);
    Ok((status, Json(body)))
}

pub async fn get_paths(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let mut paths: Vec<String> = state.paths.read().await.iter().cloned().collect();
    paths.sort();
    Json(paths)
}

#[derive(Debug, Deserialize)]
pub struct EnterPreviewQuery {
    pub token: Option<String>,
}

/// Cookie values are limited to printable ASCII without separators, so a
/// token can never add attributes to the `Set-Cookie` line.
fn is_cookie_safe(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_graphic() && !matches!(c, ';' | ',' | '"' | '\\'))
}

pub async fn enter_preview(Query(query): Query<EnterPreviewQuery>) -> ApiResult<Response> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::PreviewResolution("missing preview token".to_string()))?;
    if !is_cookie_safe(&token) {
        let reason = "preview token contains characters not allowed in a cookie".to_string();
        return Err(Error::PreviewResolution(reason).into());
    }
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", PREVIEW_COOKIE, token);
    Ok(([(header::SET_COOKIE, cookie)], Redirect::temporary("/")).into_response())
}

pub async fn exit_preview() -> Response {
    let cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", PREVIEW_COOKIE);
    ([(header::SET_COOKIE, cookie)], Redirect::temporary("/")).into_response()
}
