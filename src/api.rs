//! REST surface under `/api`. Reads are public; contest writes need an admin bearer token
//! obtained from `/api/auth/login`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use diesel::SqliteConnection;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::model::{
    Contest, ContestUpdate, ErrorDetail, InvalidContest, LoginRequest, LoginResponse,
    NewContest, CLASS_LEVELS,
};
use crate::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub admin_password: String,
}

impl AppState {
    pub fn new(pool: DbPool, admin_password: impl Into<String>) -> Self {
        AppState {
            pool,
            admin_password: admin_password.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (status, Json(ErrorDetail { detail })).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ApiError::NotFound("Not found".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<InvalidContest> for ApiError {
    fn from(err: InvalidContest) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

/// `Json<T>` whose rejections (bad JSON, wrong content type) come back as a 400 `ErrorDetail`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Path<T>` with the same error shape as [`ApiJson`].
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

fn contest_not_found(contest_id: i32) -> ApiError {
    ApiError::NotFound(format!("Contest with id {} not found", contest_id))
}

/// Runs `f` with a pooled connection on the blocking thread pool.
async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for routes that require a valid admin session. Holds the verified token.
#[derive(Debug, Clone)]
pub struct AdminToken(pub String);

impl FromRequestParts<AppState> for AdminToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| {
                ApiError::Unauthorized("Missing or invalid authorization header".to_string())
            })?
            .to_string();

        let candidate = token.clone();
        let is_valid =
            with_conn(&state.pool, move |conn| {
                Ok(crate::validate_admin_token(conn, &candidate)?)
            })
            .await?;
        if !is_valid {
            return Err(ApiError::Unauthorized(
                "Invalid or expired token".to_string(),
            ));
        }
        Ok(AdminToken(token))
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_contests(State(state): State<AppState>) -> Result<Json<Vec<Contest>>, ApiError> {
    let contests = with_conn(&state.pool, |conn| Ok(crate::get_all_contests(conn)?)).await?;
    Ok(Json(contests))
}

pub async fn get_contest(
    State(state): State<AppState>,
    ApiPath(contest_id): ApiPath<i32>,
) -> Result<Json<Contest>, ApiError> {
    let contest = with_conn(&state.pool, move |conn| {
        crate::get_contest(conn, contest_id).map_err(|e| match e {
            diesel::result::Error::NotFound => contest_not_found(contest_id),
            other => other.into(),
        })
    })
    .await?;
    Ok(Json(contest))
}

pub async fn list_contests_by_class(
    State(state): State<AppState>,
    ApiPath(class_level): ApiPath<i32>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    if !CLASS_LEVELS.contains(&class_level) {
        return Err(ApiError::BadRequest(
            "Class level must be between 9 and 12".to_string(),
        ));
    }
    let contests = with_conn(&state.pool, move |conn| {
        Ok(crate::get_contests_by_class(conn, class_level)?)
    })
    .await?;
    Ok(Json(contests))
}

pub async fn list_contests_by_year(
    State(state): State<AppState>,
    ApiPath(year): ApiPath<i32>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    let contests =
        with_conn(&state.pool, move |conn| Ok(crate::get_contests_by_year(conn, year)?)).await?;
    Ok(Json(contests))
}

pub async fn create_contest(
    State(state): State<AppState>,
    _admin: AdminToken,
    ApiJson(payload): ApiJson<NewContest>,
) -> Result<(StatusCode, Json<Contest>), ApiError> {
    let new_contest = payload.normalized();
    new_contest.validate()?;

    let contest =
        with_conn(&state.pool, move |conn| Ok(crate::create_contest(conn, &new_contest)?))
            .await?;
    tracing::info!(
        "Created contest {} (class {}, {}, pre #{})",
        contest.id,
        contest.class_level,
        contest.year,
        contest.pre_number
    );
    Ok((StatusCode::CREATED, Json(contest)))
}

pub async fn update_contest(
    State(state): State<AppState>,
    _admin: AdminToken,
    ApiPath(contest_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ContestUpdate>,
) -> Result<Json<Contest>, ApiError> {
    let contest = with_conn(&state.pool, move |conn| {
        crate::update_contest(conn, contest_id, payload, |merged| {
            merged.validate().map_err(ApiError::from)
        })
        .map_err(|e| match e {
            ApiError::NotFound(_) => contest_not_found(contest_id),
            other => other,
        })
    })
    .await?;
    tracing::info!("Updated contest {}", contest.id);
    Ok(Json(contest))
}

pub async fn delete_contest(
    State(state): State<AppState>,
    _admin: AdminToken,
    ApiPath(contest_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.pool, move |conn| {
        crate::delete_contest(conn, contest_id).map_err(|e| match e {
            diesel::result::Error::NotFound => contest_not_found(contest_id),
            other => other.into(),
        })
    })
    .await?;
    tracing::info!("Deleted contest {}", contest_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.password.is_empty() || payload.password != state.admin_password {
        tracing::warn!("Rejected admin login attempt");
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    let token = with_conn(&state.pool, |conn| Ok(crate::create_admin_session(conn)?)).await?;
    tracing::info!("Admin session created");
    Ok(Json(LoginResponse { token }))
}

/// Drops the caller's session. Any bearer token is accepted; unknown ones are a no-op.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ErrorDetail>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid authorization header".to_string())
        })?
        .to_string();

    with_conn(&state.pool, move |conn| {
        Ok(crate::revoke_admin_session(conn, &token)?)
    })
    .await?;
    Ok(Json(ErrorDetail {
        detail: "logged out".to_string(),
    }))
}

/// Builds the CORS layer from configured origins. Origins that aren't valid header values are
/// skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// The `/api` router. Generic over the outer router's state so it can be nested into the
/// leptos router.
pub fn router<S>(state: AppState, cors_origins: &[String]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/contests", get(list_contests).post(create_contest))
        .route(
            "/contests/{id}",
            get(get_contest).put(update_contest).delete(delete_contest),
        )
        .route("/contests/class/{class_level}", get(list_contests_by_class))
        .route("/contests/year/{year}", get(list_contests_by_year))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
