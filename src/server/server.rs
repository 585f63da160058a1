use anyhow::Result;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::bpm::BPM_COLOR_RANGES;
use crate::editor::{self, AlbumDraft, EditorError, SongDraft};
use crate::library_store::LibraryStore;
use crate::user::auth::AuthTokenValue;
use crate::user::UserRole;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{log_requests, session::AdminSession, state::*, RequestsLoggingLevel, ServerConfig};
use crate::server::session::Session;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

// =============================================================================
// Request/Response Bodies
// =============================================================================

#[derive(Deserialize, Debug)]
struct SignupBody {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Deserialize, Debug)]
struct ArtistBody {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct GenreBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BpmRangeQuery {
    pub min: u16,
    pub max: u16,
}

#[derive(Deserialize, Debug)]
struct TitleSearchQuery {
    pub title: String,
}

#[derive(Serialize)]
struct SavedResponse {
    id: String,
}

/// Store errors surface with the store's message; draft validation
/// failures come back as 422 without any write having happened.
fn editor_error_response(err: EditorError) -> Response {
    match err {
        EditorError::Invalid(validation) => {
            (StatusCode::UNPROCESSABLE_ENTITY, validation.to_string()).into_response()
        }
        EditorError::Store(store_err) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", store_err)).into_response()
        }
    }
}

// =============================================================================
// Home
// =============================================================================

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

// =============================================================================
// Auth
// =============================================================================

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<SignupBody>,
) -> Response {
    // self-service registration always lands on the regular role
    let result = user_manager.lock().unwrap().sign_up(
        &body.email,
        &body.password,
        body.display_name.as_deref(),
        UserRole::User,
    );
    match result {
        Ok(user_id) => (StatusCode::CREATED, Json(user_id)).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, format!("{}", err)).into_response(),
    }
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for {}", body.email);
    let result = user_manager
        .lock()
        .unwrap()
        .sign_in(&body.email, &body.password);

    match result {
        Ok(Some(auth_token)) => {
            let response_body = LoginSuccessResponse {
                token: auth_token.value.0.clone(),
            };
            let response_body = serde_json::to_string(&response_body).unwrap();

            let cookie_value = HeaderValue::from_str(&format!(
                "session_token={}; Path=/; HttpOnly",
                auth_token.value.0
            ))
            .unwrap();
            response::Builder::new()
                .status(StatusCode::CREATED)
                .header(axum::http::header::SET_COOKIE, cookie_value)
                .body(Body::from(response_body))
                .unwrap()
        }
        Ok(None) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => {
            error!("Error during sign-in: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let result = user_manager
        .lock()
        .unwrap()
        .sign_out(&AuthTokenValue(session.token));
    match result {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(axum::http::header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn get_session(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Response {
    let info = user_manager
        .lock()
        .unwrap()
        .session(&AuthTokenValue(session.token));
    match info {
        Ok(Some(info)) => Json(info).into_response(),
        Ok(None) => StatusCode::FORBIDDEN.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// =============================================================================
// Library (read side)
// =============================================================================

async fn get_artists(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
) -> Response {
    match store.list_artists() {
        Ok(artists) => Json(artists).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_artist(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_artist(&id) {
        Ok(Some(artist)) => Json(artist).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_genres(_session: Session, State(store): State<GuardedLibraryStore>) -> Response {
    match store.list_genres() {
        Ok(genres) => Json(genres).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_albums(_session: Session, State(store): State<GuardedLibraryStore>) -> Response {
    match store.list_albums() {
        Ok(albums) => Json(albums).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_album(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_album(&id) {
        Ok(Some(album)) => Json(album).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_resolved_album(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_resolved_album(&id) {
        Ok(Some(album)) => Json(album).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_songs(_session: Session, State(store): State<GuardedLibraryStore>) -> Response {
    match store.list_songs() {
        Ok(songs) => Json(songs).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_song(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.get_song(&id) {
        Ok(Some(song)) => Json(song).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_songs_by_bpm_range(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Query(range): Query<BpmRangeQuery>,
) -> Response {
    match store.songs_by_bpm_range(range.min, range.max) {
        Ok(songs) => Json(songs).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn search_songs(
    _session: Session,
    State(store): State<GuardedLibraryStore>,
    Query(query): Query<TitleSearchQuery>,
) -> Response {
    match store.search_songs(&query.title) {
        Ok(songs) => Json(songs).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn get_bpm_legend(_session: Session) -> Response {
    Json(BPM_COLOR_RANGES).into_response()
}

// =============================================================================
// Admin (write side)
// =============================================================================

async fn post_artist(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Json(body): Json<ArtistBody>,
) -> Response {
    match store.create_artist(&body.name) {
        Ok(artist) => (StatusCode::CREATED, Json(artist)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn put_artist(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(body): Json<ArtistBody>,
) -> Response {
    match store.update_artist(&id, &body.name) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn delete_artist(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.delete_artist(&id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn post_genre(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Json(body): Json<GenreBody>,
) -> Response {
    match store.create_genre(&body.name, body.description.as_deref()) {
        Ok(genre) => (StatusCode::CREATED, Json(genre)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn put_genre(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(body): Json<GenreBody>,
) -> Response {
    match store.update_genre(&id, &body.name, body.description.as_deref()) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn delete_genre(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.delete_genre(&id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

async fn post_album(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Json(draft): Json<AlbumDraft>,
) -> Response {
    match editor::save_album(store.as_ref(), None, &draft) {
        Ok(id) => (StatusCode::CREATED, Json(SavedResponse { id })).into_response(),
        Err(err) => editor_error_response(err),
    }
}

async fn put_album(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(draft): Json<AlbumDraft>,
) -> Response {
    match editor::save_album(store.as_ref(), Some(&id), &draft) {
        Ok(id) => Json(SavedResponse { id }).into_response(),
        Err(err) => editor_error_response(err),
    }
}

async fn delete_album(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match editor::delete_album(store.as_ref(), &id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => editor_error_response(err),
    }
}

async fn post_song(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Json(draft): Json<SongDraft>,
) -> Response {
    match editor::save_song(store.as_ref(), None, &draft) {
        Ok(id) => (StatusCode::CREATED, Json(SavedResponse { id })).into_response(),
        Err(err) => editor_error_response(err),
    }
}

async fn put_song(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    Json(draft): Json<SongDraft>,
) -> Response {
    match editor::save_song(store.as_ref(), Some(&id), &draft) {
        Ok(id) => Json(SavedResponse { id }).into_response(),
        Err(err) => editor_error_response(err),
    }
}

async fn delete_song(
    _session: AdminSession,
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Response {
    match store.delete_song(&id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

// =============================================================================
// App assembly
// =============================================================================

impl ServerState {
    fn new(
        config: ServerConfig,
        library_store: GuardedLibraryStore,
        user_manager: GuardedUserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            library_store,
            user_manager,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    library_store: GuardedLibraryStore,
    user_manager: GuardedUserManager,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), library_store, user_manager);

    let auth_routes: Router = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state.clone());

    let library_routes: Router = Router::new()
        .route("/artists", get(get_artists))
        .route("/artist/{id}", get(get_artist))
        .route("/genres", get(get_genres))
        .route("/albums", get(get_albums))
        .route("/album/{id}", get(get_album))
        .route("/album/{id}/resolved", get(get_resolved_album))
        .route("/songs", get(get_songs))
        .route("/song/{id}", get(get_song))
        .route("/songs/bpm-range", get(get_songs_by_bpm_range))
        .route("/songs/search", get(search_songs))
        .route("/bpm-legend", get(get_bpm_legend))
        .with_state(state.clone());

    let admin_routes: Router = Router::new()
        .route("/artist", post(post_artist))
        .route("/artist/{id}", put(put_artist))
        .route("/artist/{id}", delete(delete_artist))
        .route("/genre", post(post_genre))
        .route("/genre/{id}", put(put_genre))
        .route("/genre/{id}", delete(delete_genre))
        .route("/album", post(post_album))
        .route("/album/{id}", put(put_album))
        .route("/album/{id}", delete(delete_album))
        .route("/song", post(post_song))
        .route("/song/{id}", put(put_song))
        .route("/song/{id}", delete(delete_song))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/library", library_routes)
        .nest("/v1/admin", admin_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    library_store: GuardedLibraryStore,
    user_manager: GuardedUserManager,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, library_store, user_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
