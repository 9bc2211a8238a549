//! In-memory imitation of the social-media automation REST API.
//!
//! Covers the endpoints the client exercises: version, media pk lookup,
//! login and settings, user id lookup, downloads, stories and uploads.
//! Sessions live in memory; downloads write small placeholder files so
//! returned paths can be uploaded again.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEMO_USERNAME: &str = "example";
pub const DEMO_PASSWORD: &str = "test";

const SHORTCODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const FIRST_STORY_PK: u64 = 2_581_283_651_347_470_453;

#[derive(Clone, Debug)]
struct Session {
    username: String,
    settings: String,
}

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    accounts: Arc<HashMap<String, String>>,
    download_dir: PathBuf,
}

impl AppState {
    /// State with the demo account and downloads written under `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        let accounts = HashMap::from([(DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string())]);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            accounts: Arc::new(accounts),
            download_dir: download_dir.into(),
        }
    }

    async fn username(&self, sessionid: &str) -> Result<String, ServerError> {
        self.sessions
            .read()
            .await
            .get(sessionid.trim())
            .map(|session| session.username.clone())
            .ok_or(ServerError::UnknownSession)
    }
}

/// One story as returned by `/story/user_stories`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Story {
    pub pk: String,
    pub id: String,
    pub code: String,
    pub media_type: u8,
    pub user_id: String,
}

#[derive(Debug)]
enum ServerError {
    BadRequest(String),
    UnknownSession,
    InvalidCredentials,
    Io(std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ServerError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ServerError::UnknownSession => (StatusCode::UNAUTHORIZED, "unknown session".to_string()),
            ServerError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "the password you entered is incorrect".to_string(),
            ),
            ServerError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        warn!("{status}: {detail}");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/version", get(version))
        .route("/media/pk_from_code", get(pk_from_code))
        .route("/media/pk_from_url", get(pk_from_url))
        .route("/auth/login", post(login))
        .route("/auth/relogin", post(relogin))
        .route("/auth/settings/get", get(settings_get))
        .route("/auth/settings/set", post(settings_set))
        .route("/user/id_from_username", post(id_from_username))
        .route("/photo/download", post(photo_download))
        .route("/video/download", post(video_download))
        .route("/igtv/download", post(igtv_download))
        .route("/story/download", post(story_download))
        .route("/story/user_stories", post(user_stories))
        .route("/album/upload", post(album_upload))
        .route("/photo/upload_to_story", post(photo_upload_to_story))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

/// Media pk encoded by an Instagram shortcode (base 64, most significant digit first).
pub fn pk_from_shortcode(code: &str) -> Option<u64> {
    if code.is_empty() {
        return None;
    }
    code.bytes().try_fold(0u64, |pk, c| {
        let digit = SHORTCODE_ALPHABET.iter().position(|&a| a == c)? as u64;
        pk.checked_mul(64)?.checked_add(digit)
    })
}

/// Shortcode from a post URL such as `https://www.instagram.com/p/COQebHWhRUg/`.
pub fn shortcode_from_url(url: &str) -> Option<&str> {
    let mut segments = url.split('/').skip_while(|s| !matches!(*s, "p" | "reel" | "tv"));
    segments.next()?;
    segments.next().filter(|code| !code.is_empty())
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "mock-server": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
struct CodeQuery {
    code: String,
}

async fn pk_from_code(Query(query): Query<CodeQuery>) -> Result<String, ServerError> {
    pk_from_shortcode(&query.code)
        .map(|pk| pk.to_string())
        .ok_or_else(|| ServerError::BadRequest(format!("invalid shortcode {:?}", query.code)))
}

#[derive(Deserialize)]
struct UrlQuery {
    url: String,
}

async fn pk_from_url(Query(query): Query<UrlQuery>) -> Result<String, ServerError> {
    shortcode_from_url(&query.url)
        .and_then(pk_from_shortcode)
        .map(|pk| pk.to_string())
        .ok_or_else(|| ServerError::BadRequest(format!("no media code in {:?}", query.url)))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<String, ServerError> {
    if state.accounts.get(&form.username) != Some(&form.password) {
        return Err(ServerError::InvalidCredentials);
    }
    let sessionid = Uuid::new_v4().simple().to_string();
    let settings = json!({
        "uuids": { "phone_id": Uuid::new_v4(), "uuid": Uuid::new_v4() },
        "authorization_data": { "sessionid": sessionid },
        "username": form.username,
    });
    let settings = serde_json::to_string_pretty(&settings)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    state.sessions.write().await.insert(
        sessionid.clone(),
        Session {
            username: form.username.clone(),
            settings,
        },
    );
    info!("login {} -> {sessionid}", form.username);
    Ok(sessionid)
}

#[derive(Deserialize)]
struct SessionForm {
    sessionid: String,
}

async fn relogin(State(state): State<AppState>, Form(form): Form<SessionForm>) -> Result<String, ServerError> {
    state.username(&form.sessionid).await?;
    Ok("true".to_string())
}

async fn settings_get(State(state): State<AppState>, Query(query): Query<SessionForm>) -> Result<String, ServerError> {
    state
        .sessions
        .read()
        .await
        .get(query.sessionid.trim())
        .map(|session| session.settings.clone())
        .ok_or(ServerError::UnknownSession)
}

#[derive(Deserialize)]
struct SettingsForm {
    settings: String,
    #[serde(default)]
    sessionid: String,
}

/// Restore a session from a settings blob. The blob is stored verbatim so
/// `settings/get` returns exactly what was set.
async fn settings_set(State(state): State<AppState>, Form(form): Form<SettingsForm>) -> Result<String, ServerError> {
    let parsed: serde_json::Value = serde_json::from_str(&form.settings)
        .map_err(|e| ServerError::BadRequest(format!("settings are not JSON: {e}")))?;

    let sessionid = parsed["authorization_data"]["sessionid"]
        .as_str()
        .map(str::to_string)
        .or_else(|| Some(form.sessionid.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let username = parsed["username"].as_str().unwrap_or(DEMO_USERNAME).to_string();

    state.sessions.write().await.insert(
        sessionid.clone(),
        Session {
            username,
            settings: form.settings,
        },
    );
    Ok(sessionid)
}

#[derive(Deserialize)]
struct UsernameForm {
    sessionid: String,
    username: String,
}

async fn id_from_username(State(state): State<AppState>, Form(form): Form<UsernameForm>) -> Result<String, ServerError> {
    state.username(&form.sessionid).await?;
    if form.username.is_empty() {
        return Err(ServerError::BadRequest("username is required".to_string()));
    }
    Ok(user_id_for(&form.username).to_string())
}

/// Stable numeric id for a username.
fn user_id_for(username: &str) -> u64 {
    username
        .bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
        % 1_000_000_000
        + 1
}

#[derive(Deserialize)]
struct DownloadForm {
    sessionid: String,
    #[serde(alias = "story_pk")]
    media_pk: String,
    #[serde(default)]
    folder: String,
    #[serde(rename = "returnFile", default)]
    return_file: Option<String>,
}

async fn photo_download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Result<Response, ServerError> {
    download(state, form, "jpg", "image/jpeg").await
}

async fn video_download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Result<Response, ServerError> {
    download(state, form, "mp4", "video/mp4").await
}

async fn igtv_download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Result<Response, ServerError> {
    download(state, form, "mp4", "video/mp4").await
}

async fn story_download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Result<Response, ServerError> {
    download(state, form, "jpg", "image/jpeg").await
}

/// Write a placeholder media file and answer with its path, or with its
/// bytes when `returnFile` is true (the default).
async fn download(
    state: AppState,
    form: DownloadForm,
    extension: &str,
    content_type: &'static str,
) -> Result<Response, ServerError> {
    let username = state.username(&form.sessionid).await?;
    let pk: u64 = form
        .media_pk
        .trim()
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid pk {:?}", form.media_pk)))?;

    let folder = if form.folder.is_empty() {
        state.download_dir.clone()
    } else {
        PathBuf::from(&form.folder)
    };
    let path = folder.join(format!("{username}_{pk}.{extension}"));
    let content = format!("placeholder {extension} for media {pk}").into_bytes();
    tokio::fs::write(&path, &content).await.map_err(ServerError::Io)?;
    info!("downloaded {pk} to {}", path.display());

    let return_file = !matches!(
        form.return_file.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("false" | "0" | "no" | "off")
    );
    if return_file {
        Ok(([(header::CONTENT_TYPE, content_type)], content).into_response())
    } else {
        Ok(path.display().to_string().into_response())
    }
}

#[derive(Deserialize)]
struct UserStoriesForm {
    sessionid: String,
    user_id: String,
    #[serde(default)]
    amount: Option<String>,
}

async fn user_stories(
    State(state): State<AppState>,
    Form(form): Form<UserStoriesForm>,
) -> Result<Json<Vec<Story>>, ServerError> {
    state.username(&form.sessionid).await?;
    let amount = match form.amount.as_deref().map(str::trim) {
        None | Some("") => 3,
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ServerError::BadRequest(format!("invalid amount {raw:?}")))?,
    };

    let stories = (0..amount.min(3))
        .map(|i| {
            let pk = FIRST_STORY_PK + i;
            Story {
                pk: pk.to_string(),
                id: format!("{pk}_{}", form.user_id),
                code: format!("story{i}"),
                media_type: 1,
                user_id: form.user_id.clone(),
            }
        })
        .collect();
    Ok(Json(stories))
}

struct Upload {
    field: String,
    file_name: String,
    size: usize,
}

/// Split a multipart body into text fields and file parts.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Vec<Upload>), ServerError> {
    let bad = |e: axum::extract::multipart::MultipartError| ServerError::BadRequest(e.body_text());
    let mut fields = HashMap::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        match file_name {
            Some(file_name) => {
                let size = field.bytes().await.map_err(bad)?.len();
                uploads.push(Upload {
                    field: name,
                    file_name,
                    size,
                });
            }
            None => {
                let value = field.text().await.map_err(bad)?;
                fields.insert(name, value);
            }
        }
    }
    Ok((fields, uploads))
}

async fn album_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ServerError> {
    let (fields, uploads) = read_multipart(multipart).await?;
    let sessionid = fields.get("sessionid").map(String::as_str).unwrap_or_default();
    let username = state.username(sessionid).await?;

    let files: Vec<&Upload> = uploads.iter().filter(|u| u.field == "files").collect();
    if files.len() < 2 {
        return Err(ServerError::BadRequest(format!(
            "an album needs at least 2 files, got {}",
            files.len()
        )));
    }
    let caption = fields.get("caption").cloned().unwrap_or_default();
    let pk = (Uuid::new_v4().as_u128() as u64) >> 1;

    Ok(Json(json!({
        "pk": pk.to_string(),
        "media_type": 8,
        "caption_text": caption,
        "user": { "username": username },
        "resources": files
            .iter()
            .map(|f| json!({ "file_name": f.file_name, "size": f.size }))
            .collect::<Vec<_>>(),
    })))
}

async fn photo_upload_to_story(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ServerError> {
    let (fields, uploads) = read_multipart(multipart).await?;
    let sessionid = fields.get("sessionid").map(String::as_str).unwrap_or_default();
    let username = state.username(sessionid).await?;

    let file = uploads
        .iter()
        .find(|u| u.field == "file")
        .ok_or_else(|| ServerError::BadRequest("file is required".to_string()))?;
    let pk = FIRST_STORY_PK + 100;
    let user_id = user_id_for(&username);

    Ok(Json(json!({
        "pk": pk.to_string(),
        "id": format!("{pk}_{user_id}"),
        "media_type": 1,
        "file_name": file.file_name,
        "size": file.size,
    })))
}
