//! The scripted session: look up media, log in or restore a saved session,
//! download a few posts and a story, then upload them again.
//!
//! Only the session step is fatal. Every other step that fails is logged,
//! recorded in `Summary::skipped` and the walk continues.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use restapi_core::{settings, Transport};

use crate::api::RestApi;

pub const ENV_USERNAME: &str = "RESTAPI_USERNAME";
pub const ENV_PASSWORD: &str = "RESTAPI_PASSWORD";
pub const ENV_SETTINGS: &str = "RESTAPI_SETTINGS";

const SAMPLE_CODE: &str = "B1LbfVPlwIA";
const PHOTO_URL: &str = "https://www.instagram.com/p/COQebHWhRUg/";
const VIDEO_URL: &str = "https://www.instagram.com/p/CGgDsi7JQdS/";
const IGTV_URL: &str = "https://www.instagram.com/p/CRHO6N6HLvQ/";
const STORY_OWNER: &str = "therock";

#[derive(Debug, Clone)]
pub struct Options {
    pub username: String,
    pub password: String,
    pub settings_path: PathBuf,
}

impl Options {
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            username: var(ENV_USERNAME, "example"),
            password: var(ENV_PASSWORD, "test"),
            settings_path: PathBuf::from(var(ENV_SETTINGS, "./settings.json")),
        }
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub sessionid: String,
    /// True when the session came from the settings file rather than a login.
    pub restored: bool,
    /// Server-side paths of downloaded media.
    pub downloaded: Vec<String>,
    pub uploads: usize,
    /// Names of the steps that failed and were skipped.
    pub skipped: Vec<String>,
}

impl Summary {
    fn attempt<V>(&mut self, step: &str, result: restapi_core::Result<V>) -> Option<V> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{step} failed: {e}");
                self.skipped.push(step.to_string());
                None
            }
        }
    }
}

pub fn run<T: Transport>(api: &RestApi<T>, options: &Options) -> Result<Summary> {
    let mut summary = Summary::default();

    if let Some(version) = summary.attempt("version", api.version()) {
        info!("version: {version}");
    }
    if let Some(pk) = summary.attempt("pk_from_code", api.pk_from_code(SAMPLE_CODE)) {
        info!("pk_from_code: {SAMPLE_CODE} -> {pk}");
    }

    let saved = settings::load(&options.settings_path)?;
    let sessionid = if settings::is_empty(&saved) {
        api.login(&options.username, &options.password, "")
            .with_context(|| format!("login as {} failed", options.username))?
    } else {
        summary.restored = true;
        api.set_settings("", &saved)
            .context("restoring the saved session failed")?
    };
    info!("sessionid: {sessionid}");

    if let Some(fresh) = summary.attempt("settings_get", api.get_settings(&sessionid)) {
        if !settings::is_empty(&fresh) {
            settings::save(&options.settings_path, &fresh)?;
        }
    }

    let photo = summary
        .attempt("photo_download", api.pk_from_url(PHOTO_URL).and_then(|pk| api.photo_download(&sessionid, &pk, "")));
    let video = summary
        .attempt("video_download", api.pk_from_url(VIDEO_URL).and_then(|pk| api.video_download(&sessionid, &pk, "")));
    let igtv = summary
        .attempt("igtv_download", api.pk_from_url(IGTV_URL).and_then(|pk| api.igtv_download(&sessionid, &pk, "")));
    summary.downloaded.extend([&photo, &video, &igtv].into_iter().flatten().cloned());

    if let Some(photo) = &photo {
        if let Some(story) = summary.attempt("photo_upload_to_story", api.photo_upload_to_story(&sessionid, photo)) {
            info!("photo_upload_to_story: {story}");
            summary.uploads += 1;
        }
    }

    let stories = summary.attempt(
        "user_stories",
        api.id_from_username(&sessionid, STORY_OWNER)
            .and_then(|user_id| api.user_stories(&sessionid, &user_id, 1)),
    );
    if let Some(story_pk) = stories.as_ref().and_then(|pks| pks.first()) {
        if let Some(path) = summary.attempt("story_download", api.story_download(&sessionid, story_pk, "")) {
            summary.downloaded.push(path);
        }
    }

    if let (Some(photo), Some(video)) = (&photo, &video) {
        if let Some(album) = summary.attempt("album_upload", api.album_upload(&sessionid, &[photo, video], "hello world")) {
            info!("album_upload: {album}");
            summary.uploads += 1;
        }
    }

    summary.sessionid = sessionid;
    Ok(summary)
}
