//! Typed wrappers for the REST API endpoints the walkthrough uses.
//!
//! Each method names one endpoint, passes its parameters the way the server
//! expects them (query, form or multipart) and treats anything but 200 as
//! failure. Session ids are opaque and passed explicitly on every call.

use std::path::Path;

use restapi_core::{check_status, ids, ApiClient, FileAttachment, HttpResponse, Result, Transport, UreqTransport};
use serde::Deserialize;

pub struct RestApi<T = UreqTransport> {
    client: ApiClient<T>,
}

#[derive(Debug, Deserialize)]
struct StoryRef {
    id: String,
}

impl<T: Transport> RestApi<T> {
    pub fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Raw version document.
    pub fn version(&self) -> Result<String> {
        Ok(check_status(self.client.get("/version", &[])?)?.text())
    }

    pub fn pk_from_code(&self, code: &str) -> Result<String> {
        let resp = self.client.get("/media/pk_from_code", &[("code", code)])?;
        Ok(scalar(check_status(resp)?))
    }

    pub fn pk_from_url(&self, url: &str) -> Result<String> {
        let resp = self.client.get("/media/pk_from_url", &[("url", url)])?;
        Ok(scalar(check_status(resp)?))
    }

    /// Log in and return the new session id.
    pub fn login(&self, username: &str, password: &str, verification_code: &str) -> Result<String> {
        let resp = self.client.post_form(
            "/auth/login",
            &[
                ("username", username),
                ("password", password),
                ("verification_code", verification_code),
            ],
        )?;
        Ok(scalar(check_status(resp)?))
    }

    pub fn relogin(&self, sessionid: &str) -> Result<()> {
        check_status(self.client.post_form("/auth/relogin", &[("sessionid", sessionid)])?)?;
        Ok(())
    }

    /// Settings blob for `sessionid`, untouched.
    pub fn get_settings(&self, sessionid: &str) -> Result<String> {
        let resp = self.client.get("/auth/settings/get", &[("sessionid", sessionid)])?;
        Ok(check_status(resp)?.text())
    }

    /// Restore a session from a saved blob; returns its session id.
    pub fn set_settings(&self, sessionid: &str, settings: &str) -> Result<String> {
        let resp = self.client.post_form(
            "/auth/settings/set",
            &[("settings", settings), ("sessionid", sessionid)],
        )?;
        Ok(scalar(check_status(resp)?))
    }

    pub fn id_from_username(&self, sessionid: &str, username: &str) -> Result<String> {
        let resp = self.client.post_form(
            "/user/id_from_username",
            &[("sessionid", sessionid), ("username", username)],
        )?;
        Ok(scalar(check_status(resp)?))
    }

    pub fn photo_download(&self, sessionid: &str, media_pk: &str, folder: &str) -> Result<String> {
        self.download("/photo/download", "media_pk", sessionid, media_pk, folder)
    }

    pub fn video_download(&self, sessionid: &str, media_pk: &str, folder: &str) -> Result<String> {
        self.download("/video/download", "media_pk", sessionid, media_pk, folder)
    }

    pub fn igtv_download(&self, sessionid: &str, media_pk: &str, folder: &str) -> Result<String> {
        self.download("/igtv/download", "media_pk", sessionid, media_pk, folder)
    }

    pub fn story_download(&self, sessionid: &str, story_pk: &str, folder: &str) -> Result<String> {
        self.download("/story/download", "story_pk", sessionid, story_pk, folder)
    }

    /// Server-side path of the downloaded file.
    fn download(&self, path: &str, pk_field: &str, sessionid: &str, pk: &str, folder: &str) -> Result<String> {
        let resp = self.client.post_form(
            path,
            &[
                ("sessionid", sessionid),
                (pk_field, pk),
                ("folder", folder),
                ("returnFile", "false"),
            ],
        )?;
        Ok(scalar(check_status(resp)?))
    }

    /// Primary keys of up to `amount` current stories of `user_id`.
    pub fn user_stories(&self, sessionid: &str, user_id: &str, amount: usize) -> Result<Vec<String>> {
        let amount = amount.to_string();
        let resp = self.client.post_form(
            "/story/user_stories",
            &[("sessionid", sessionid), ("user_id", user_id), ("amount", amount.as_str())],
        )?;
        let stories: Vec<StoryRef> = check_status(resp)?.json()?;
        stories
            .iter()
            .map(|story| ids::primary_key(&story.id).map(str::to_string))
            .collect()
    }

    /// Upload `files` as one album post; returns the media document.
    pub fn album_upload<P: AsRef<Path>>(&self, sessionid: &str, files: &[P], caption: &str) -> Result<String> {
        let attachments = files
            .iter()
            .map(|path| FileAttachment::from_path("files", path))
            .collect::<Result<Vec<_>>>()?;
        let resp = self.client.post_multipart(
            "/album/upload",
            &[("sessionid", sessionid), ("caption", caption)],
            attachments,
        )?;
        Ok(check_status(resp)?.text())
    }

    /// Upload one photo to the story feed; returns the story document.
    pub fn photo_upload_to_story(&self, sessionid: &str, file: impl AsRef<Path>) -> Result<String> {
        let attachment = FileAttachment::from_path("file", file)?;
        let resp = self.client.post_multipart(
            "/photo/upload_to_story",
            &[("sessionid", sessionid)],
            vec![attachment],
        )?;
        Ok(check_status(resp)?.text())
    }
}

/// Scalar results arrive either bare (`123`) or as a JSON string (`"123"`).
fn scalar(response: HttpResponse) -> String {
    match serde_json::from_slice::<String>(&response.body) {
        Ok(value) => value,
        Err(_) => response.text().trim().to_string(),
    }
}
