//! HTTP client for the REST API.
//!
//! # Design
//! `ApiClient` holds only its configuration and a transport, and carries no
//! state between calls; the server tracks sessions through the session id
//! each caller passes explicitly. Every call goes through two steps:
//! `build_request` turns an `EndpointRequest` into an `HttpRequest` without
//! I/O, and the transport executes it. Status codes are not interpreted on
//! the way back; callers run `check_status` to treat non-200 as failure.

use log::warn;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart;
use crate::request::{EndpointRequest, FileAttachment};
use crate::transport::{Transport, UreqTransport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Client bound to one REST API base URL.
#[derive(Clone)]
pub struct ApiClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ApiClient<UreqTransport> {
    /// Client over a `ureq` transport honouring the configured timeout.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|source| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET base_url + path` with percent-encoded query parameters.
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(&EndpointRequest::get(path).queries(query).build())
    }

    /// `POST` an `application/x-www-form-urlencoded` body.
    pub fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(&EndpointRequest::post(path).fields(fields).build())
    }

    /// `POST` a `multipart/form-data` body with text fields and file parts.
    pub fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        files: Vec<FileAttachment>,
    ) -> Result<HttpResponse> {
        let request = EndpointRequest::post(path).multipart().fields(fields).files(files);
        self.send(&request.build())
    }

    /// Build and execute `request`. Any status code is returned as `Ok`.
    pub fn send(&self, request: &EndpointRequest) -> Result<HttpResponse> {
        let http = self.build_request(request)?;
        self.transport.execute(&http)
    }

    /// Resolve `request` against the base URL and encode its body.
    pub fn build_request(&self, request: &EndpointRequest) -> Result<HttpRequest> {
        let url = self.resolve(request.path(), request.query())?;
        let mut headers = self.config.default_headers.clone();

        let body = match request.method() {
            HttpMethod::Get => {
                if !request.form().is_empty() || request.is_multipart() {
                    return Err(ApiError::InvalidRequest(format!(
                        "GET {} cannot carry form fields or files",
                        request.path()
                    )));
                }
                None
            }
            HttpMethod::Post if request.is_multipart() => {
                let boundary = multipart::random_boundary();
                headers.push(("content-type".to_string(), multipart::content_type(&boundary)));
                Some(multipart::encode(&boundary, request.form(), request.files()))
            }
            HttpMethod::Post => {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(request.form())
                    .finish();
                Some(encoded.into_bytes())
            }
        };

        Ok(HttpRequest {
            method: request.method(),
            url,
            headers,
            body,
        })
    }

    fn resolve(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let joined = format!("{}/{}", self.config.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&joined).map_err(|source| ApiError::InvalidUrl {
            url: joined.clone(),
            source,
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }
}

/// Pass 200 responses through unmodified; anything else becomes
/// `ApiError::HttpStatus` with the body attached.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let body = response.text();
    warn!("HTTP {}: {body}", response.status);
    Err(ApiError::HttpStatus {
        status: response.status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Records every request and answers with a canned response.
    struct Recorder {
        requests: RefCell<Vec<HttpRequest>>,
        response: HttpResponse,
    }

    impl Recorder {
        fn answering(status: u16, body: &str) -> Self {
            Self {
                requests: RefCell::new(Vec::new()),
                response: HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.as_bytes().to_vec(),
                },
            }
        }

        fn last(&self) -> HttpRequest {
            self.requests.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            Err(ApiError::Network {
                url: request.url.clone(),
                source: Box::new(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
            })
        }
    }

    fn client<T: Transport>(transport: T) -> ApiClient<T> {
        ApiClient::with_transport(ClientConfig::new("http://localhost:8000"), transport).unwrap()
    }

    #[test]
    fn get_encodes_query_parameters() {
        let recorder = Recorder::answering(200, "2110901750722920960");
        let c = client(&recorder);
        c.get("/media/pk_from_code", &[("code", "B1LbfVPlwIA")]).unwrap();

        let req = recorder.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/media/pk_from_code?code=B1LbfVPlwIA");
        assert!(req.body.is_none());
    }

    #[test]
    fn query_values_with_reserved_characters_are_escaped() {
        let recorder = Recorder::answering(200, "");
        let c = client(&recorder);
        c.get(
            "/media/pk_from_url",
            &[("url", "https://www.instagram.com/p/COQebHWhRUg/"), ("q", "a b&c=d")],
        )
        .unwrap();

        assert_eq!(
            recorder.last().url,
            "http://localhost:8000/media/pk_from_url\
             ?url=https%3A%2F%2Fwww.instagram.com%2Fp%2FCOQebHWhRUg%2F&q=a+b%26c%3Dd"
        );
    }

    #[test]
    fn path_without_leading_slash_joins_cleanly() {
        let c = client(Recorder::answering(200, ""));
        let req = c.build_request(&EndpointRequest::get("version").build()).unwrap();
        assert_eq!(req.url, "http://localhost:8000/version");
    }

    #[test]
    fn base_path_is_kept() {
        let config = ClientConfig::new("http://localhost:8000/api/v1/");
        let c = ApiClient::with_transport(config, Recorder::answering(200, "")).unwrap();
        let req = c.build_request(&EndpointRequest::get("/version").build()).unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/v1/version");
    }

    #[test]
    fn post_form_url_encodes_fields() {
        let recorder = Recorder::answering(200, "");
        let c = client(&recorder);
        c.post_form("/auth/login", &[("username", "example"), ("password", "p@ss word")])
            .unwrap();

        let req = recorder.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/auth/login");
        assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(req.body.unwrap(), b"username=example&password=p%40ss+word");
    }

    #[test]
    fn post_multipart_sends_fields_and_both_files() {
        let recorder = Recorder::answering(200, "{}");
        let c = client(&recorder);
        let files = vec![
            FileAttachment::from_bytes("files", "photo.jpg", b"JPEG".to_vec()),
            FileAttachment::from_bytes("files", "video.mp4", b"MP4".to_vec()),
        ];
        c.post_multipart("/album/upload", &[("sessionid", "abc"), ("caption", "hello world")], files)
            .unwrap();

        let req = recorder.last();
        let content_type = req.header("content-type").unwrap().to_string();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = String::from_utf8(req.body.unwrap()).unwrap();

        assert_eq!(body.matches(&format!("--{boundary}\r\n")).count(), 4);
        assert!(body.contains("name=\"caption\"\r\n\r\nhello world\r\n"));
        assert!(body.contains("name=\"files\"; filename=\"photo.jpg\""));
        assert!(body.contains("name=\"files\"; filename=\"video.mp4\""));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn post_multipart_without_files_is_still_multipart() {
        let recorder = Recorder::answering(200, "");
        let c = client(&recorder);
        c.post_multipart("/photo/upload_to_story", &[("sessionid", "abc")], Vec::new())
            .unwrap();

        let req = recorder.last();
        let content_type = req.header("content-type").unwrap().to_string();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.contains("name=\"sessionid\"\r\n\r\nabc\r\n"));
        assert!(!body.contains("filename="));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn default_headers_come_first() {
        let config = ClientConfig::new("http://localhost:8000").with_header("user-agent", "restapi-test");
        let c = ApiClient::with_transport(config, Recorder::answering(200, "")).unwrap();
        let req = c
            .build_request(&EndpointRequest::post("/auth/relogin").field("sessionid", "abc").build())
            .unwrap();
        assert_eq!(req.headers[0], ("user-agent".to_string(), "restapi-test".to_string()));
        assert_eq!(req.headers[1].0, "content-type");
    }

    #[test]
    fn get_with_form_fields_is_rejected() {
        let c = client(Recorder::answering(200, ""));
        let request = EndpointRequest::get("/version").field("sessionid", "abc").build();
        let err = c.build_request(&request).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ApiClient::with_transport(ClientConfig::new("not a url"), Unreachable);
        assert!(matches!(result, Err(ApiError::InvalidUrl { .. })));
    }

    #[test]
    fn success_body_is_returned_verbatim() {
        let c = client(Recorder::answering(200, "  \"quoted\"\n"));
        let resp = check_status(c.get("/version", &[]).unwrap()).unwrap();
        assert_eq!(resp.body, b"  \"quoted\"\n");
    }

    #[test]
    fn non_200_is_reported_with_body() {
        let c = client(Recorder::answering(400, r#"{"detail":"bad password"}"#));
        let resp = c.post_form("/auth/login", &[("username", "example")]).unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.text(), r#"{"detail":"bad password"}"#);

        let err = check_status(resp).unwrap_err();
        match err {
            ApiError::HttpStatus { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"detail":"bad password"}"#);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[test]
    fn other_2xx_still_fail_the_status_check() {
        let c = client(Recorder::answering(204, ""));
        let err = check_status(c.get("/version", &[]).unwrap()).unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 204, .. }));
    }

    #[test]
    fn transport_failure_surfaces_as_network_error() {
        let c = client(Unreachable);
        let err = c.get("/version", &[]).unwrap_err();
        assert!(matches!(err, ApiError::Network { ref url, .. } if url == "http://localhost:8000/version"));
    }
}
