//! Reqwest-backed Manifest resource client.
//!
//! This adapter owns transport details only: URL layout, bearer-token
//! retention, status mapping, and JSON decoding. Records cross the port as
//! raw JSON; typed decoding happens in the domain services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{ErrorBodyDto, LoginRequestDto, TokenResponseDto};
use crate::domain::ports::{
    AuthStrategy, Collection, FindQuery, RecordPage, ResourceClient, ResourceClientError,
    UploadedFile,
};
use crate::domain::{AUTHENTICATION_FAILED_MESSAGE, LoginCredentials, PhotoFile};

/// Resource client speaking the Manifest REST API under one base URL.
pub struct ManifestHttpClient {
    client: Client,
    base_url: Url,
    token: RwLock<Option<Zeroizing<String>>>,
}

impl ManifestHttpClient {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let client = ManifestHttpClient::new(base_url, Duration::from_secs(30))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Whether a bearer token is currently retained.
    pub async fn has_session(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ResourceClientError> {
        build_endpoint(&self.base_url, segments)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, ResourceClientError> {
        let retained = self.token.read().await;
        let authorised = match retained.as_deref() {
            Some(secret) => request.bearer_auth(secret),
            None => request,
        };
        drop(retained);

        let response = authorised
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ResourceClient for ManifestHttpClient {
    async fn authenticate(
        &self,
        strategy: AuthStrategy,
        collection: Collection,
        credentials: &LoginCredentials,
    ) -> Result<(), ResourceClientError> {
        let url = self.endpoint(&auth_segments(strategy, collection))?;
        let body = self
            .send(self.client.post(url).json(&LoginRequestDto::from(credentials)))
            .await?;
        let token: TokenResponseDto = decode(&body, "login response")?;
        *self.token.write().await = Some(token.into_secret());
        debug!(strategy = %strategy, collection = %collection, "bearer token stored");
        Ok(())
    }

    async fn me(&self, collection: Collection) -> Result<Value, ResourceClientError> {
        let url = self.endpoint(&["api", "auth", collection.slug(), "me"])?;
        let body = self.send(self.client.get(url)).await?;
        decode(&body, "current user")
    }

    async fn signup(
        &self,
        collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError> {
        let url = self.endpoint(&["api", "auth", collection.slug(), "signup"])?;
        let body = self.send(self.client.post(url).json(&payload)).await?;
        decode(&body, "signup response")
    }

    async fn logout(&self) -> Result<(), ResourceClientError> {
        self.token.write().await.take();
        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<RecordPage, ResourceClientError> {
        let url = self.endpoint(&["api", "collections", collection.slug()])?;
        let body = self
            .send(self.client.get(url).query(&query_pairs(query)))
            .await?;
        decode(&body, "record page")
    }

    async fn create(
        &self,
        collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError> {
        let url = self.endpoint(&["api", "collections", collection.slug()])?;
        let body = self.send(self.client.post(url).json(&payload)).await?;
        decode(&body, "created record")
    }

    async fn upload(&self, file: &PhotoFile) -> Result<UploadedFile, ResourceClientError> {
        let url = self.endpoint(&["api", "upload", "file"])?;
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_owned())
            .mime_str(file.content_type())
            .map_err(|error| {
                ResourceClientError::rejected(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE.as_u16(),
                    format!("invalid photo content type: {error}"),
                )
            })?;
        let body = self
            .send(self.client.post(url).multipart(Form::new().part("file", part)))
            .await?;
        decode(&body, "upload response")
    }
}

fn auth_segments(strategy: AuthStrategy, collection: Collection) -> Vec<&'static str> {
    match strategy {
        AuthStrategy::AuthEndpoint => vec!["api", "auth", collection.slug(), "login"],
        AuthStrategy::CollectionEndpoint => {
            vec!["api", "collections", collection.slug(), "auth", "login"]
        }
    }
}

fn build_endpoint(base: &Url, segments: &[&str]) -> Result<Url, ResourceClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ResourceClientError::transport(format!("backend URL {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn query_pairs(query: &FindQuery) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if !query.includes().is_empty() {
        pairs.push(("relations".to_owned(), query.includes().join(",")));
    }
    if let Some((field, order)) = query.ordering() {
        pairs.push(("orderBy".to_owned(), field.to_owned()));
        pairs.push(("order".to_owned(), order.as_str().to_owned()));
    }
    pairs.extend(
        query
            .filters()
            .iter()
            .map(|(field, value)| (format!("{field}_eq"), value.clone())),
    );
    pairs
}

fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, ResourceClientError> {
    serde_json::from_slice(body)
        .map_err(|error| ResourceClientError::decode(format!("{what}: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> ResourceClientError {
    if error.is_timeout() {
        ResourceClientError::timeout(error.to_string())
    } else {
        ResourceClientError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ResourceClientError {
    let backend_message = serde_json::from_slice::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::into_message);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResourceClientError::unauthorized(
            backend_message.unwrap_or_else(|| AUTHENTICATION_FAILED_MESSAGE.to_owned()),
        ),
        StatusCode::NOT_FOUND => ResourceClientError::not_found(
            backend_message.unwrap_or_else(|| "resource not found".to_owned()),
        ),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ResourceClientError::timeout(fallback_message(status, backend_message, body))
        }
        _ => ResourceClientError::rejected(
            status.as_u16(),
            fallback_message(status, backend_message, body),
        ),
    }
}

fn fallback_message(status: StatusCode, backend_message: Option<String>, body: &[u8]) -> String {
    backend_message.unwrap_or_else(|| {
        let preview = body_preview(body);
        if preview.is_empty() {
            format!("status {}", status.as_u16())
        } else {
            preview
        }
    })
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Manifest mapping helpers.

    use super::*;
    use crate::domain::FileId;
    use crate::domain::ports::SortOrder;
    use crate::outbound::test_server::{CannedResponse, serve};
    use rstest::rstest;
    use serde_json::json;

    fn base(raw: &str) -> Url {
        Url::parse(raw).expect("base url")
    }

    #[rstest]
    #[case::auth_endpoint(AuthStrategy::AuthEndpoint, "http://localhost:1111/api/auth/users/login")]
    #[case::collection_endpoint(
        AuthStrategy::CollectionEndpoint,
        "http://localhost:1111/api/collections/users/auth/login"
    )]
    fn strategies_map_to_distinct_routes(#[case] strategy: AuthStrategy, #[case] expected: &str) {
        let url = build_endpoint(
            &base("http://localhost:1111"),
            &auth_segments(strategy, Collection::User),
        )
        .expect("endpoint");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case("http://mars.base/backend")]
    #[case("http://mars.base/backend/")]
    fn endpoints_keep_the_base_path(#[case] raw: &str) {
        let url = build_endpoint(&base(raw), &["api", "collections", "consumption-logs"])
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "http://mars.base/backend/api/collections/consumption-logs"
        );
    }

    #[rstest]
    fn opaque_base_urls_are_rejected() {
        let error = build_endpoint(&base("mailto:ops@mars.base"), &["api"]).expect_err("no base");
        assert!(matches!(error, ResourceClientError::Transport { .. }));
    }

    #[rstest]
    fn find_queries_use_manifest_parameters() {
        let query = FindQuery::new()
            .filter_eq("colonistId", "watney")
            .include("meal")
            .include("creator")
            .order_by("createdAt", SortOrder::Desc);
        let pairs = query_pairs(&query);
        let expected: Vec<(String, String)> = [
            ("relations", "meal,creator"),
            ("orderBy", "createdAt"),
            ("order", "DESC"),
            ("colonistId_eq", "watney"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect();
        assert_eq!(pairs, expected);
    }

    #[rstest]
    fn empty_queries_send_no_parameters() {
        assert!(query_pairs(&FindQuery::new()).is_empty());
    }

    #[rstest]
    #[case::unauthorised(StatusCode::UNAUTHORIZED, "Unauthorized")]
    #[case::forbidden(StatusCode::FORBIDDEN, "Unauthorized")]
    #[case::not_found(StatusCode::NOT_FOUND, "NotFound")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "Timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "Rejected")]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "Rejected")]
    fn maps_http_statuses_to_port_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, b"{\"message\":\"backend says no\"}");
        let matched = match expected {
            "Unauthorized" => matches!(error, ResourceClientError::Unauthorized { .. }),
            "NotFound" => matches!(error, ResourceClientError::NotFound { .. }),
            "Timeout" => matches!(error, ResourceClientError::Timeout { .. }),
            "Rejected" => matches!(
                error,
                ResourceClientError::Rejected { status: code, .. } if code == status.as_u16()
            ),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} should map to {expected}, got {error:?}");
    }

    #[rstest]
    fn backend_message_becomes_the_error_message() {
        let error = map_status_error(
            StatusCode::UNAUTHORIZED,
            br#"{"statusCode":401,"message":"Invalid email or password","error":"Unauthorized"}"#,
        );
        assert_eq!(error.to_string(), "Invalid email or password");
    }

    #[rstest]
    fn silent_credential_rejection_uses_form_message() {
        let error = map_status_error(StatusCode::UNAUTHORIZED, b"");
        assert_eq!(error.to_string(), AUTHENTICATION_FAILED_MESSAGE);
    }

    #[rstest]
    fn non_json_bodies_fall_back_to_a_preview() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"<html>\n  upstream down\n</html>");
        assert_eq!(
            error,
            ResourceClientError::rejected(502_u16, "<html> upstream down </html>")
        );
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), 163);
        assert!(preview.ends_with("..."));
    }

    #[rstest]
    fn decode_failures_name_the_payload() {
        let error = decode::<RecordPage>(b"not json", "record page").expect_err("decode fails");
        assert!(error.to_string().contains("record page"));
    }

    #[tokio::test]
    async fn logout_discards_the_retained_token() {
        let client = ManifestHttpClient::new(base("http://localhost:1111"), Duration::from_secs(1))
            .expect("client");
        *client.token.write().await = Some(Zeroizing::new("secret".to_owned()));
        assert!(client.has_session().await);

        client.logout().await.expect("logout");

        assert!(!client.has_session().await);
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials::try_from_parts("weir@mars.gov", "hunter2").expect("credentials")
    }

    fn token_response() -> CannedResponse {
        CannedResponse::json("200 OK", &json!({ "token": "tok-123" }))
    }

    fn client_for(base: Url) -> ManifestHttpClient {
        ManifestHttpClient::new(base, Duration::from_secs(5)).expect("client")
    }

    #[rstest]
    #[case::auth_endpoint(AuthStrategy::AuthEndpoint, "POST /api/auth/users/login HTTP/1.1")]
    #[case::collection_endpoint(
        AuthStrategy::CollectionEndpoint,
        "POST /api/collections/users/auth/login HTTP/1.1"
    )]
    #[tokio::test]
    async fn each_strategy_posts_credentials_to_its_route(
        #[case] strategy: AuthStrategy,
        #[case] expected_line: &str,
    ) {
        let (base, server) = serve(vec![token_response()]).await;
        let client = client_for(base);

        client
            .authenticate(strategy, Collection::User, &credentials())
            .await
            .expect("login succeeds");
        let requests = server.await.expect("server task");

        let [login] = requests.as_slice() else {
            panic!("expected one request, got {}", requests.len());
        };
        assert_eq!(login.request_line(), expected_line);
        assert_eq!(login.header("authorization"), None);
        assert_eq!(
            login.json(),
            json!({ "email": "weir@mars.gov", "password": "hunter2" })
        );
        assert!(client.has_session().await);
    }

    #[tokio::test]
    async fn login_token_is_sent_as_bearer_on_later_requests() {
        let (base, server) = serve(vec![
            token_response(),
            CannedResponse::json(
                "200 OK",
                &json!({ "id": 1, "email": "weir@mars.gov", "name": "Dr. Weir", "role": "scientist" }),
            ),
            CannedResponse::json("200 OK", &json!({ "data": [] })),
            CannedResponse::json("201 Created", &json!({ "id": 7, "name": "Protein Paste" })),
        ])
        .await;
        let client = client_for(base);

        client
            .authenticate(AuthStrategy::AuthEndpoint, Collection::User, &credentials())
            .await
            .expect("login succeeds");
        let user = client.me(Collection::User).await.expect("current user");
        let page = client
            .find(
                Collection::Meal,
                &FindQuery::new()
                    .include("creator")
                    .order_by("createdAt", SortOrder::Desc),
            )
            .await
            .expect("meal page");
        let created = client
            .create(Collection::Meal, json!({ "name": "Protein Paste" }))
            .await
            .expect("created meal");
        let requests = server.await.expect("server task");

        assert_eq!(user.get("email"), Some(&json!("weir@mars.gov")));
        assert!(page.data.is_empty());
        assert_eq!(created.get("id"), Some(&json!(7)));
        let [_, me, find, create] = requests.as_slice() else {
            panic!("expected four requests, got {}", requests.len());
        };
        assert_eq!(me.request_line(), "GET /api/auth/users/me HTTP/1.1");
        assert_eq!(
            find.request_line(),
            "GET /api/collections/meals?relations=creator&orderBy=createdAt&order=DESC HTTP/1.1"
        );
        assert_eq!(create.request_line(), "POST /api/collections/meals HTTP/1.1");
        assert_eq!(create.json(), json!({ "name": "Protein Paste" }));
        for request in [me, find, create] {
            assert_eq!(request.header("authorization"), Some("Bearer tok-123"));
        }
    }

    #[tokio::test]
    async fn requests_after_logout_carry_no_token() {
        let (base, server) = serve(vec![
            token_response(),
            CannedResponse::empty("401 Unauthorized"),
        ])
        .await;
        let client = client_for(base);

        client
            .authenticate(AuthStrategy::AuthEndpoint, Collection::User, &credentials())
            .await
            .expect("login succeeds");
        client.logout().await.expect("logout");
        let error = client
            .me(Collection::User)
            .await
            .expect_err("no session after logout");
        let requests = server.await.expect("server task");

        assert_eq!(
            error,
            ResourceClientError::unauthorized(AUTHENTICATION_FAILED_MESSAGE)
        );
        let [_, me] = requests.as_slice() else {
            panic!("expected two requests, got {}", requests.len());
        };
        assert_eq!(me.header("authorization"), None);
    }

    #[tokio::test]
    async fn upload_sends_a_multipart_file_part() {
        let (base, server) =
            serve(vec![CannedResponse::json("201 Created", &json!({ "id": "file-9" }))]).await;
        let client = client_for(base);
        let photo = PhotoFile::try_new("paste.png", "image/png", b"not really a png".to_vec())
            .expect("photo");

        let uploaded = client.upload(&photo).await.expect("upload succeeds");
        let requests = server.await.expect("server task");

        assert_eq!(uploaded.id, FileId::new("file-9").expect("file id"));
        let [upload] = requests.as_slice() else {
            panic!("expected one request, got {}", requests.len());
        };
        assert_eq!(upload.request_line(), "POST /api/upload/file HTTP/1.1");
        assert!(
            upload
                .header("content-type")
                .is_some_and(|value| value.starts_with("multipart/form-data; boundary="))
        );
        let body = upload.body_text();
        assert!(body.contains(r#"name="file"; filename="paste.png""#));
        assert!(body.to_lowercase().contains("content-type: image/png"));
        assert!(body.contains("not really a png"));
    }

    #[tokio::test]
    async fn backend_rejection_reaches_the_caller_with_its_message() {
        let (base, server) = serve(vec![CannedResponse::json(
            "401 Unauthorized",
            &json!({ "message": "Invalid email or password" }),
        )])
        .await;
        let client = client_for(base);

        let error = client
            .authenticate(AuthStrategy::AuthEndpoint, Collection::User, &credentials())
            .await
            .expect_err("credentials rejected");
        server.await.expect("server task");

        assert_eq!(
            error,
            ResourceClientError::unauthorized("Invalid email or password")
        );
        assert!(!client.has_session().await);
    }
}
