//! `reqwest`-backed control-plane client.

use crate::backend::ControlPlane;
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::response::{ApiResponse, Envelope, ErrorBody};
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// HTTP implementation of [`ControlPlane`].
///
/// Endpoints:
/// - `POST  /vm/{id}/start`
/// - `POST  /vm/{id}/shutdown`, `/vm/{id}/hibernate`
/// - `POST  /vm/{id}/update_specs`, `/vm/{id}/update_hibernation_timeout`
/// - `POST  /vm/{id}/sessions`
/// - `POST  /sandbox/{id}/fork`
/// - `GET   /sandbox`
/// - `POST  /sandbox/{id}/tokens`, `GET /sandbox/{id}/tokens`
/// - `PATCH /sandbox/{id}/tokens/{token_id}`
/// - `POST  /sandbox/{id}/tokens/revoke`
#[derive(Clone)]
pub struct HttpControlPlane {
    config: ApiConfig,
    http: Client,
}

impl HttpControlPlane {
    /// Build a client from validated configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        tracing::debug!(base_url = %config.base_url, "Control-plane client created");
        Ok(Self { config, http })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.config.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<ApiResponse<T>> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_owned()))
            })
            .collect();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Control plane rejected request");
            return Ok(ApiResponse {
                data: None,
                error: Some(ErrorBody::from_body(&body)),
                status: status.as_u16(),
                headers,
            });
        }

        let data = if body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Envelope<T>>(&body)?)
        };

        Ok(ApiResponse {
            data,
            error: None,
            status: status.as_u16(),
            headers,
        })
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let url = self.config.url(path);
        tracing::debug!("POST {url}");
        self.send(self.http.post(url)).await
    }

    async fn post_json<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        let url = self.config.url(path);
        tracing::debug!("POST {url}");
        self.send(self.http.post(url).json(body)).await
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn vm_start(
        &self,
        id: &str,
        body: Option<&VmStartRequest>,
    ) -> Result<ApiResponse<VmStartData>> {
        let path = format!("vm/{id}/start");
        match body {
            Some(body) => self.post_json(&path, body).await,
            None => self.post_empty(&path).await,
        }
    }

    async fn vm_shutdown(&self, id: &str) -> Result<ApiResponse<serde_json::Value>> {
        self.post_empty(&format!("vm/{id}/shutdown")).await
    }

    async fn vm_hibernate(&self, id: &str) -> Result<ApiResponse<serde_json::Value>> {
        self.post_empty(&format!("vm/{id}/hibernate")).await
    }

    async fn vm_update_specs(
        &self,
        id: &str,
        body: &UpdateSpecsRequest,
    ) -> Result<ApiResponse<serde_json::Value>> {
        self.post_json(&format!("vm/{id}/update_specs"), body).await
    }

    async fn vm_update_hibernation_timeout(
        &self,
        id: &str,
        body: &HibernationTimeoutRequest,
    ) -> Result<ApiResponse<serde_json::Value>> {
        self.post_json(&format!("vm/{id}/update_hibernation_timeout"), body)
            .await
    }

    async fn vm_create_session(
        &self,
        id: &str,
        body: &CreateSessionRequest,
    ) -> Result<ApiResponse<SessionData>> {
        self.post_json(&format!("vm/{id}/sessions"), body).await
    }

    async fn sandbox_fork(
        &self,
        template_id: &str,
        body: &ForkRequest,
    ) -> Result<ApiResponse<ForkData>> {
        self.post_json(&format!("sandbox/{template_id}/fork"), body)
            .await
    }

    async fn sandbox_list(&self, query: &ListQuery) -> Result<ApiResponse<ListData>> {
        let url = self.config.url("sandbox");
        tracing::debug!(page = query.page, page_size = query.page_size, "GET {url}");
        self.send(self.http.get(url).query(query)).await
    }

    async fn preview_token_create(
        &self,
        sandbox_id: &str,
        body: &PreviewTokenRequest,
    ) -> Result<ApiResponse<PreviewTokenData>> {
        self.post_json(&format!("sandbox/{sandbox_id}/tokens"), body)
            .await
    }

    async fn preview_token_list(
        &self,
        sandbox_id: &str,
    ) -> Result<ApiResponse<PreviewTokenListData>> {
        let url = self.config.url(&format!("sandbox/{sandbox_id}/tokens"));
        tracing::debug!("GET {url}");
        self.send(self.http.get(url)).await
    }

    async fn preview_token_update(
        &self,
        sandbox_id: &str,
        token_id: &str,
        body: &PreviewTokenUpdateRequest,
    ) -> Result<ApiResponse<PreviewTokenData>> {
        let url = self
            .config
            .url(&format!("sandbox/{sandbox_id}/tokens/{token_id}"));
        tracing::debug!("PATCH {url}");
        self.send(self.http.patch(url).json(body)).await
    }

    async fn preview_token_revoke_all(
        &self,
        sandbox_id: &str,
    ) -> Result<ApiResponse<serde_json::Value>> {
        self.post_empty(&format!("sandbox/{sandbox_id}/tokens/revoke"))
            .await
    }

    async fn report_cluster(
        &self,
        scheduler_url: &str,
        sandbox_id: &str,
        preferred_manager: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/api/v1/cluster/{sandbox_id}",
            scheduler_url.trim_end_matches('/')
        );
        tracing::debug!(preferred_manager, "GET {url}");

        let resp = self
            .http
            .get(&url)
            .query(&[("preferredManager", preferred_manager)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        // Only well-formedness matters here.
        serde_json::from_str::<serde_json::Value>(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::MANAGER_URL_HEADER;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    /// A request as seen by the mock control plane.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        path: String,
        authorization: Option<String>,
        query: HashMap<String, String>,
        body: Option<serde_json::Value>,
    }

    type Captured = Arc<Mutex<Vec<CapturedRequest>>>;

    fn capture(
        state: &Captured,
        path: String,
        headers: &HeaderMap,
        query: HashMap<String, String>,
        body: Option<serde_json::Value>,
    ) {
        state.lock().unwrap().push(CapturedRequest {
            path,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            query,
            body,
        });
    }

    fn start_payload() -> serde_json::Value {
        serde_json::json!({
            "bootup_type": "CLEAN",
            "cluster": "fra1",
            "latest_pitcher_version": "0.200.0",
            "pitcher_manager_version": "0.8.0",
            "pitcher_token": "tok",
            "pitcher_url": "wss://fra1.example.test/pitcher",
            "pitcher_version": "0.200.0",
            "user_workspace_path": "/project/sandbox",
            "workspace_path": "/project/sandbox"
        })
    }

    async fn start_handler(
        State(state): State<Captured>,
        Path(id): Path<String>,
        headers: HeaderMap,
        body: String,
    ) -> impl IntoResponse {
        let body = serde_json::from_str(&body).ok();
        capture(&state, format!("/vm/{id}/start"), &headers, HashMap::new(), body);
        (
            [(MANAGER_URL_HEADER, "https://m1.example.test/api/v1")],
            Json(serde_json::json!({ "success": true, "data": start_payload() })),
        )
    }

    async fn shutdown_handler(
        State(state): State<Captured>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        capture(&state, format!("/vm/{id}/shutdown"), &headers, HashMap::new(), None);
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "errors": ["sandbox not found"] })),
        )
    }

    async fn hibernate_handler(
        State(state): State<Captured>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        capture(&state, format!("/vm/{id}/hibernate"), &headers, HashMap::new(), None);
        StatusCode::NO_CONTENT
    }

    async fn list_handler(
        State(state): State<Captured>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        capture(&state, "/sandbox".into(), &headers, query, None);
        Json(serde_json::json!({
            "success": true,
            "data": {
                "sandboxes": [{
                    "id": "abc123",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z",
                    "privacy": 0,
                    "tags": ["sdk"]
                }],
                "pagination": { "total_records": 1, "current_page": 1, "next_page": null }
            }
        }))
    }

    async fn token_update_handler(
        State(state): State<Captured>,
        Path((id, token_id)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        capture(
            &state,
            format!("/sandbox/{id}/tokens/{token_id}"),
            &headers,
            HashMap::new(),
            Some(body),
        );
        Json(serde_json::json!({
            "data": { "token": { "token_id": token_id, "token_prefix": "prv_ab" } }
        }))
    }

    async fn cluster_handler(
        State(state): State<Captured>,
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        capture(&state, format!("/api/v1/cluster/{id}"), &headers, query, None);
        Json(serde_json::json!({ "ok": true }))
    }

    struct MockControlPlane {
        url: String,
        requests: Captured,
    }

    impl MockControlPlane {
        async fn start() -> Self {
            let requests: Captured = Arc::default();
            let app = Router::new()
                .route("/vm/:id/start", post(start_handler))
                .route("/vm/:id/shutdown", post(shutdown_handler))
                .route("/vm/:id/hibernate", post(hibernate_handler))
                .route("/sandbox", get(list_handler))
                .route(
                    "/sandbox/:id/tokens/:token_id",
                    axum::routing::patch(token_update_handler),
                )
                .route("/api/v1/cluster/:id", get(cluster_handler))
                .with_state(Arc::clone(&requests));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self { url, requests }
        }

        fn captured(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn client(url: &str) -> HttpControlPlane {
        HttpControlPlane::new(ApiConfig::new(url).with_token("csb_test")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(HttpControlPlane::new(ApiConfig::new("not-a-url")).is_err());
    }

    #[tokio::test]
    async fn test_start_decodes_envelope_and_headers() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        let body = VmStartRequest {
            tier: Some("Micro".into()),
            ..Default::default()
        };
        let response = api.vm_start("abc123", Some(&body)).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.error.is_none());
        let data = response.data.clone().and_then(|e| e.data).unwrap();
        assert_eq!(data.bootup_type, "CLEAN");
        assert_eq!(data.pitcher_token, "tok");
        assert_eq!(
            response.header(MANAGER_URL_HEADER),
            Some("https://m1.example.test/api/v1")
        );

        let captured = server.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].path, "/vm/abc123/start");
        assert_eq!(captured[0].authorization.as_deref(), Some("Bearer csb_test"));
        assert_eq!(captured[0].body, Some(serde_json::json!({ "tier": "Micro" })));
    }

    #[tokio::test]
    async fn test_start_without_overrides_sends_no_body() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        api.vm_start("abc123", None).await.unwrap();

        let captured = server.captured();
        assert_eq!(captured[0].body, None);
    }

    #[tokio::test]
    async fn test_rejected_call_populates_error() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        let response = api.vm_shutdown("missing").await.unwrap();

        assert_eq!(response.status, 404);
        assert!(response.data.is_none());
        assert_eq!(
            response.error.unwrap().errors,
            vec!["sandbox not found".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_has_no_envelope() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        let response = api.vm_hibernate("abc123").await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.data.is_none());
        assert!(response.error.is_none());
        assert_eq!(server.captured()[0].path, "/vm/abc123/hibernate");
    }

    #[tokio::test]
    async fn test_list_sends_query_string() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        let query = ListQuery {
            tags: Some("sdk,x".into()),
            page: 3,
            page_size: 25,
            order_by: Some("updated_at".into()),
            ..Default::default()
        };
        let response = api.sandbox_list(&query).await.unwrap();
        let data = response.data.and_then(|e| e.data).unwrap();
        assert_eq!(data.sandboxes.len(), 1);
        assert_eq!(data.pagination.next_page, None);

        let captured = server.captured();
        let q = &captured[0].query;
        assert_eq!(q.get("tags").map(String::as_str), Some("sdk,x"));
        assert_eq!(q.get("page").map(String::as_str), Some("3"));
        assert_eq!(q.get("page_size").map(String::as_str), Some("25"));
        assert_eq!(q.get("order_by").map(String::as_str), Some("updated_at"));
        assert!(!q.contains_key("direction"));
    }

    #[tokio::test]
    async fn test_token_update_uses_patch() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        let body = PreviewTokenUpdateRequest {
            expires_at: Some("2030-01-01T00:00:00.000Z".into()),
        };
        let response = api
            .preview_token_update("abc123", "tok_1", &body)
            .await
            .unwrap();
        let token = response.data.and_then(|e| e.data).and_then(|d| d.token).unwrap();
        assert_eq!(token.token_id, "tok_1");
        assert!(token.token.is_none());

        let captured = server.captured();
        assert_eq!(captured[0].path, "/sandbox/abc123/tokens/tok_1");
        assert_eq!(
            captured[0].body,
            Some(serde_json::json!({ "expires_at": "2030-01-01T00:00:00.000Z" }))
        );
    }

    #[tokio::test]
    async fn test_token_update_without_expiry_sends_null() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        api.preview_token_update("abc123", "tok_1", &PreviewTokenUpdateRequest::default())
            .await
            .unwrap();

        let captured = server.captured();
        assert_eq!(
            captured[0].body,
            Some(serde_json::json!({ "expires_at": null }))
        );
    }

    #[tokio::test]
    async fn test_report_cluster_hits_scheduler() {
        let server = MockControlPlane::start().await;
        let api = client("https://unused.example.test");

        api.report_cluster(&server.url, "abc123", "m1.example.test")
            .await
            .unwrap();

        let captured = server.captured();
        assert_eq!(captured[0].path, "/api/v1/cluster/abc123");
        assert_eq!(
            captured[0].query.get("preferredManager").map(String::as_str),
            Some("m1.example.test")
        );
    }

    #[tokio::test]
    async fn test_report_cluster_surfaces_bad_status() {
        let server = MockControlPlane::start().await;
        let api = client(&server.url);

        // No scheduler route for this prefix.
        let err = api
            .report_cluster(&format!("{}/nowhere", server.url), "abc123", "m1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedStatus { status: 404, .. }));
    }
}
