//! In-memory control plane and real-time client for unit tests.

use crate::connect::{InstanceInfo, RealtimeClient, RealtimeInit};
use crate::error::Result;
use async_trait::async_trait;
use sandpit_api::types::*;
use sandpit_api::{ApiError, ApiResponse, ControlPlane, Envelope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A request received by [`FakeControlPlane`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Start {
        id: String,
        body: Option<VmStartRequest>,
    },
    Shutdown(String),
    Hibernate(String),
    UpdateSpecs {
        id: String,
        tier: String,
    },
    UpdateHibernationTimeout {
        id: String,
        seconds: u32,
    },
    CreateSession {
        id: String,
        body: CreateSessionRequest,
    },
    Fork {
        template_id: String,
        body: ForkRequest,
    },
    List(ListQuery),
    TokenCreate {
        sandbox_id: String,
        body: PreviewTokenRequest,
    },
    TokenList(String),
    TokenUpdate {
        sandbox_id: String,
        token_id: String,
        body: PreviewTokenUpdateRequest,
    },
    TokenRevokeAll(String),
}

/// Control plane serving scripted responses per endpoint.
///
/// Endpoints without a scripted response answer `200 {"data": {}}`, which
/// suits every endpoint whose payload is ignored or all-optional.
#[derive(Default)]
pub(crate) struct FakeControlPlane {
    calls: Mutex<Vec<Call>>,
    scripted: Mutex<HashMap<&'static str, VecDeque<ApiResponse<Value>>>>,
    cluster_reports: Mutex<Vec<(String, String, String)>>,
    fail_cluster: AtomicBool,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn start_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Start { .. }))
            .count()
    }

    /// `(scheduler_url, sandbox_id, preferred_manager)` of every cluster report.
    pub fn cluster_reports(&self) -> Vec<(String, String, String)> {
        self.cluster_reports.lock().unwrap().clone()
    }

    pub fn fail_cluster_reports(&self) {
        self.fail_cluster.store(true, Ordering::SeqCst);
    }

    pub fn push_value(&self, endpoint: &'static str, response: ApiResponse<Value>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(response);
    }

    fn push<T: Serialize>(&self, endpoint: &'static str, response: ApiResponse<T>) {
        let response = ApiResponse {
            data: response.data.map(|envelope| Envelope {
                data: envelope
                    .data
                    .map(|data| serde_json::to_value(data).expect("serializable payload")),
                success: envelope.success,
                errors: envelope.errors,
            }),
            error: response.error,
            status: response.status,
            headers: response.headers,
        };
        self.push_value(endpoint, response);
    }

    pub fn push_start(&self, response: ApiResponse<VmStartData>) {
        self.push("start", response);
    }

    pub fn push_fork(&self, response: ApiResponse<ForkData>) {
        self.push("fork", response);
    }

    pub fn push_session(&self, response: ApiResponse<SessionData>) {
        self.push("session", response);
    }

    pub fn push_list(&self, response: ApiResponse<ListData>) {
        self.push("list", response);
    }

    /// Scripts both the create and the update token endpoints.
    pub fn push_token(&self, response: ApiResponse<PreviewTokenData>) {
        self.push("token", response);
    }

    pub fn push_token_list(&self, response: ApiResponse<PreviewTokenListData>) {
        self.push("token_list", response);
    }

    fn respond<T: DeserializeOwned>(&self, endpoint: &'static str, call: Call) -> ApiResponse<T> {
        self.calls.lock().unwrap().push(call);
        let response = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ApiResponse::ok(serde_json::json!({})));

        ApiResponse {
            data: response.data.map(|envelope| Envelope {
                data: envelope.data.map(|data| {
                    serde_json::from_value(data)
                        .unwrap_or_else(|e| panic!("no usable response scripted for {endpoint}: {e}"))
                }),
                success: envelope.success,
                errors: envelope.errors,
            }),
            error: response.error,
            status: response.status,
            headers: response.headers,
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn vm_start(
        &self,
        id: &str,
        body: Option<&VmStartRequest>,
    ) -> sandpit_api::Result<ApiResponse<VmStartData>> {
        let call = Call::Start {
            id: id.to_string(),
            body: body.cloned(),
        };
        Ok(self.respond("start", call))
    }

    async fn vm_shutdown(&self, id: &str) -> sandpit_api::Result<ApiResponse<Value>> {
        Ok(self.respond("shutdown", Call::Shutdown(id.to_string())))
    }

    async fn vm_hibernate(&self, id: &str) -> sandpit_api::Result<ApiResponse<Value>> {
        Ok(self.respond("hibernate", Call::Hibernate(id.to_string())))
    }

    async fn vm_update_specs(
        &self,
        id: &str,
        body: &UpdateSpecsRequest,
    ) -> sandpit_api::Result<ApiResponse<Value>> {
        let call = Call::UpdateSpecs {
            id: id.to_string(),
            tier: body.tier.clone(),
        };
        Ok(self.respond("update_specs", call))
    }

    async fn vm_update_hibernation_timeout(
        &self,
        id: &str,
        body: &HibernationTimeoutRequest,
    ) -> sandpit_api::Result<ApiResponse<Value>> {
        let call = Call::UpdateHibernationTimeout {
            id: id.to_string(),
            seconds: body.hibernation_timeout_seconds,
        };
        Ok(self.respond("update_hibernation_timeout", call))
    }

    async fn vm_create_session(
        &self,
        id: &str,
        body: &CreateSessionRequest,
    ) -> sandpit_api::Result<ApiResponse<SessionData>> {
        let call = Call::CreateSession {
            id: id.to_string(),
            body: body.clone(),
        };
        Ok(self.respond("session", call))
    }

    async fn sandbox_fork(
        &self,
        template_id: &str,
        body: &ForkRequest,
    ) -> sandpit_api::Result<ApiResponse<ForkData>> {
        let call = Call::Fork {
            template_id: template_id.to_string(),
            body: body.clone(),
        };
        Ok(self.respond("fork", call))
    }

    async fn sandbox_list(&self, query: &ListQuery) -> sandpit_api::Result<ApiResponse<ListData>> {
        Ok(self.respond("list", Call::List(query.clone())))
    }

    async fn preview_token_create(
        &self,
        sandbox_id: &str,
        body: &PreviewTokenRequest,
    ) -> sandpit_api::Result<ApiResponse<PreviewTokenData>> {
        let call = Call::TokenCreate {
            sandbox_id: sandbox_id.to_string(),
            body: body.clone(),
        };
        Ok(self.respond("token", call))
    }

    async fn preview_token_list(
        &self,
        sandbox_id: &str,
    ) -> sandpit_api::Result<ApiResponse<PreviewTokenListData>> {
        Ok(self.respond("token_list", Call::TokenList(sandbox_id.to_string())))
    }

    async fn preview_token_update(
        &self,
        sandbox_id: &str,
        token_id: &str,
        body: &PreviewTokenUpdateRequest,
    ) -> sandpit_api::Result<ApiResponse<PreviewTokenData>> {
        let call = Call::TokenUpdate {
            sandbox_id: sandbox_id.to_string(),
            token_id: token_id.to_string(),
            body: body.clone(),
        };
        Ok(self.respond("token", call))
    }

    async fn preview_token_revoke_all(
        &self,
        sandbox_id: &str,
    ) -> sandpit_api::Result<ApiResponse<Value>> {
        Ok(self.respond("revoke_all", Call::TokenRevokeAll(sandbox_id.to_string())))
    }

    async fn report_cluster(
        &self,
        scheduler_url: &str,
        sandbox_id: &str,
        preferred_manager: &str,
    ) -> sandpit_api::Result<()> {
        self.cluster_reports.lock().unwrap().push((
            scheduler_url.to_string(),
            sandbox_id.to_string(),
            preferred_manager.to_string(),
        ));
        if self.fail_cluster.load(Ordering::SeqCst) {
            return Err(ApiError::UnexpectedStatus {
                status: 503,
                body: "scheduler unavailable".into(),
            });
        }
        Ok(())
    }
}

/// A start bundle for sandbox `id` with token `token-{id}`.
pub(crate) fn start_data(id: &str) -> VmStartData {
    VmStartData {
        bootup_type: "RUNNING".into(),
        cluster: "fra1".into(),
        id: None,
        latest_pitcher_version: "0.9.1".into(),
        pitcher_manager_version: "0.9.0".into(),
        pitcher_token: format!("token-{id}"),
        pitcher_url: format!("wss://{id}.pitcher.example"),
        pitcher_version: "0.9.0".into(),
        reconnect_token: None,
        user_workspace_path: "/project/workspace".into(),
        workspace_path: "/project".into(),
    }
}

/// Connection produced by [`RecordingRealtime`].
pub(crate) struct FakeConnection {
    pub init: RealtimeInit,
    pub instance: InstanceInfo,
}

/// Real-time client that fetches one instance and keeps the init around.
#[derive(Clone, Default)]
pub(crate) struct RecordingRealtime {
    connects: Arc<AtomicUsize>,
}

impl RecordingRealtime {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeClient for RecordingRealtime {
    type Connection = FakeConnection;

    async fn connect(&self, init: RealtimeInit) -> Result<FakeConnection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let instance = init.instance().await?;
        Ok(FakeConnection { init, instance })
    }
}
