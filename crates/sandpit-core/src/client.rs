//! The lifecycle facade.

use crate::config::ClientConfig;
use crate::connect::{CredentialSource, Detached, MaybeConnected, RealtimeClient, StartCredentials};
use crate::error::Result;
use crate::info::Privacy;
use crate::preview::PreviewTokens;
use crate::resolve::{resolve, resolve_unit};
use crate::sandbox::Sandbox;
use crate::start::{start_request, SandboxStartData, StartOptions};
use crate::tier::VmTier;
use sandpit_api::types::{ForkRequest, HibernationTimeoutRequest, UpdateSpecsRequest};
use sandpit_api::{ApiConfig, ControlPlane, HttpControlPlane, MANAGER_URL_HEADER};
use std::sync::Arc;

/// Tag carried by every sandbox created through this client.
pub const SDK_TAG: &str = "sdk";

/// Path new sandboxes are filed under when none is given.
pub const DEFAULT_PATH: &str = "/SDK";

/// Entry point for working with sandboxes.
///
/// Holds only shared immutable state, so clones are cheap and can be used
/// from any task concurrently.
///
/// `R` is the real-time client used by connecting operations (`open`,
/// `create` with auto-connect). The default, [`Detached`], refuses to
/// connect.
pub struct SandboxClient<R = Detached> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    api: Arc<dyn ControlPlane>,
    config: ClientConfig,
    realtime: R,
}

impl<R> Clone for SandboxClient<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for SandboxClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl SandboxClient<Detached> {
    /// Create a client that never connects.
    pub fn new(api: Arc<dyn ControlPlane>, config: ClientConfig) -> Self {
        Self::with_realtime(api, config, Detached)
    }

    /// Create a client talking HTTP to the control plane described by `config`.
    pub fn from_api_config(config: ApiConfig) -> Result<Self> {
        let client_config = ClientConfig::from(&config);
        let api = HttpControlPlane::new(config)?;
        Ok(Self::new(Arc::new(api), client_config))
    }
}

impl<R: RealtimeClient> SandboxClient<R> {
    /// Create a client that connects through `realtime`.
    pub fn with_realtime(api: Arc<dyn ControlPlane>, config: ClientConfig, realtime: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                realtime,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<dyn ControlPlane> {
        &self.inner.api
    }

    pub fn realtime(&self) -> &R {
        &self.inner.realtime
    }

    /// Start an existing sandbox without connecting.
    ///
    /// The returned bundle contains a single-use token; it can be passed to
    /// a browser so the VM is controlled without sharing the API token.
    pub async fn start(&self, id: &str, opts: Option<&StartOptions>) -> Result<SandboxStartData> {
        Ok(self.start_with_hint(id, opts).await?.data)
    }

    /// Start a sandbox and keep the manager hint of the response.
    pub(crate) async fn start_with_hint(
        &self,
        id: &str,
        opts: Option<&StartOptions>,
    ) -> Result<StartCredentials> {
        tracing::info!(sandbox_id = %id, "Starting sandbox");
        let body = start_request(opts);
        let response = self.inner.api.vm_start(id, body.as_ref()).await?;

        let manager_url = response.header(MANAGER_URL_HEADER).map(str::to_string);
        let data = resolve(response, &format!("Failed to start sandbox {id}"))?;

        tracing::debug!(
            sandbox_id = %id,
            bootup_type = %data.bootup_type,
            cluster = %data.cluster,
            "Sandbox started"
        );
        Ok(StartCredentials { data, manager_url })
    }

    /// Start an existing sandbox and connect to it.
    pub async fn open(&self, id: &str, opts: Option<StartOptions>) -> Result<Sandbox<R>> {
        self.connect_to_sandbox(id, CredentialSource::Start(opts))
            .await
    }

    /// Create a sandbox by forking a template.
    ///
    /// Without a template the default one for the configured control plane
    /// is used. With `auto_connect` (the default) the new sandbox is started
    /// and connected; otherwise only its start bundle is returned, with `id`
    /// set to the new sandbox.
    pub async fn create(
        &self,
        opts: CreateOptions,
    ) -> Result<MaybeConnected<Sandbox<R>, SandboxStartData>> {
        let template_id = opts
            .template
            .as_ref()
            .map(Template::id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.inner.config.default_template())
            .to_string();

        let path = opts
            .path
            .clone()
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let body = ForkRequest {
            privacy: opts.privacy.to_number(),
            title: opts.title.clone(),
            description: opts.description.clone(),
            tags: with_sdk_tag(opts.tags.clone()),
            path,
            start_options: opts.auto_connect.then(|| opts.start.to_request()),
        };

        tracing::info!(template_id = %template_id, auto_connect = opts.auto_connect, "Creating sandbox");
        let response = self.inner.api.sandbox_fork(&template_id, &body).await?;
        let manager_url = response.header(MANAGER_URL_HEADER).map(str::to_string);
        let fork = resolve(response, "Failed to create sandbox")?;
        tracing::info!(sandbox_id = %fork.id, template_id = %template_id, "Sandbox created");

        if !opts.auto_connect {
            let mut data = match fork.start_response {
                Some(data) => data,
                None => self.start(&fork.id, Some(&opts.start)).await?,
            };
            data.id.get_or_insert(fork.id);
            return Ok(MaybeConnected::Unconnected(data));
        }

        let source = match fork.start_response {
            Some(data) => {
                CredentialSource::prefetched(StartCredentials { data, manager_url }, Some(opts.start))
            }
            None => CredentialSource::Start(Some(opts.start)),
        };
        let sandbox = self.connect_to_sandbox(&fork.id, source).await?;
        Ok(MaybeConnected::Connected(sandbox))
    }

    /// Fork an existing sandbox. Same as [`create`](Self::create) with the
    /// template forced to `id`.
    pub async fn fork(
        &self,
        id: &str,
        opts: CreateOptions,
    ) -> Result<MaybeConnected<Sandbox<R>, SandboxStartData>> {
        self.create(opts.template(id)).await
    }

    /// Shut a sandbox down. Files are saved and the VM is stopped.
    pub async fn shutdown(&self, id: &str) -> Result<()> {
        tracing::info!(sandbox_id = %id, "Shutting down sandbox");
        let response = self.inner.api.vm_shutdown(id).await?;
        resolve_unit(response, &format!("Failed to shutdown sandbox {id}"))
    }

    /// Hibernate a sandbox. The next start resumes from the saved state.
    pub async fn hibernate(&self, id: &str) -> Result<()> {
        tracing::info!(sandbox_id = %id, "Hibernating sandbox");
        let response = self.inner.api.vm_hibernate(id).await?;
        resolve_unit(response, &format!("Failed to hibernate sandbox {id}"))
    }

    /// Rescale a running sandbox without a reboot.
    ///
    /// Scaling down below the memory in use can make the VM very slow.
    pub async fn update_tier(&self, id: &str, tier: VmTier) -> Result<()> {
        tracing::info!(sandbox_id = %id, tier = %tier, "Updating sandbox tier");
        let body = UpdateSpecsRequest {
            tier: tier.name().to_string(),
        };
        let response = self.inner.api.vm_update_specs(id, &body).await?;
        resolve_unit(response, &format!("Failed to update sandbox tier {id}"))
    }

    pub async fn update_hibernation_timeout(&self, id: &str, timeout_seconds: u32) -> Result<()> {
        tracing::info!(sandbox_id = %id, timeout_seconds, "Updating hibernation timeout");
        let body = HibernationTimeoutRequest {
            hibernation_timeout_seconds: timeout_seconds,
        };
        let response = self
            .inner
            .api
            .vm_update_hibernation_timeout(id, &body)
            .await?;
        resolve_unit(
            response,
            &format!("Failed to update hibernation timeout for sandbox {id}"),
        )
    }

    /// Preview tokens of one sandbox.
    pub fn preview_tokens(&self, sandbox_id: &str) -> PreviewTokens<'_> {
        PreviewTokens::new(self.inner.api.as_ref(), sandbox_id)
    }
}

/// Default `["sdk"]`, otherwise the given tags with `"sdk"` present exactly once.
fn with_sdk_tag(tags: Option<Vec<String>>) -> Vec<String> {
    let Some(tags) = tags else {
        return vec![SDK_TAG.to_string()];
    };

    let mut seen_sdk = false;
    let mut result: Vec<String> = tags
        .into_iter()
        .filter(|tag| {
            if tag != SDK_TAG {
                return true;
            }
            !std::mem::replace(&mut seen_sdk, true)
        })
        .collect();
    if !seen_sdk {
        result.push(SDK_TAG.to_string());
    }
    result
}

/// What to fork from: the id of any template or sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Template {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Template {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<R: RealtimeClient> From<&Sandbox<R>> for Template {
    fn from(sandbox: &Sandbox<R>) -> Self {
        Self(sandbox.id().to_string())
    }
}

/// Options for [`SandboxClient::create`] and [`SandboxClient::fork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Template to fork; defaults to the universal template.
    pub template: Option<Template>,
    /// Defaults to public.
    pub privacy: Privacy,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Start and connect after forking. Defaults to `true`.
    pub auto_connect: bool,
    /// At most 10 tags. `"sdk"` is always added.
    pub tags: Option<Vec<String>>,
    /// Folder the sandbox is filed under; defaults to `/SDK`.
    pub path: Option<String>,
    /// Overrides for starting the new VM.
    pub start: StartOptions,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            template: None,
            privacy: Privacy::Public,
            title: None,
            description: None,
            auto_connect: true,
            tags: None,
            path: None,
            start: StartOptions::default(),
        }
    }
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, template: impl Into<Template>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn start(mut self, start: StartOptions) -> Self {
        self.start = start;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::testing::{start_data, Call, FakeControlPlane, RecordingRealtime};
    use sandpit_api::types::{ForkData, VmStartRequest};
    use sandpit_api::{ApiResponse, ErrorBody};

    fn fork_data(id: &str, with_start: bool) -> ForkData {
        ForkData {
            id: id.to_string(),
            start_response: with_start.then(|| start_data(id)),
        }
    }

    fn fork_body(api: &FakeControlPlane) -> (String, ForkRequest) {
        api.calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Fork { template_id, body } => Some((template_id, body)),
                _ => None,
            })
            .expect("fork call")
    }

    fn connecting_client(api: Arc<FakeControlPlane>) -> SandboxClient<RecordingRealtime> {
        SandboxClient::with_realtime(api, ClientConfig::default(), RecordingRealtime::default())
    }

    #[test]
    fn test_sdk_tag_union() {
        assert_eq!(with_sdk_tag(None), vec!["sdk"]);
        assert_eq!(with_sdk_tag(Some(vec!["x".into()])), vec!["x", "sdk"]);
        assert_eq!(
            with_sdk_tag(Some(vec!["sdk".into(), "x".into()])),
            vec!["sdk", "x"]
        );
        assert_eq!(
            with_sdk_tag(Some(vec!["sdk".into(), "x".into(), "sdk".into()])),
            vec!["sdk", "x"]
        );
        assert_eq!(with_sdk_tag(Some(vec![])), vec!["sdk"]);
    }

    #[tokio::test]
    async fn test_start_sends_overrides() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_start(ApiResponse::ok(start_data("abc")));
        let client = SandboxClient::new(api.clone(), ClientConfig::default());

        let opts = StartOptions::new().vm_tier(VmTier::Nano).ipcountry("NL");
        let data = client.start("abc", Some(&opts)).await.unwrap();
        assert_eq!(data.pitcher_token, "token-abc");

        assert_eq!(
            api.calls(),
            vec![Call::Start {
                id: "abc".into(),
                body: Some(VmStartRequest {
                    ipcountry: Some("NL".into()),
                    tier: Some("Nano".into()),
                    hibernation_timeout_seconds: None,
                }),
            }]
        );
    }

    #[tokio::test]
    async fn test_start_failure_carries_context() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_start(ApiResponse::failed(404, ErrorBody::message("not found")));
        let client = SandboxClient::new(api, ClientConfig::default());

        let err = client.start("abc", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to start sandbox abc (HTTP 404): not found");
    }

    #[tokio::test]
    async fn test_start_without_payload_fails() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_start(ApiResponse::empty());
        let client = SandboxClient::new(api, ClientConfig::default());

        assert!(matches!(
            client.start("abc", None).await,
            Err(CoreError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("new1", true)));
        let client = connecting_client(api.clone());

        let result = client.create(CreateOptions::new()).await.unwrap();
        let sandbox = result.connected().expect("connected");
        assert_eq!(sandbox.id(), "new1");

        let (template_id, body) = fork_body(&api);
        assert_eq!(template_id, "pcz35m");
        assert_eq!(body.privacy, 0);
        assert_eq!(body.tags, vec!["sdk"]);
        assert_eq!(body.path, "/SDK");
        // Auto-connect sends start options even when they are all empty
        assert_eq!(body.start_options, Some(VmStartRequest::default()));
        // Prefetched credentials, no separate start
        assert_eq!(api.start_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_without_start_response_starts() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("new1", false)));
        api.push_start(ApiResponse::ok(start_data("new1")));
        let client = connecting_client(api.clone());

        let opts = CreateOptions::new().start(StartOptions::new().vm_tier(VmTier::Micro));
        let sandbox = client.create(opts).await.unwrap().connected().unwrap();
        assert_eq!(sandbox.id(), "new1");

        let start = api.calls().into_iter().find_map(|call| match call {
            Call::Start { id, body } => Some((id, body)),
            _ => None,
        });
        let (id, body) = start.expect("start call");
        assert_eq!(id, "new1");
        assert_eq!(body.and_then(|b| b.tier).as_deref(), Some("Micro"));
    }

    #[tokio::test]
    async fn test_create_without_auto_connect() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("new1", true)));
        let realtime = RecordingRealtime::default();
        let client =
            SandboxClient::with_realtime(api.clone(), ClientConfig::default(), realtime.clone());

        let result = client
            .create(CreateOptions::new().auto_connect(false).tags(["x"]))
            .await
            .unwrap();
        let data = result.unconnected().expect("unconnected");
        assert_eq!(data.pitcher_token, "token-new1");
        assert_eq!(data.id.as_deref(), Some("new1"));
        assert_eq!(realtime.connect_count(), 0);

        let (_, body) = fork_body(&api);
        assert_eq!(body.start_options, None);
        assert_eq!(body.tags, vec!["x", "sdk"]);
    }

    #[tokio::test]
    async fn test_create_without_auto_connect_starts_when_needed() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("new1", false)));
        api.push_start(ApiResponse::ok(start_data("new1")));
        let client = SandboxClient::new(api.clone(), ClientConfig::default());

        let result = client
            .create(CreateOptions::new().auto_connect(false))
            .await
            .unwrap();
        assert!(!result.is_connected());
        assert_eq!(api.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_on_staging_uses_staging_template() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("new1", true)));
        let client = SandboxClient::new(
            api.clone(),
            ClientConfig::new("https://api.codesandbox.stream"),
        );

        client
            .create(CreateOptions::new().auto_connect(false))
            .await
            .unwrap();
        assert_eq!(fork_body(&api).0, "7ngcrf");
    }

    #[tokio::test]
    async fn test_fork_forces_template() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::ok(fork_data("child", true)));
        let client = SandboxClient::new(api.clone(), ClientConfig::default());

        let opts = CreateOptions::new()
            .template("ignored")
            .auto_connect(false)
            .privacy(Privacy::Private)
            .title("child")
            .path("/work");
        client.fork("parent", opts).await.unwrap();

        let (template_id, body) = fork_body(&api);
        assert_eq!(template_id, "parent");
        assert_eq!(body.privacy, 2);
        assert_eq!(body.title.as_deref(), Some("child"));
        assert_eq!(body.path, "/work");
    }

    #[tokio::test]
    async fn test_create_failure() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_fork(ApiResponse::failed(422, ErrorBody::message("too many tags")));
        let client = SandboxClient::new(api, ClientConfig::default());

        let err = client.create(CreateOptions::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: 422, ref context, .. } if context == "Failed to create sandbox"));
    }

    #[tokio::test]
    async fn test_vm_operations() {
        let api = Arc::new(FakeControlPlane::new());
        let client = SandboxClient::new(api.clone(), ClientConfig::default());

        client.shutdown("a").await.unwrap();
        client.hibernate("b").await.unwrap();
        client.update_tier("c", VmTier::Large).await.unwrap();
        client.update_hibernation_timeout("d", 900).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                Call::Shutdown("a".into()),
                Call::Hibernate("b".into()),
                Call::UpdateSpecs {
                    id: "c".into(),
                    tier: "Large".into()
                },
                Call::UpdateHibernationTimeout {
                    id: "d".into(),
                    seconds: 900
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_vm_operations_accept_responses_without_payload() {
        let api = Arc::new(FakeControlPlane::new());
        let acknowledged = || ApiResponse {
            data: Some(sandpit_api::Envelope {
                data: None,
                success: Some(true),
                errors: Vec::new(),
            }),
            error: None,
            status: 200,
            headers: Default::default(),
        };
        api.push_value("shutdown", acknowledged());
        api.push_value("hibernate", ApiResponse::empty());
        api.push_value("update_specs", acknowledged());
        api.push_value("update_hibernation_timeout", ApiResponse::empty());
        api.push_value("revoke_all", ApiResponse::empty());
        let client = SandboxClient::new(api, ClientConfig::default());

        client.shutdown("abc").await.unwrap();
        client.hibernate("abc").await.unwrap();
        client.update_tier("abc", VmTier::Small).await.unwrap();
        client.update_hibernation_timeout("abc", 600).await.unwrap();
        client.preview_tokens("abc").revoke_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_vm_operation_failures_name_operation() {
        let api = Arc::new(FakeControlPlane::new());
        api.push_value("hibernate", ApiResponse::failed(409, ErrorBody::message("busy")));
        api.push_value(
            "update_hibernation_timeout",
            ApiResponse::failed(400, ErrorBody::message("too long")),
        );
        let client = SandboxClient::new(api, ClientConfig::default());

        let err = client.hibernate("abc").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to hibernate sandbox abc (HTTP 409): busy");

        let err = client
            .update_hibernation_timeout("abc", 100_000)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to update hibernation timeout for sandbox abc"));
    }
}
