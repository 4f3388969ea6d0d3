//! Authenticated Request Gateway
//!
//! `Gateway::send` attaches the current bearer token, dispatches, and on a
//! 401 recovers at most once:
//!
//! 1. First 401 while idle: this request leads a refresh (`RefreshState::admit`)
//! 2. 401 while a refresh is in flight: the request waits in the FIFO queue
//! 3. Refresh succeeds: token stored, queued requests replayed in arrival
//!    order, then the leader's own request, all dispatched from one task
//! 4. Refresh fails or times out: token cleared, every queued request fails
//!    with `SessionExpired`, the session listener is told
//!
//! Replays go through `replay`, which never enters recovery again. A replay
//! that is still unauthorized ends the session.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use budget_auth::{JSON_MIME, MemoryTokenStore, TokenStore, User};
use common::Secret;
use futures_util::future::join_all;
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::classify::{classify_status, outcome_label};
use crate::error::{GatewayError, Result};
use crate::refresh::{Admission, HttpRefresher, PendingRequest, RefreshState, SettleGuard, TokenRefresher};
use crate::request::{ApiResponse, RequestDescriptor};
use crate::session::{NoopListener, SessionListener};

/// Default per-request timeout for backend calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single refresh call
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on how long a queued request waits for a refresh to settle
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub refresh_timeout: Duration,
    pub queue_timeout: Duration,
}

struct Inner {
    client: reqwest::Client,
    config: GatewayConfig,
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    listener: Arc<dyn SessionListener>,
    refresh: RefreshState,
}

/// Cloneable handle; all clones share one credential store and one refresh state.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

impl Gateway {
    pub fn builder(base_url: impl Into<String>) -> GatewayBuilder {
        GatewayBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Cookie-carrying client shared with the refresher.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.refresh.pending_len()
    }

    /// Whether a Session Credential is currently stored.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.get().await.is_some()
    }

    /// Send a request, recovering once from an expired credential.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let epoch = self.inner.refresh.epoch();
        match self.dispatch(&request).await {
            Err(GatewayError::AuthenticationRequired) => self.recover(request, epoch).await,
            other => other,
        }
    }

    /// `send` and decode the body as JSON.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T> {
        self.send(request).await?.json()
    }

    /// Log in, store the returned token, and hand back the user.
    pub async fn sign_in(&self, email: &str, password: &Secret<String>) -> budget_auth::Result<User> {
        let login = budget_auth::login(&self.inner.client, self.base_url(), email, password).await?;
        self.inner.store.set(login.token).await?;
        info!(email, "signed in");
        Ok(login.user)
    }

    /// Log out on the backend, then drop the local session.
    ///
    /// A backend that refuses the logout does not keep the user signed in.
    pub async fn sign_out(&self) -> budget_auth::Result<()> {
        let token = self.inner.store.get().await;
        if let Err(e) = budget_auth::logout(
            &self.inner.client,
            self.base_url(),
            token.as_ref().map(|t| t.expose().as_str()),
        )
        .await
        {
            warn!(error = %e, "backend logout failed, clearing local session anyway");
        }
        self.reset_session("signed out").await
    }

    /// Clear the credential and fail every queued request.
    ///
    /// An in-flight refresh keeps running to completion; the queue it would
    /// have replayed is already empty.
    pub async fn reset_session(&self, reason: &str) -> budget_auth::Result<()> {
        self.inner.store.remove().await?;
        let pending = self.inner.refresh.take_pending();
        if !pending.is_empty() {
            debug!(rejected = pending.len(), reason, "failing queued requests");
        }
        for waiter in pending {
            waiter.resolve(Err(GatewayError::SessionExpired(reason.to_string())));
        }
        Ok(())
    }

    async fn recover(&self, request: RequestDescriptor, epoch: u64) -> Result<ApiResponse> {
        match self.inner.refresh.admit(request, epoch) {
            Admission::Lead(request) => self.lead_refresh(request).await,
            Admission::Stale(request) => {
                debug!("token changed since dispatch, replaying without refresh");
                self.replay(request).await
            }
            Admission::Expired => Err(GatewayError::SessionExpired(
                "token refresh failed while the request was in flight".into(),
            )),
            Admission::Queued(receiver) => {
                match tokio::time::timeout(self.inner.config.queue_timeout, receiver).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_)) => Err(GatewayError::SessionExpired(
                        "token refresh ended without a result".into(),
                    )),
                    Err(_) => Err(GatewayError::SessionExpired(format!(
                        "timed out after {}s waiting for token refresh",
                        self.inner.config.queue_timeout.as_secs_f64()
                    ))),
                }
            }
        }
    }

    async fn lead_refresh(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let guard = SettleGuard::new(&self.inner.refresh);
        info!("access token rejected, refreshing");

        let outcome = match tokio::time::timeout(
            self.inner.config.refresh_timeout,
            self.inner.refresher.refresh(),
        )
        .await
        {
            Ok(Ok(token)) => self
                .inner
                .store
                .set(token)
                .await
                .map_err(|e| format!("storing refreshed token: {e}")),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "token refresh timed out after {}s",
                self.inner.config.refresh_timeout.as_secs_f64()
            )),
        };

        match outcome {
            Ok(()) => {
                metrics::counter!("gateway_refresh_total", "outcome" => "success").increment(1);
                let pending = guard.settle(true);
                info!(replaying = pending.len(), "token refreshed");
                self.replay_in_order(pending, request).await
            }
            Err(reason) => {
                metrics::counter!("gateway_refresh_total", "outcome" => "failure").increment(1);
                warn!(error = %reason, "token refresh failed, ending session");
                self.clear_credential().await;
                let pending = guard.settle(false);
                for waiter in pending {
                    waiter.resolve(Err(GatewayError::SessionExpired(reason.clone())));
                }
                Err(self.expire(reason))
            }
        }
    }

    /// Replay the drained queue, then the leader's own request, from one task.
    ///
    /// `join_all` first-polls its futures in order, so replays are dispatched
    /// in queue order and still overlap in flight. Each caller gets its result
    /// as soon as its own replay finishes. The batch is detached from the
    /// leader, so cancelling the leader does not strand its waiters.
    async fn replay_in_order(
        &self,
        pending: Vec<PendingRequest>,
        request: RequestDescriptor,
    ) -> Result<ApiResponse> {
        let mut batch: Vec<PendingRequest> = pending
            .into_iter()
            .filter(|waiter| {
                if waiter.is_abandoned() {
                    debug!(path = %waiter.request.path, "queued caller gone, skipping replay");
                    return false;
                }
                true
            })
            .collect();
        let (reply, receiver) = oneshot::channel();
        batch.push(PendingRequest { request, reply });

        let gateway = self.clone();
        tokio::spawn(async move {
            let replays = batch.into_iter().map(|PendingRequest { request, reply }| {
                let gateway = gateway.clone();
                async move {
                    let result = gateway.replay(request).await;
                    let _ = reply.send(result);
                }
            });
            join_all(replays).await;
        });

        receiver.await.unwrap_or_else(|_| {
            Err(GatewayError::SessionExpired(
                "token refresh ended without a result".into(),
            ))
        })
    }

    /// Dispatch a request that already went through recovery.
    async fn replay(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        metrics::counter!("gateway_replayed_requests_total").increment(1);
        match self.dispatch(&request).await {
            Err(GatewayError::AuthenticationRequired) => {
                warn!(path = %request.path, "still unauthorized after refresh, ending session");
                self.clear_credential().await;
                Err(self.expire("request rejected again after token refresh".into()))
            }
            other => other,
        }
    }

    async fn clear_credential(&self) {
        if let Err(e) = self.inner.store.remove().await {
            warn!(error = %e, "failed to clear session credential");
        }
    }

    fn expire(&self, reason: String) -> GatewayError {
        metrics::counter!("gateway_session_expired_total").increment(1);
        self.inner.listener.on_expired();
        GatewayError::SessionExpired(reason)
    }

    /// One HTTP round trip with the credential currently in the store.
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        let url = self.url_for(request)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));

        for (name, value) in &request.headers {
            let name = match HeaderName::from_str(name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == AUTHORIZATION {
                warn!("ignoring caller-supplied Authorization header");
                continue;
            }
            let value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }

        if let Some(token) = self.inner.store.get().await {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|_| GatewayError::InvalidRequest("stored token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("gateway_requests_total", "outcome" => "network").increment(1);
                return Err(GatewayError::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response.text().await?;

        let classified = classify_status(status, &body);
        metrics::counter!("gateway_requests_total", "outcome" => outcome_label(&classified))
            .increment(1);
        classified?;

        Ok(ApiResponse {
            status,
            headers: response_headers,
            body,
        })
    }

    fn url_for(&self, request: &RequestDescriptor) -> Result<Url> {
        let joined = budget_auth::endpoint(self.base_url(), &request.path);
        let mut url = Url::parse(&joined)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid URL {joined}: {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }
}

/// Builder for `Gateway`.
///
/// Without an explicit client, one is built with a cookie jar so the refresh
/// cookie set at login rides along on `POST /auth/refresh`. Without an
/// explicit refresher, an `HttpRefresher` over that same client is used.
pub struct GatewayBuilder {
    base_url: String,
    client: Option<reqwest::Client>,
    store: Option<Arc<dyn TokenStore>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    listener: Arc<dyn SessionListener>,
    request_timeout: Duration,
    refresh_timeout: Duration,
    queue_timeout: Duration,
}

impl GatewayBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: None,
            store: None,
            refresher: None,
            listener: Arc::new(NoopListener),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
        }
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Timeout for each backend call. Ignored when a client is supplied.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| GatewayError::Configuration(format!("invalid base URL {base_url}: {e}")))?;

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .cookie_store(true)
                .timeout(self.request_timeout)
                .build()
                .map_err(|e| GatewayError::Configuration(format!("building HTTP client: {e}")))?,
        };
        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(HttpRefresher::new(client.clone(), base_url.clone())));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Ok(Gateway {
            inner: Arc::new(Inner {
                client,
                config: GatewayConfig {
                    base_url,
                    refresh_timeout: self.refresh_timeout,
                    queue_timeout: self.queue_timeout,
                },
                store,
                refresher,
                listener: self.listener,
                refresh: RefreshState::new(),
            }),
        })
    }
}
