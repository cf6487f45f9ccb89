//! The HTTP client for the shield/proof/relay/swap service

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::types::{
    HealthResponse, PoolStatusResponse, PoolsListResponse, ProofJobResponse,
    ProofStatusResponse, RelayUnshieldRequest, RelayUnshieldResponse, RelayerInfoResponse,
    ShieldPrepareRequest, ShieldPrepareResponse, SwapExecuteRequest, SwapExecuteResponse,
    SwapQuoteRequest, SwapQuoteResponse, UnshieldProofRequest,
};

// ----------
// | Routes |
// ----------

/// The route to prepare a shield transaction
const SHIELD_PREPARE_ROUTE: &str = "shield/prepare";
/// The route to submit an unshield proof job
const UNSHIELD_PROOF_ROUTE: &str = "unshield/proof";
/// The route to poll a proof job's status
const PROOF_STATUS_ROUTE: &str = "proof/status";
/// The route to relay an unshield through the relayer
const RELAY_UNSHIELD_ROUTE: &str = "relay/unshield";
/// The route to fetch relayer info
const RELAY_INFO_ROUTE: &str = "relay/info";
/// The route to fetch a swap quote
const SWAP_QUOTE_ROUTE: &str = "swap/quote";
/// The route to execute a private swap
const SWAP_EXECUTE_ROUTE: &str = "swap/execute";
/// The route to fetch pool statistics
const POOL_STATUS_ROUTE: &str = "pool/status";
/// The route to list denomination pools
const POOL_LIST_ROUTE: &str = "pool/pools";
/// The route for service health checks
const HEALTH_ROUTE: &str = "health";

// -------------
// | Interface |
// -------------

/// The interface to the shield/proof/relay/swap service
///
/// A trait so the state machines can be driven against a fake in tests
#[async_trait]
pub trait PoolServiceApi: Send + Sync {
    /// Prepare a shield (deposit) transaction
    async fn prepare_shield(
        &self,
        req: &ShieldPrepareRequest,
    ) -> Result<ShieldPrepareResponse, ApiError>;

    /// Submit an unshield proof generation job
    async fn request_unshield_proof(
        &self,
        req: &UnshieldProofRequest,
    ) -> Result<ProofJobResponse, ApiError>;

    /// Poll the status of a proof job
    async fn proof_status(&self, job_id: &str) -> Result<ProofStatusResponse, ApiError>;

    /// Submit a withdrawal through the relayer
    async fn relay_unshield(
        &self,
        req: &RelayUnshieldRequest,
    ) -> Result<RelayUnshieldResponse, ApiError>;

    /// Fetch information about the relayer
    async fn relayer_info(&self) -> Result<RelayerInfoResponse, ApiError>;

    /// Fetch a swap quote
    async fn swap_quote(&self, req: &SwapQuoteRequest) -> Result<SwapQuoteResponse, ApiError>;

    /// Execute a private swap
    async fn execute_swap(
        &self,
        req: &SwapExecuteRequest,
    ) -> Result<SwapExecuteResponse, ApiError>;

    /// Fetch pool statistics
    async fn pool_status(&self) -> Result<PoolStatusResponse, ApiError>;

    /// List the available denomination pools
    async fn pools(&self) -> Result<PoolsListResponse, ApiError>;

    /// Check the service's health
    async fn health(&self) -> Result<HealthResponse, ApiError>;
}

// ----------
// | Client |
// ----------

/// The reqwest-backed service API client
#[derive(Clone, Debug)]
pub struct HttpPoolServiceApi {
    /// The base URL all routes are resolved against
    base_url: Url,
    /// The underlying HTTP client
    client: Client,
}

impl HttpPoolServiceApi {
    /// Construct a client against the given service base URL
    pub fn new(mut base_url: Url) -> Self {
        // Routes are joined relative to the base path; a missing trailing
        // slash would drop the last path segment
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Self { base_url, client: Client::new() }
    }

    /// Resolve a route against the base URL
    fn route(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Issue a GET request and parse the response
    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let resp = self
            .client
            .get(self.route(path)?)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::parse_response(resp).await
    }

    /// Issue a POST request with a JSON body and parse the response
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let resp = self
            .client
            .post(self.route(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::parse_response(resp).await
    }

    /// Parse a response, mapping non-2xx statuses into an API error
    async fn parse_response<R: DeserializeOwned>(resp: Response) -> Result<R, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let message = Self::error_detail(resp).await;
            return Err(ApiError::Api { status: status.as_u16(), message });
        }

        resp.json::<R>().await.map_err(|e| ApiError::Parsing(e.to_string()))
    }

    /// Extract the service's error detail from a failed response body
    async fn error_detail(resp: Response) -> String {
        /// The shape of the service's error bodies
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            /// The error detail message
            detail: String,
        }

        match resp.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => "unknown error".to_string(),
        }
    }
}

#[async_trait]
impl PoolServiceApi for HttpPoolServiceApi {
    async fn prepare_shield(
        &self,
        req: &ShieldPrepareRequest,
    ) -> Result<ShieldPrepareResponse, ApiError> {
        self.post(SHIELD_PREPARE_ROUTE, req).await
    }

    async fn request_unshield_proof(
        &self,
        req: &UnshieldProofRequest,
    ) -> Result<ProofJobResponse, ApiError> {
        self.post(UNSHIELD_PROOF_ROUTE, req).await
    }

    async fn proof_status(&self, job_id: &str) -> Result<ProofStatusResponse, ApiError> {
        self.get(&format!("{PROOF_STATUS_ROUTE}/{job_id}")).await
    }

    async fn relay_unshield(
        &self,
        req: &RelayUnshieldRequest,
    ) -> Result<RelayUnshieldResponse, ApiError> {
        // A failure here implies funds did not move; reclassify so callers
        // can surface the distinct message
        self.post(RELAY_UNSHIELD_ROUTE, req).await.map_err(|e| match e {
            ApiError::Api { message, .. } => ApiError::Relayer(message),
            other => other,
        })
    }

    async fn relayer_info(&self) -> Result<RelayerInfoResponse, ApiError> {
        self.get(RELAY_INFO_ROUTE).await
    }

    async fn swap_quote(&self, req: &SwapQuoteRequest) -> Result<SwapQuoteResponse, ApiError> {
        let path = format!(
            "{SWAP_QUOTE_ROUTE}?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            req.input_mint, req.output_mint, req.amount, req.slippage_bps,
        );
        self.get(&path).await
    }

    async fn execute_swap(
        &self,
        req: &SwapExecuteRequest,
    ) -> Result<SwapExecuteResponse, ApiError> {
        self.post(SWAP_EXECUTE_ROUTE, req).await
    }

    async fn pool_status(&self) -> Result<PoolStatusResponse, ApiError> {
        self.get(POOL_STATUS_ROUTE).await
    }

    async fn pools(&self) -> Result<PoolsListResponse, ApiError> {
        self.get(POOL_LIST_ROUTE).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get(HEALTH_ROUTE).await
    }
}
