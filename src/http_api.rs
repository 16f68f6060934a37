use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};

use crate::{
    accounts::AccountSource,
    aggregator::Aggregator,
    directory::{PopDirectory, PopRecord},
    errors::InitializationError,
    stats::{Granularity, StatsWindow, TimeSeries, UsageSummary},
    utils::next_request_id,
    AggregateError, DirectoryError, GatewayError,
};

/// Shared handles of the API handlers
#[derive(Clone)]
pub struct ApiState {
    aggregator: Arc<Aggregator>,
    directory: PopDirectory,
    accounts: Arc<dyn AccountSource>,
}

impl ApiState {
    pub fn new(
        aggregator: Arc<Aggregator>,
        directory: PopDirectory,
        accounts: Arc<dyn AccountSource>,
    ) -> Self {
        Self {
            aggregator,
            directory,
            accounts,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    pops: usize,
}

#[derive(Debug, Serialize)]
struct SeriesResponse {
    stats: TimeSeries,
}

#[derive(Debug, Serialize)]
struct PopsResponse {
    pops: Vec<PopRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SpanQuery {
    span: u32,
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    #[serde(rename = "type")]
    chart_type: String,
    start_time: i64,
    end_time: i64,
}

/// Handler failure rendered as a JSON error body
struct ApiError(GatewayError);

impl<E: Into<GatewayError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::Directory(DirectoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            GatewayError::Aggregate(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            GatewayError::Aggregate(_) | GatewayError::Directory(_) | GatewayError::Backend(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Accounts(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Config(_) | GatewayError::Init(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }

        // Expose the innermost message, not the layered prefixes
        let error = match self.0 {
            GatewayError::Aggregate(e) => e.to_string(),
            GatewayError::Directory(e) => e.to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok",
        pops: state.directory.len(),
    };

    (StatusCode::OK, Json(response))
}

async fn trailing_stats_handler(
    State(state): State<ApiState>,
    Path((owner, path)): Path<(String, String)>,
    Query(query): Query<SpanQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let granularity = Granularity::from_trailing_path(&path)
        .ok_or_else(|| AggregateError::InvalidWindow(format!("unknown stats path {}", path)))?;

    let accounts = state.accounts.accounts(&owner).await?;
    let stats = state
        .aggregator
        .aggregate(&accounts, StatsWindow::trailing(granularity, query.span))
        .await?;

    Ok(Json(SeriesResponse { stats }))
}

async fn chart_handler(
    State(state): State<ApiState>,
    Path(owner): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let accounts = state.accounts.accounts(&owner).await?;
    let stats = state
        .aggregator
        .merge_chart(&accounts, &query.chart_type, query.start_time, query.end_time)
        .await?;

    Ok(Json(SeriesResponse { stats }))
}

async fn usage_handler(
    State(state): State<ApiState>,
    Path(owner): Path<String>,
) -> Result<Json<UsageSummary>, ApiError> {
    let accounts = state.accounts.accounts(&owner).await?;
    Ok(Json(state.aggregator.usage_summary(&accounts).await))
}

async fn pops_handler(State(state): State<ApiState>) -> Result<Json<PopsResponse>, ApiError> {
    let pops = state.directory.list().await?;
    Ok(Json(PopsResponse { pops }))
}

async fn pop_handler(
    State(state): State<ApiState>,
    Path(pop_id): Path<String>,
) -> Result<Json<PopRecord>, ApiError> {
    Ok(Json(state.directory.get(&pop_id).await?))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/owners/:owner/stats/:granularity", get(trailing_stats_handler))
        .route("/owners/:owner/chart", get(chart_handler))
        .route("/owners/:owner/usage", get(usage_handler))
        .route("/pops", get(pops_handler))
        .route("/pops/:id", get(pop_handler))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    id = next_request_id(),
                    method = %request.method(),
                    uri = %request.uri()
                )
            }),
        )
        .with_state(state)
}

pub async fn start_http_server(
    listen_addr: String,
    state: ApiState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GatewayError> {
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| {
            InitializationError::http(format!("Failed to bind to {}: {}", listen_addr, e))
        })?;

    info!("HTTP server listening on {}", listen_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| InitializationError::http(format!("HTTP server failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use async_trait::async_trait;
    use axum::body::to_bytes;
    use reqwest::StatusCode as BackendStatus;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        accounts::StaticAccounts,
        backend::{PopSource, StatsSource},
        config::FanoutConfig,
        stats::{BaseStats, StatPoint},
        AccountsError, BackendError,
    };

    /// Backend answering every account with a fixed series, or a failure
    struct FixedBackend {
        series: HashMap<String, Option<TimeSeries>>,
        pops: Vec<PopRecord>,
    }

    #[async_trait]
    impl StatsSource for FixedBackend {
        async fn fetch_series(
            &self,
            account: &str,
            _window: &StatsWindow,
        ) -> Result<TimeSeries, BackendError> {
            self.series
                .get(account)
                .cloned()
                .flatten()
                .ok_or_else(|| BackendError::status(BackendStatus::BAD_REQUEST, "user not found"))
        }

        async fn fetch_base_stats(&self, account: &str) -> Result<BaseStats, BackendError> {
            let window = StatsWindow::trailing(Granularity::Day, 1);
            let series = self.fetch_series(account, &window).await?;
            Ok(BaseStats {
                current_bandwidth: series.iter().map(|p| p.bandwidth).sum(),
                total_traffic: series.iter().map(|p| p.traffic).sum(),
            })
        }
    }

    #[async_trait]
    impl PopSource for FixedBackend {
        async fn fetch_pops(&self) -> Result<Vec<PopRecord>, BackendError> {
            Ok(self.pops.clone())
        }
    }

    /// Account store that cannot be reached
    struct UnreachableAccounts;

    #[async_trait]
    impl AccountSource for UnreachableAccounts {
        async fn accounts(&self, _owner: &str) -> Result<Vec<String>, AccountsError> {
            Err(AccountsError::Unavailable("connection refused".to_string()))
        }
    }

    async fn app() -> Router {
        app_with_accounts(None).await
    }

    async fn app_with_accounts(custom: Option<Arc<dyn AccountSource>>) -> Router {
        let backend = Arc::new(FixedBackend {
            series: HashMap::from([
                (
                    "sub-a".to_string(),
                    Some(vec![StatPoint::new(3600, 1, 2), StatPoint::new(7200, 3, 4)]),
                ),
                (
                    "sub-b".to_string(),
                    Some(vec![StatPoint::new(3600, 10, 20), StatPoint::new(7200, 30, 40)]),
                ),
                ("sub-broken".to_string(), None),
            ]),
            pops: vec![
                PopRecord::new("P2", "Frankfurt", "eu", "10.0.0.2:1080"),
                PopRecord::new("P1", "Ashburn", "us", "10.0.0.1:1080"),
            ],
        });

        let stats: Arc<dyn StatsSource> = backend.clone();
        let pops: Arc<dyn PopSource> = backend;
        let accounts = StaticAccounts::new(BTreeMap::from([
            (
                "owner-1".to_string(),
                vec!["sub-a".to_string(), "sub-b".to_string()],
            ),
            (
                "owner-2".to_string(),
                vec!["sub-a".to_string(), "sub-broken".to_string()],
            ),
        ]));

        let state = ApiState::new(
            Arc::new(Aggregator::new(stats, &FanoutConfig::default())),
            PopDirectory::connect(pops).await.unwrap(),
            custom.unwrap_or_else(|| Arc::new(accounts) as Arc<dyn AccountSource>),
        );

        router(state)
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        call_app(app().await, uri).await
    }

    async fn call_app(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };

        (status, value)
    }

    #[tokio::test]
    async fn test_account_store_failure_is_unavailable() {
        let app = app_with_accounts(Some(Arc::new(UnreachableAccounts))).await;

        let (status, body) = call_app(app, "/owners/owner-1/usage").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            json!({"error": "Accounts error: Account store unavailable: connection refused"})
        );
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "pops": 2}));
    }

    #[tokio::test]
    async fn test_trailing_stats_are_merged() {
        let (status, body) = call("/owners/owner-1/stats/perhour?span=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"stats": [
                {"timestamp": 3600, "bandwidth": 11, "traffic": 22},
                {"timestamp": 7200, "bandwidth": 33, "traffic": 44}
            ]})
        );
    }

    #[tokio::test]
    async fn test_unknown_owner_gets_placeholder() {
        let (status, body) = call("/owners/nobody/stats/perday?span=3").await;

        assert_eq!(status, StatusCode::OK);
        let stats = body["stats"].as_array().unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|p| p["traffic"] == 0 && p["bandwidth"] == 0));
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway() {
        let (status, body) = call("/owners/owner-2/stats/perhour?span=2").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            json!({"error": "Get account sub-broken stats: user not found"})
        );
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let (status, _) = call("/owners/owner-1/stats/perweek?span=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call("/owners/owner-1/stats/perhour").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            call("/owners/owner-1/chart?type=week&start_time=0&end_time=3600").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid chart type: week"}));

        let (status, _) =
            call("/owners/nobody/chart?type=minute&start_time=0&end_time=9223372036854775807")
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call("/owners/nobody/stats/perday?span=4294967295").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chart() {
        let (status, body) =
            call("/owners/owner-1/chart?type=hour&start_time=3600&end_time=7200").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"][1]["traffic"], 44);
    }

    #[tokio::test]
    async fn test_usage_skips_failing_accounts() {
        let (status, body) = call("/owners/owner-2/usage").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_current_bandwidth"], 4);
        assert_eq!(body["total_traffic"], 6);
        assert!(body["accounts"].get("sub-broken").is_none());
    }

    #[tokio::test]
    async fn test_pops() {
        let (status, body) = call("/pops").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pops"][0]["id"], "P1");
        assert_eq!(body["pops"][1]["id"], "P2");

        let (status, body) = call("/pops/P2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Frankfurt");
        assert_eq!(body["socks5_address"], "10.0.0.2:1080");

        let (status, body) = call("/pops/P9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Pop P9 does not exist"}));
    }
}
