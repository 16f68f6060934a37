use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{
    token::resolve_access_token,
    wire::{BaseStatsResponse, PopsResponse, StatsResponse},
    PopSource, StatsSource,
};
use crate::{
    config::BackendConfig,
    directory::PopRecord,
    stats::{BaseStats, StatsWindow, TimeSeries},
    BackendError,
};

/// HTTP client for the metering backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: Arc<str>,
}

impl BackendClient {
    /// Builds a client, resolving the bearer token from the configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let token = resolve_access_token(config)?;
        Self::with_token(config, token)
    }

    pub fn with_token(
        config: &BackendConfig,
        token: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let base_url = config.base_url();
        reqwest::Url::parse(base_url).map_err(|e| BackendError::InvalidUrl {
            url: base_url.to_string(),
            details: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::transport(base_url, e))?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url),
            token: Arc::from(token.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::transport(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            // The body is only a diagnostic here, a failed read leaves it empty
            let body = response.text().await.unwrap_or_default();
            debug!("GET {} answered {}: {}", url, status, body);
            return Err(BackendError::status(status, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::transport(&url, e))?;

        serde_json::from_slice(&body).map_err(|e| BackendError::decode(&url, e))
    }
}

#[async_trait]
impl StatsSource for BackendClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_series(
        &self,
        account: &str,
        window: &StatsWindow,
    ) -> Result<TimeSeries, BackendError> {
        let response: StatsResponse = match *window {
            StatsWindow::Trailing { granularity, span } => {
                let path = format!("/user/stats/{}", granularity.trailing_path());
                let query = [
                    ("username", account.to_string()),
                    (granularity.span_param(), span.to_string()),
                ];
                self.get_json(&path, &query).await?
            }
            StatsWindow::Chart {
                granularity,
                start,
                end,
            } => {
                let query = [
                    ("type", granularity.chart_type().to_string()),
                    ("username", account.to_string()),
                    ("start_time", start.to_string()),
                    ("end_time", end.to_string()),
                ];
                self.get_json("/user/stats/chart", &query).await?
            }
        };

        Ok(response.into())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_base_stats(&self, account: &str) -> Result<BaseStats, BackendError> {
        let response: BaseStatsResponse = self
            .get_json("/user/stats/base", &[("username", account.to_string())])
            .await?;
        Ok(response.into())
    }
}

#[async_trait]
impl PopSource for BackendClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_pops(&self) -> Result<Vec<PopRecord>, BackendError> {
        let response: PopsResponse = self.get_json("/pops", &[]).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Granularity, StatPoint};
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> BackendClient {
        let config = BackendConfig {
            url: server.url(),
            access_token: Some("test-token".to_string()),
            ..Default::default()
        };
        BackendClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_trailing_series_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user/stats/per5min")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "sub-a".into()),
                Matcher::UrlEncoded("minutes".into(), "10".into()),
            ]))
            .match_header("authorization", "Bearer test-token")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"stats":[{"timestamp":600,"bandwidth":1,"traffic":2},{"timestamp":900,"bandwidth":3,"traffic":4}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let series = client
            .fetch_series("sub-a", &StatsWindow::trailing(Granularity::FiveMinutes, 10))
            .await
            .unwrap();

        assert_eq!(
            series,
            vec![StatPoint::new(600, 1, 2), StatPoint::new(900, 3, 4)]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hour_and_day_paths() {
        let mut server = mockito::Server::new_async().await;
        let hourly = server
            .mock("GET", "/user/stats/perhour")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "sub-a".into()),
                Matcher::UrlEncoded("hours".into(), "24".into()),
            ]))
            .with_body(r#"{"stats":[]}"#)
            .create_async()
            .await;
        let daily = server
            .mock("GET", "/user/stats/perday")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "sub-a".into()),
                Matcher::UrlEncoded("days".into(), "7".into()),
            ]))
            .with_body(r#"{"stats":null}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client
            .fetch_series("sub-a", &StatsWindow::trailing(Granularity::Hour, 24))
            .await
            .unwrap()
            .is_empty());
        assert!(client
            .fetch_series("sub-a", &StatsWindow::trailing(Granularity::Day, 7))
            .await
            .unwrap()
            .is_empty());

        hourly.assert_async().await;
        daily.assert_async().await;
    }

    #[tokio::test]
    async fn test_chart_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user/stats/chart")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "hour".into()),
                Matcher::UrlEncoded("username".into(), "sub-a".into()),
                Matcher::UrlEncoded("start_time".into(), "3600".into()),
                Matcher::UrlEncoded("end_time".into(), "7200".into()),
            ]))
            .with_body(r#"{"stats":[{"timestamp":3600,"bandwidth":5,"traffic":6}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let series = client
            .fetch_series("sub-a", &StatsWindow::chart(Granularity::Hour, 3600, 7200))
            .await
            .unwrap();

        assert_eq!(series, vec![StatPoint::new(3600, 5, 6)]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user/stats/per5min")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("username sub-x not exist")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_series("sub-x", &StatsWindow::trailing(Granularity::FiveMinutes, 10))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "username sub-x not exist");
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_empty_error_body_falls_back_to_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user/stats/base")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.fetch_base_stats("sub-a").await.unwrap_err();
        assert_eq!(err.to_string(), "status code 502");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pops")
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.fetch_pops().await.unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_base_stats_and_pops() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user/stats/base")
            .match_query(Matcher::UrlEncoded("username".into(), "sub-a".into()))
            .with_body(r#"{"currentBandwidth":7,"totalTraffic":900}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/pops")
            .match_header("authorization", "Bearer test-token")
            .with_body(r#"{"pops":[{"id":"P1","name":"East","area":"us","socks5Addr":"1.2.3.4:1080"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let base = client.fetch_base_stats("sub-a").await.unwrap();
        assert_eq!(base.current_bandwidth, 7);
        assert_eq!(base.total_traffic, 900);

        let pops = client.fetch_pops().await.unwrap();
        assert_eq!(pops.len(), 1);
        assert_eq!(pops[0].name, "East");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = BackendConfig {
            // Reserved port, nothing listens there
            url: "http://127.0.0.1:9".to_string(),
            access_token: Some("test-token".to_string()),
            ..Default::default()
        };
        let client = BackendClient::new(&config).unwrap();
        let err = client.fetch_pops().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport { .. }), "got {:?}", err);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = BackendConfig {
            url: "http://".to_string(),
            access_token: Some("t".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            BackendClient::new(&config),
            Err(BackendError::InvalidUrl { .. })
        ));
    }
}
