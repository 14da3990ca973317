//! InfluxDB v2 HTTP query client.

use std::time::Duration;

use reqwest::{header, Client};
use tracing::{debug, instrument, warn};

use super::flux::{parse_annotated_csv, FluxRecord};
use crate::config::InfluxConnection;
use crate::error::{ProviderError, Result};

const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the `/api/v2/query` endpoint.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    url: String,
    org: Option<String>,
    token: Option<String>,
}

impl InfluxClient {
    pub fn new(connection: &InfluxConnection) -> Result<Self> {
        let client = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let token = connection.token();
        if token.is_none() {
            warn!(
                variable = %connection.token_variable,
                "InfluxDB token variable not set, querying without authorization"
            );
        }

        Ok(Self {
            client,
            url: connection.url.trim_end_matches('/').to_string(),
            org: connection.org.clone(),
            token,
        })
    }

    /// Run a Flux query and decode the CSV response.
    #[instrument(skip(self, flux), fields(url = %self.url))]
    pub async fn query(&self, flux: &str) -> Result<Vec<FluxRecord>> {
        debug!(flux = %flux, "Running Flux query");

        let mut request = self
            .client
            .post(format!("{}/api/v2/query", self.url))
            .header(header::CONTENT_TYPE, "application/vnd.flux")
            .header(header::ACCEPT, "application/csv")
            .body(flux.to_string());
        if let Some(org) = &self.org {
            request = request.query(&[("org", org)]);
        }
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Connection(format!(
                "InfluxDB query failed ({}): {}",
                status,
                body.trim()
            )));
        }

        let records = parse_annotated_csv(&body)?;
        debug!(count = records.len(), "Flux query returned");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn connection(url: String, token_variable: &str) -> InfluxConnection {
        InfluxConnection {
            url,
            bucket: "oceanlab".to_string(),
            org: Some("sintef".to_string()),
            token_variable: token_variable.to_string(),
            since: None,
        }
    }

    #[tokio::test]
    async fn test_query_sends_flux_with_token() {
        std::env::set_var("EDR_TEST_INFLUX_CLIENT_TOKEN", "secret");
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v2/query")
                    .query_param("org", "sintef")
                    .header("Authorization", "Token secret")
                    .header("Content-Type", "application/vnd.flux")
                    .body_contains("from(bucket: \"oceanlab\")");
                then.status(200)
                    .header("Content-Type", "text/csv")
                    .body(",result,table,_time,temperature\n,,0,2023-05-01T02:30:00Z,8.5\n");
            })
            .await;

        let client =
            InfluxClient::new(&connection(server.base_url(), "EDR_TEST_INFLUX_CLIENT_TOKEN")).unwrap();
        let records = client.query("from(bucket: \"oceanlab\")").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number("temperature"), Some(8.5));
    }

    #[tokio::test]
    async fn test_error_status_is_connection_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v2/query");
                then.status(401).body("{\"code\":\"unauthorized\"}");
            })
            .await;

        let client =
            InfluxClient::new(&connection(server.base_url(), "EDR_TEST_INFLUX_UNSET_TOKEN")).unwrap();
        let err = client.query("from(bucket: \"oceanlab\")").await.unwrap_err();
        assert!(matches!(err, ProviderError::Connection(msg) if msg.contains("401")));
    }
}
