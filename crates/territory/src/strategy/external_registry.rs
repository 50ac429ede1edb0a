//! Direct lookup against the authoritative external address registry.
//!
//! `GET {base_url}/v1/service-addresses/lookup` with the normalized address as
//! query parameters. The registry answers with its chosen operator and a
//! match score between 0 and 1.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::config::{BoundaryData, ExternalRegistryConfig};
use crate::errors::TerritoryError;
use crate::guard::{CircuitState, SourceGuard};
use crate::models::{
    BoundaryLookupResult, Confidence, NormalizedAddress, StrategyId, StrategyMetadata,
};

const SOURCE_NAME: &str = "external_registry";
const LOOKUP_PATH: &str = "/v1/service-addresses/lookup";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    operator_id: Option<String>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    reference_id: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

pub struct ExternalRegistryStrategy {
    client: Client,
    config: ExternalRegistryConfig,
    guard: SourceGuard,
    data: Arc<BoundaryData>,
}

impl ExternalRegistryStrategy {
    pub fn new(config: ExternalRegistryConfig, data: Arc<BoundaryData>) -> Self {
        let guard = SourceGuard::new(SOURCE_NAME, config.requests_per_minute);
        Self::with_guard(config, data, guard)
    }

    pub fn with_guard(config: ExternalRegistryConfig, data: Arc<BoundaryData>, guard: SourceGuard) -> Self {
        Self {
            client: Client::new(),
            config,
            guard,
            data,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.guard.state()
    }

    fn confidence_for(&self, score: f64) -> Confidence {
        if score >= self.config.high_confidence_threshold {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }

    async fn fetch(
        &self,
        address: &NormalizedAddress,
        ctx: &ResolveContext,
    ) -> Result<Option<LookupResponse>, TerritoryError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), LOOKUP_PATH);
        let house_and_street = match &address.house_number {
            Some(number) => format!("{} {}", number, address.full_street()),
            None => address.full_street(),
        };

        let mut request = self
            .client
            .get(&url)
            .timeout(ctx.remaining())
            .query(&[
                ("street", house_and_street.as_str()),
                ("city", address.city.as_str()),
                ("state", address.region.as_str()),
                ("postalCode", address.postal_code.as_str()),
            ]);
        if let Some(unit) = &address.unit_number {
            request = request.query(&[("unit", unit.as_str())]);
        }
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-Api-Key", api_key);
        }

        debug!("Registry lookup for {}", address.postal_code);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TerritoryError::ExternalServiceTimeout {
                    source_name: SOURCE_NAME.to_string(),
                }
            } else {
                TerritoryError::ExternalServiceError {
                    source_name: SOURCE_NAME.to_string(),
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TerritoryError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TerritoryError::ExternalServiceError {
                source_name: SOURCE_NAME.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }
        if !status.is_success() {
            return Err(TerritoryError::ExternalServiceError {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .json::<LookupResponse>()
            .await
            .map(Some)
            .map_err(|e| TerritoryError::ExternalServiceError {
                source_name: SOURCE_NAME.to_string(),
                message: format!("Malformed response: {}", e),
            })
    }

    fn interpret(
        &self,
        address: &NormalizedAddress,
        response: LookupResponse,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        let operator_id = response.operator_id?;
        let Some(operator) = self.data.operator(&operator_id).cloned() else {
            return Some(Err(TerritoryError::ExternalServiceError {
                source_name: SOURCE_NAME.to_string(),
                message: format!("Unknown operator {}", operator_id),
            }));
        };
        let alternates = self.data.alternates_for(&address.postal_code, &operator.id);

        Some(Ok(BoundaryLookupResult::new(
            StrategyId::ExternalRegistry,
            operator,
            self.confidence_for(response.score),
            StrategyMetadata::ExternalRegistry {
                reference_id: response.reference_id,
                registry_score: response.score,
            },
        )
        .with_alternates(alternates)
        .with_data_as_of(response.updated_at.unwrap_or_else(Utc::now))))
    }
}

#[async_trait]
impl BoundaryStrategy for ExternalRegistryStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::ExternalRegistry
    }

    fn is_network_bound(&self) -> bool {
        true
    }

    async fn attempt(
        &self,
        address: &NormalizedAddress,
        ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        if let Err(err) = self.guard.admit(ctx.deadline).await {
            return Some(Err(err));
        }

        let fetched = self.fetch(address, ctx).await;
        self.guard.record(&fetched);
        match fetched {
            Ok(Some(response)) => self.interpret(address, response),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{CircuitBreaker, CircuitBreakerConfig, RateLimiter};
    use crate::strategy::test_support::address;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response per accepted connection.
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn strategy(base_url: String) -> ExternalRegistryStrategy {
        ExternalRegistryStrategy::new(
            ExternalRegistryConfig::new(base_url),
            Arc::new(BoundaryData::bundled().unwrap()),
        )
    }

    fn ctx() -> ResolveContext {
        ResolveContext::with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_high_score_is_high_confidence() {
        let url = serve(
            "200 OK",
            r#"{"operatorId":"1039940674000","score":0.93,"referenceId":"REF-1"}"#,
        )
        .await;
        let result = strategy(url)
            .attempt(&address("75001", "1234 Belt Line Rd"), &ctx())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.operator.id, "1039940674000");
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.alternates[0].id, "007929441");
        assert_eq!(
            result.metadata,
            StrategyMetadata::ExternalRegistry {
                reference_id: Some("REF-1".to_string()),
                registry_score: 0.93,
            }
        );
    }

    #[tokio::test]
    async fn test_record_date_is_carried_on_the_lookup() {
        let url = serve(
            "200 OK",
            r#"{"operatorId":"1039940674000","score":0.9,"updatedAt":"2026-10-02T12:00:00Z"}"#,
        )
        .await;
        let result = strategy(url)
            .attempt(&address("75001", "1234 Belt Line Rd"), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            result.data_as_of.map(|at| at.to_rfc3339()),
            Some("2026-10-02T12:00:00+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn test_low_score_is_medium_confidence() {
        let url = serve("200 OK", r#"{"operatorId":"957877905","score":0.5}"#).await;
        let result = strategy(url)
            .attempt(&address("77002", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_not_found_and_empty_answer_decline() {
        let url = serve("404 Not Found", "{}").await;
        assert!(strategy(url)
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .is_none());

        let url = serve("200 OK", r#"{"operatorId":null}"#).await;
        assert!(strategy(url)
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let url = serve("429 Too Many Requests", "{}").await;
        let err = strategy(url)
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, TerritoryError::RateLimited { .. }));

        let url = serve("500 Internal Server Error", "{}").await;
        let err = strategy(url)
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), "EXTERNAL_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_operator_is_an_error() {
        let url = serve("200 OK", r#"{"operatorId":"NOPE","score":1.0}"#).await;
        let err = strategy(url)
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, TerritoryError::ExternalServiceError { .. }));
    }

    #[tokio::test]
    async fn test_repeated_throttling_opens_circuit() {
        let url = serve("429 Too Many Requests", "{}").await;
        let guard = SourceGuard::with_parts(
            SOURCE_NAME,
            CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 2,
                ..CircuitBreakerConfig::default()
            }),
            RateLimiter::new(6_000),
        );
        let strategy = ExternalRegistryStrategy::with_guard(
            ExternalRegistryConfig::new(url),
            Arc::new(BoundaryData::bundled().unwrap()),
            guard,
        );

        for _ in 0..2 {
            strategy.attempt(&address("75001", "1 Main St"), &ctx()).await;
        }
        assert_eq!(strategy.circuit_state(), CircuitState::Open);

        let err = strategy
            .attempt(&address("75001", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, TerritoryError::CircuitOpen { .. }));
    }
}
