use std::thread;
use std::time::Duration;

use prosopon_recon::config::GatewayConfig;
use prosopon_recon::gateway::{Gateway, GatewayError, LookupReply};
use prosopon_recon::model::IdScheme;

use crate::query;

/// Blocking SPARQL client for the public knowledge graph.
///
/// Built from a [`GatewayConfig`] and passed into the engine as an
/// explicit handle. Owns the retry policy: transient failures are
/// retried with exponential backoff up to `max_retries` attempts, then
/// surfaced as [`GatewayError::Exhausted`] for that batch.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    max_retries: u32,
    backoff_initial: Duration,
}

impl GraphClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(config.agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries.max(1),
            backoff_initial: Duration::from_secs(config.backoff_initial_secs),
        })
    }

    fn execute(&self, sparql: &str) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("query", sparql), ("format", "json")])
            .header("Accept", "application/sparql-results+json")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(e.to_string())
                } else {
                    GatewayError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Http(status, body));
        }

        response.json().map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

/// Failures worth another attempt: network faults, timeouts, rate
/// limiting and server-side errors. A parse error or a client-side HTTP
/// rejection will not improve on retry.
fn retryable(err: &GatewayError) -> bool {
    match err {
        GatewayError::Network(_) | GatewayError::Timeout(_) => true,
        GatewayError::Http(status, _) => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Delay before the next attempt after `attempt` failures: the initial
/// backoff, doubled per failure.
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

impl Gateway for GraphClient {
    fn lookup(
        &self,
        scheme: IdScheme,
        batch: &[String],
        langs: &[String],
    ) -> Result<LookupReply, GatewayError> {
        let sparql = query::build_query(scheme, batch, langs)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.execute(&sparql) {
                Ok(json) => return query::parse_reply(scheme, langs, &json),
                Err(err) => {
                    if !retryable(&err) {
                        return Err(err);
                    }
                    if attempts >= self.max_retries {
                        return Err(GatewayError::Exhausted {
                            attempts,
                            last: err.to_string(),
                        });
                    }
                    thread::sleep(backoff_delay(self.backoff_initial, attempts));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        let client = GraphClient::new(&GatewayConfig::default()).unwrap();
        assert_eq!(client.endpoint, "https://query.wikidata.org/sparql");
        assert_eq!(client.max_retries, 5);
    }

    #[test]
    fn backoff_doubles_per_failed_attempt() {
        let initial = Duration::from_secs(5);
        let delays: Vec<u64> = (1..=4)
            .map(|attempt| backoff_delay(initial, attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![5, 10, 20, 40]);
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(retryable(&GatewayError::Network("reset".into())));
        assert!(retryable(&GatewayError::Timeout("60s".into())));
        assert!(retryable(&GatewayError::Http(429, "slow down".into())));
        assert!(retryable(&GatewayError::Http(503, "overloaded".into())));
    }

    #[test]
    fn persistent_failures_fail_immediately() {
        assert!(!retryable(&GatewayError::Http(400, "bad query".into())));
        assert!(!retryable(&GatewayError::Parse("not json".into())));
    }
}
