//! Segment HTTP tracking API client.
//!
//! Calls go to `POST {endpoint}/v1/identify` and `POST {endpoint}/v1/track`,
//! authenticated with the write key as the basic-auth user name.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use segbridge_events::IdentityRecord;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::mapping::MappedData;

use super::{AnalyticsSink, SinkError};

const LIBRARY_NAME: &str = "segbridge";

/// Connection settings for [`SegmentClient`].
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// API base URL (example: https://api.segment.io).
    pub endpoint: String,

    /// Source write key.
    pub write_key: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct LibraryInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct CallContext {
    library: LibraryInfo,
}

impl CallContext {
    fn current() -> Self {
        Self {
            library: LibraryInfo {
                name: LIBRARY_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyRequest<'a> {
    user_id: &'a str,
    traits: &'a MappedData,
    message_id: String,
    timestamp: String,
    context: CallContext,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackRequest<'a> {
    user_id: &'a str,
    event: &'a str,
    properties: &'a MappedData,
    message_id: String,
    timestamp: String,
    context: CallContext,
}

fn message_id() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Segment API client.
pub struct SegmentClient {
    client: reqwest::Client,
    base_url: String,
    write_key: String,
}

impl SegmentClient {
    /// Create a new Segment client.
    pub fn new(config: SegmentConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            write_key: config.write_key,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, call: &str, body: &T) -> Result<(), SinkError> {
        let url = format!("{}/v1/{}", self.base_url, call);
        debug!(url = %url, "Sending analytics call");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.write_key, Some(""))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, call = call, "Analytics call rejected");
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for SegmentClient {
    async fn identify(
        &self,
        principal: &IdentityRecord,
        traits: &MappedData,
    ) -> Result<(), SinkError> {
        let request = IdentifyRequest {
            user_id: &principal.name,
            traits,
            message_id: message_id(),
            timestamp: timestamp(),
            context: CallContext::current(),
        };
        self.post("identify", &request).await
    }

    async fn track(
        &self,
        principal: &IdentityRecord,
        event: &str,
        properties: &MappedData,
    ) -> Result<(), SinkError> {
        let request = TrackRequest {
            user_id: &principal.name,
            event,
            properties,
            message_id: message_id(),
            timestamp: timestamp(),
            context: CallContext::current(),
        };
        self.post("track", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_track_request_shape() {
        let mut properties = MappedData::new();
        properties.insert("title".into(), json!("Report"));
        let request = TrackRequest {
            user_id: "jdoe",
            event: "documentCreated",
            properties: &properties,
            message_id: message_id(),
            timestamp: timestamp(),
            context: CallContext::current(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "jdoe");
        assert_eq!(value["event"], "documentCreated");
        assert_eq!(value["properties"]["title"], "Report");
        assert_eq!(value["context"]["library"]["name"], "segbridge");
        assert!(Uuid::parse_str(value["messageId"].as_str().unwrap()).is_ok());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SegmentClient::new(SegmentConfig {
            endpoint: "http://localhost:9000/".into(),
            write_key: "key".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
