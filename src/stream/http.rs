//! HTTP transport for the streaming service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::StreamConfig;
use crate::schema::StreamPayload;
use crate::stream::{SinkError, StreamSink};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest {
    schema_id: String,
    data_id: String,
    data: String,
}

/// `StreamSink` backed by the service's REST API.
#[derive(Debug, Clone)]
pub struct HttpStreamSink {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<String>,
}

impl HttpStreamSink {
    pub fn new(config: &StreamConfig) -> Result<Self, SinkError> {
        let endpoint = url::Url::parse(&config.endpoint).map_err(|e| {
            SinkError::Rejected(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    fn records_url(&self, payload: &StreamPayload) -> String {
        format!(
            "{}/streams/{}/records",
            self.endpoint.as_str().trim_end_matches('/'),
            payload.schema_id
        )
    }
}

/// Map an HTTP status to the sink's retry classification.
fn classify(status: StatusCode) -> Result<(), SinkError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(SinkError::Transient(format!("status {}", status)))
    } else {
        Err(SinkError::Rejected(format!("status {}", status)))
    }
}

#[async_trait]
impl StreamSink for HttpStreamSink {
    async fn append(&self, payload: &StreamPayload) -> Result<(), SinkError> {
        let body = AppendRequest {
            schema_id: payload.schema_id.to_string(),
            data_id: payload.data_id.to_string(),
            data: payload.data.to_string(),
        };

        let mut request = self.client.post(self.records_url(payload)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Transient(e.to_string()))?;
        classify(response.status())
    }
}
