// http.rs — DataClient: the two API calls over reqwest.

use async_trait::async_trait;
use coach_sync::{DataView, PushBody, PushResponse};
use reqwest::StatusCode;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Sends a full snapshot to the server.
#[async_trait]
pub trait SnapshotPusher: Send + Sync {
    async fn push(&self, body: PushBody) -> Result<(), ClientError>;
}

/// Loads the caller's data view from the server.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<DataView, ClientError>;
}

/// Map a non-success status to the client error taxonomy.
pub fn classify_status(status: StatusCode) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::AuthenticationRequired {
            status: status.as_u16(),
        },
        other => ClientError::Connectivity(format!("server answered HTTP {}", other)),
    }
}

pub struct DataClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl DataClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET {base}/data`.
    pub async fn fetch(&self) -> Result<DataView, ClientError> {
        let mut request = self.http.get(self.config.data_url());
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Connectivity(format!("unreadable data view: {}", e)))
    }

    /// `POST {base}/data` with whichever collections `body` carries.
    pub async fn push_snapshot(&self, body: &PushBody) -> Result<PushResponse, ClientError> {
        let mut request = self.http.post(self.config.data_url()).json(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Connectivity(format!("unreadable push response: {}", e)))
    }
}

#[async_trait]
impl SnapshotFetcher for DataClient {
    async fn fetch(&self) -> Result<DataView, ClientError> {
        DataClient::fetch(self).await
    }
}

#[async_trait]
impl SnapshotPusher for DataClient {
    async fn push(&self, body: PushBody) -> Result<(), ClientError> {
        let response = self.push_snapshot(&body).await?;
        tracing::debug!(status = %response.status, "snapshot pushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_are_not_connectivity_faults() {
        assert!(classify_status(StatusCode::UNAUTHORIZED).is_auth());
        assert!(classify_status(StatusCode::FORBIDDEN).is_auth());
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            ClientError::Connectivity(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            ClientError::Connectivity(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connectivity_fault() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = DataClient::new(ClientConfig::new("http://127.0.0.1:9/coach/v1", "t")).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, ClientError::Connectivity(_)));
    }
}
