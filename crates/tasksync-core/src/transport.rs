use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::command::Command;
use crate::model::SyncState;

pub const DEFAULT_ENDPOINT: &str = "https://api.todoist.com/sync/v8";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RESOURCE_TYPES_ALL: &str = "[\"all\"]";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(
        "Failed to sync, status code: {status}, commands: [{}]",
        describe_commands(.commands)
    )]
    Status { status: u16, commands: Vec<Command> },
    #[error("Sync request failed: {0}")]
    Network(String),
    #[error("Failed to encode commands: {0}")]
    Encode(serde_json::Error),
    #[error("Failed to decode response: {0}")]
    Decode(serde_json::Error),
    #[error("Request to {path} failed, status code: {status}")]
    RequestStatus { status: u16, path: String },
    #[error("Transport does not serve {0}")]
    Unsupported(String),
}

fn describe_commands(commands: &[Command]) -> String {
    commands
        .iter()
        .map(|command| format!("{} {}", command.kind(), command.uuid))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A read-only call next to the sync endpoint, such as `completed/get_all`.
/// The transport adds the token itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            params: Vec::new(),
        }
    }

    pub fn post(path: &str) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}

/// One request/response cycle with the sync service.
pub trait SyncTransport {
    fn exchange(&self, cursor: &str, commands: &[Command]) -> Result<SyncState, TransportError>;

    /// Raw JSON body of a read-only API call.
    fn fetch(&self, request: &ApiRequest) -> Result<String, TransportError> {
        Err(TransportError::Unsupported(request.path.clone()))
    }
}

/// Form-encoded POST against `<endpoint>/sync`, plus plain GET/POST calls to
/// the other `<endpoint>/...` paths.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    sync_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let base_url = endpoint.trim_end_matches('/').to_string();
        Self {
            agent,
            sync_url: format!("{base_url}/sync"),
            base_url,
            token: token.to_string(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }
}

impl SyncTransport for HttpTransport {
    fn exchange(&self, cursor: &str, commands: &[Command]) -> Result<SyncState, TransportError> {
        let encoded = encode_commands(commands)?;
        debug!(
            url = %self.sync_url,
            cursor,
            commands = commands.len(),
            "posting sync request"
        );
        let response = self.agent.post(&self.sync_url).send_form(&[
            ("token", self.token.as_str()),
            ("sync_token", cursor),
            ("day_orders_timestamp", ""),
            ("resource_types", RESOURCE_TYPES_ALL),
            ("commands", encoded.as_str()),
        ]);
        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(TransportError::Status {
                    status,
                    commands: commands.to_vec(),
                })
            }
            Err(err) => return Err(TransportError::Network(err.to_string())),
        };
        debug!(status = response.status(), "sync response received");
        serde_json::from_reader(response.into_reader()).map_err(TransportError::Decode)
    }

    fn fetch(&self, request: &ApiRequest) -> Result<String, TransportError> {
        let url = self.url_for(&request.path);
        let mut params: Vec<(&str, &str)> = vec![("token", self.token.as_str())];
        params.extend(
            request
                .params
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        debug!(url = %url, method = ?request.method, "sending api request");
        let response = match request.method {
            Method::Get => params
                .iter()
                .fold(self.agent.get(&url), |call, (key, value)| call.query(key, value))
                .call(),
            Method::Post => self.agent.post(&url).send_form(&params[..]),
        };
        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(TransportError::RequestStatus {
                    status,
                    path: request.path.clone(),
                })
            }
            Err(err) => return Err(TransportError::Network(err.to_string())),
        };
        response
            .into_string()
            .map_err(|err| TransportError::Network(err.to_string()))
    }
}

pub fn encode_commands(commands: &[Command]) -> Result<String, TransportError> {
    serde_json::to_string(commands).map_err(TransportError::Encode)
}

pub fn decode_sync_state(body: &str) -> Result<SyncState, TransportError> {
    serde_json::from_str(body).map_err(TransportError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandArgs, IdsArgs};
    use crate::id::Id;

    #[test]
    fn sync_url_joins_endpoint() {
        let transport = HttpTransport::new("https://example.test/sync/v8/", "t", DEFAULT_TIMEOUT);
        assert_eq!(transport.sync_url(), "https://example.test/sync/v8/sync");
    }

    #[test]
    fn api_paths_join_endpoint() {
        let transport = HttpTransport::new("https://example.test/sync/v8/", "t", DEFAULT_TIMEOUT);
        assert_eq!(
            transport.url_for("/completed/get_all"),
            "https://example.test/sync/v8/completed/get_all"
        );
    }

    #[test]
    fn api_request_builder_collects_params() {
        let request = ApiRequest::get("items/get").param("item_id", "42");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.params, vec![("item_id".to_string(), "42".to_string())]);
        assert_eq!(ApiRequest::post("completed/get_stats").method, Method::Post);
    }

    #[test]
    fn fetch_is_unsupported_unless_implemented() {
        struct SyncOnly;
        impl SyncTransport for SyncOnly {
            fn exchange(&self, _: &str, _: &[Command]) -> Result<SyncState, TransportError> {
                Ok(SyncState::default())
            }
        }
        let err = SyncOnly
            .fetch(&ApiRequest::post("completed/get_all"))
            .expect_err("unsupported");
        assert!(matches!(err, TransportError::Unsupported(path) if path == "completed/get_all"));
    }

    #[test]
    fn empty_batch_encodes_as_empty_array() {
        assert_eq!(encode_commands(&[]).expect("encode"), "[]");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode_sync_state("{\"items\": 3}").expect_err("bad body");
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn status_error_lists_attempted_commands() {
        let command = Command::new(CommandArgs::ItemDelete(IdsArgs {
            ids: vec![Id::new("1").expect("id")],
        }));
        let err = TransportError::Status {
            status: 503,
            commands: vec![command.clone()],
        };
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("item_delete"));
        assert!(message.contains(&command.uuid.to_string()));
    }
}
