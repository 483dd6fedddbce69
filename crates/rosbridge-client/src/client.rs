//! Entry point: handle factory and rosapi discovery.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rosbridge_core::{Compression, CorrelationId, Listener};
use rosbridge_settings::{RosapiSettings, RosbridgeSettings};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::connection::{Connection, ConnectionStateListener};
use crate::error::ClientError;
use crate::param::Param;
use crate::service::Service;
use crate::topic::Topic;
use crate::websocket;

/// A rosbridge session plus the settings its handles are built from.
#[derive(Clone, Debug)]
pub struct RosClient {
    conn: Connection,
    rosapi: Arc<RosapiSettings>,
    default_compression: Compression,
    socket_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RosClient {
    /// Wrap an existing connection.
    pub fn new(conn: Connection, settings: &RosbridgeSettings) -> Self {
        Self {
            conn,
            rosapi: Arc::new(settings.rosapi.clone()),
            default_compression: settings.topic.default_compression,
            socket_task: Arc::default(),
        }
    }

    /// Open a WebSocket to `settings.connection.url`.
    pub async fn connect(
        settings: &RosbridgeSettings,
        listener: Arc<dyn ConnectionStateListener>,
    ) -> Result<Self, ClientError> {
        let (conn, task) = websocket::connect(&settings.connection, listener).await?;
        let client = Self::new(conn, settings);
        *client.socket_task.lock() = Some(task);
        Ok(client)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection and wait for the socket task to finish, so
    /// every frame queued before the call reaches the server. Handles
    /// become unusable.
    pub async fn disconnect(&self) {
        self.conn.close();
        let task = self.socket_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "socket task failed");
            }
        }
    }

    /// Topic handle using the configured default compression.
    pub fn topic(&self, name: impl Into<String>, message_type: Option<String>) -> Topic {
        let mut topic = Topic::new(self.conn.clone(), name, message_type);
        topic.set_compression(self.default_compression);
        topic
    }

    /// Service handle.
    pub fn service(&self, name: impl Into<String>, service_type: Option<String>) -> Service {
        Service::new(self.conn.clone(), name, service_type)
    }

    /// Parameter handle.
    pub fn param(&self, name: impl Into<String>) -> Param {
        Param::new(self.conn.clone(), name, Arc::clone(&self.rosapi))
    }

    /// List topics known to the server.
    pub fn get_topics<F>(&self, callback: F) -> Result<CorrelationId, ClientError>
    where
        F: Fn(Vec<Topic>) + Send + Sync + 'static,
    {
        let client = self.clone();
        let field = self.rosapi.topics_field.clone();
        self.discover(&self.rosapi.topics_service, move |values| {
            let topics = string_list(values, &field)
                .into_iter()
                .map(|name| client.topic(name, None))
                .collect();
            callback(topics);
        })
    }

    /// List services known to the server.
    pub fn get_services<F>(&self, callback: F) -> Result<CorrelationId, ClientError>
    where
        F: Fn(Vec<Service>) + Send + Sync + 'static,
    {
        let client = self.clone();
        let field = self.rosapi.services_field.clone();
        self.discover(&self.rosapi.services_service, move |values| {
            let services = string_list(values, &field)
                .into_iter()
                .map(|name| client.service(name, None))
                .collect();
            callback(services);
        })
    }

    /// List parameter names known to the server.
    pub fn get_params<F>(&self, callback: F) -> Result<CorrelationId, ClientError>
    where
        F: Fn(Vec<Param>) + Send + Sync + 'static,
    {
        let client = self.clone();
        let field = self.rosapi.param_names_field.clone();
        self.discover(&self.rosapi.param_names_service, move |values| {
            let params = string_list(values, &field)
                .into_iter()
                .map(|name| client.param(name))
                .collect();
            callback(params);
        })
    }

    /// Await the topic list.
    pub async fn list_topics(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        self.list(&self.rosapi.topics_service, &self.rosapi.topics_field, timeout)
            .await
    }

    /// Await the service list.
    pub async fn list_services(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        self.list(&self.rosapi.services_service, &self.rosapi.services_field, timeout)
            .await
    }

    /// Await the parameter name list.
    pub async fn list_params(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        self.list(
            &self.rosapi.param_names_service,
            &self.rosapi.param_names_field,
            timeout,
        )
        .await
    }

    fn discover<F>(&self, service: &str, on_values: F) -> Result<CorrelationId, ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.service(service, None)
            .call_service(Map::new(), Some(Listener::new(on_values)))
    }

    async fn list(
        &self,
        service: &str,
        field: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, ClientError> {
        let values = self.service(service, None).call(Map::new(), timeout).await?;
        Ok(string_list(&values, field))
    }
}

/// Strings in `values[field]`. A missing or mistyped field yields an empty list.
fn string_list(values: &Value, field: &str) -> Vec<String> {
    let Some(items) = values.get(field).and_then(Value::as_array) else {
        warn!(field, "discovery response lacks a string array");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{inbound, open_connection};

    use serde_json::json;

    fn client() -> (RosClient, Arc<crate::test_support::RecordingTransport>) {
        let (conn, transport) = open_connection();
        (RosClient::new(conn, &RosbridgeSettings::default()), transport)
    }

    fn respond(client: &RosClient, id: &CorrelationId, values: Value) {
        inbound(
            client.connection(),
            &json!({"op": "service_response", "id": id.as_str(), "values": values}),
        );
    }

    #[test]
    fn get_topics_builds_handles() {
        let (client, transport) = client();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);

        let id = client
            .get_topics(move |topics| {
                sink.lock()
                    .extend(topics.iter().map(|t| t.name().to_owned()));
            })
            .unwrap();
        assert_eq!(transport.last()["service"], "/rosapi/topics");
        assert_eq!(transport.last()["args"], json!({}));

        respond(&client, &id, json!({"topics": ["/a", "/b", 3]}));
        assert_eq!(*names.lock(), vec!["/a", "/b"]);
    }

    #[test]
    fn get_services_reads_configured_field() {
        let (conn, _transport) = open_connection();
        let mut settings = RosbridgeSettings::default();
        settings.rosapi.services_field = "topics".into();
        let client = RosClient::new(conn, &settings);
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);

        let id = client
            .get_services(move |services| {
                sink.lock()
                    .extend(services.iter().map(|s| s.name().to_owned()));
            })
            .unwrap();
        respond(&client, &id, json!({"topics": ["/add_two_ints"]}));

        assert_eq!(*names.lock(), vec!["/add_two_ints"]);
    }

    #[test]
    fn get_params_with_missing_field_is_empty() {
        let (client, transport) = client();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);

        let id = client
            .get_params(move |params| sink.lock().push(params.len()))
            .unwrap();
        assert_eq!(transport.last()["service"], "/rosapi/get_param_names");
        respond(&client, &id, json!({}));

        assert_eq!(*calls.lock(), vec![0]);
    }

    #[test]
    fn topic_factory_applies_default_compression() {
        let (conn, _transport) = open_connection();
        let mut settings = RosbridgeSettings::default();
        settings.topic.default_compression = Compression::Png;
        let client = RosClient::new(conn, &settings);

        let topic = client.topic("/camera", Some("sensor_msgs/Image".into()));
        assert_eq!(topic.compression(), Compression::Png);
        assert_eq!(topic.message_type(), Some("sensor_msgs/Image"));
    }

    #[tokio::test]
    async fn disconnect_closes_connection() {
        let (client, transport) = client();
        client.disconnect().await;
        assert!(transport.is_closed());
        assert!(!client.connection().is_open());
    }

    #[test]
    fn string_list_skips_non_strings() {
        let values = json!({"names": ["/x", null, "/y"]});
        assert_eq!(string_list(&values, "names"), vec!["/x", "/y"]);
        assert!(string_list(&json!({"names": "oops"}), "names").is_empty());
    }
}
