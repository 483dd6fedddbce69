//! Parameter access through the rosapi get/set services.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rosbridge_core::{CorrelationId, Listener};
use rosbridge_settings::RosapiSettings;
use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::ClientError;
use crate::service::Service;

/// Handle to one named parameter. Holds no cached value.
#[derive(Clone, Debug)]
pub struct Param {
    conn: Connection,
    name: String,
    rosapi: Arc<RosapiSettings>,
}

impl Param {
    /// Create a handle using the given rosapi service names.
    pub fn new(conn: Connection, name: impl Into<String>, rosapi: Arc<RosapiSettings>) -> Self {
        Self {
            conn,
            name: name.into(),
            rosapi,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn get_service(&self) -> Service {
        Service::new(self.conn.clone(), self.rosapi.get_param_service.clone(), None)
    }

    fn name_args(&self) -> Map<String, Value> {
        let mut args = Map::new();
        let _ = args.insert("name".to_owned(), Value::String(self.name.clone()));
        args
    }

    /// Request the current value. `callback` receives the response's
    /// `value` field, or null if the server left it out.
    pub fn get<F>(&self, callback: F) -> Result<CorrelationId, ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let listener = Listener::new(move |values| {
            callback(values.get("value").unwrap_or(&Value::Null));
        });
        self.get_service().call_service(self.name_args(), Some(listener))
    }

    /// Set the value. No response is awaited.
    pub fn set(&self, value: Value) -> Result<CorrelationId, ClientError> {
        let mut args = self.name_args();
        let _ = args.insert("value".to_owned(), value);
        Service::new(self.conn.clone(), self.rosapi.set_param_service.clone(), None)
            .call_service(args, None)
    }

    /// Await the current value.
    pub async fn fetch(&self, timeout: Duration) -> Result<Value, ClientError> {
        let mut values = self.get_service().call(self.name_args(), timeout).await?;
        Ok(values
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
