use serde::{Deserialize, Serialize};

/// Names of the rosapi services used for discovery and parameters, and of
/// the response fields the discovery lists are read from.
///
/// Server versions disagree on the list-services field: some answer with
/// `services`, older ones reuse `topics`. Point `services_field` at
/// whichever the target server sends.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RosapiSettings {
    /// Service listing topic names.
    pub topics_service: String,
    /// Service listing service names.
    pub services_service: String,
    /// Service listing parameter names.
    pub param_names_service: String,
    /// Service reading one parameter.
    pub get_param_service: String,
    /// Service writing one parameter.
    pub set_param_service: String,
    /// Array field in the topics response.
    pub topics_field: String,
    /// Array field in the services response.
    pub services_field: String,
    /// Array field in the parameter-names response.
    pub param_names_field: String,
}

impl Default for RosapiSettings {
    fn default() -> Self {
        Self {
            topics_service: "/rosapi/topics".to_string(),
            services_service: "/rosapi/services".to_string(),
            param_names_service: "/rosapi/get_param_names".to_string(),
            get_param_service: "/rosapi/get_param".to_string(),
            set_param_service: "/rosapi/set_param".to_string(),
            topics_field: "topics".to_string(),
            services_field: "services".to_string(),
            param_names_field: "names".to_string(),
        }
    }
}
