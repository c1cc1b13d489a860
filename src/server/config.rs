use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    pub frontend_dir_path: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            frontend_dir_path: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}
