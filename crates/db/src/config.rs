/// Default CouchDB server URL.
const DEFAULT_COUCHDB_URL: &str = "http://localhost:5984";

/// Default per-request timeout for store calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Document store connection settings loaded from environment variables.
///
/// All fields have defaults suitable for a local CouchDB. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the CouchDB server, without a trailing slash.
    pub url: String,
    /// Optional basic-auth user name.
    pub username: Option<String>,
    /// Optional basic-auth password.
    pub password: Option<String>,
    /// Timeout applied to every HTTP request in seconds.
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `COUCHDB_URL`                | `http://localhost:5984`  |
    /// | `COUCHDB_USER`               | (unset)                  |
    /// | `COUCHDB_PASSWORD`           | (unset)                  |
    /// | `STORE_REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Self {
        let url = std::env::var("COUCHDB_URL")
            .unwrap_or_else(|_| DEFAULT_COUCHDB_URL.into())
            .trim_end_matches('/')
            .to_string();

        let request_timeout_secs = std::env::var("STORE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            url,
            username: std::env::var("COUCHDB_USER").ok().filter(|s| !s.is_empty()),
            password: std::env::var("COUCHDB_PASSWORD").ok(),
            request_timeout_secs,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_COUCHDB_URL.into(),
            username: None,
            password: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
