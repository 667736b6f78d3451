use std::collections::HashMap;

use crate::http::Method;
use crate::router::RoutingError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SERVER_NAME: &str = "_";
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_048_576; // 1MB
pub const DEFAULT_ROUTE_PATH: &str = "/";
pub const DEFAULT_ROOT: &str = "./www";
pub const DEFAULT_FILE: &str = "index.html";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RESPONSE_HANDLING_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RESPONSE_DELIVERY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5_000;

/// A URL-prefix-scoped configuration block: filesystem root, handlers, policy.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub path: String,
    pub methods: Vec<Method>,
    pub root: String,
    pub default_file: String,
    pub upload_dir: String,
    pub autoindex: bool,
    pub cgi_ext: Vec<String>,
    pub cgi_path: String,
    /// (status code, target url), empty target means "no redirect"
    pub redirect: Option<(u16, String)>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ROUTE_PATH.to_string(),
            methods: vec![Method::GET],
            root: DEFAULT_ROOT.to_string(),
            default_file: DEFAULT_FILE.to_string(),
            upload_dir: String::new(),
            autoindex: false,
            cgi_ext: Vec::new(),
            cgi_path: "/usr/bin/python3".to_string(),
            redirect: None,
        }
    }
}

impl RouteConfig {
    /// Longest-prefix match weight: length of `path` if it prefixes `request_path`.
    pub fn matches(&self, request_path: &str) -> bool {
        request_path.starts_with(self.path.as_str())
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    pub fn is_cgi_extension(&self, ext: &str) -> bool {
        self.cgi_ext.iter().any(|e| e.trim_start_matches('.') == ext.trim_start_matches('.'))
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub ports: Vec<u16>,
    pub server_name: String,
    pub default_server: bool,
    pub error_pages: HashMap<u16, String>,
    pub client_max_body_size: usize,
    pub routes: Vec<RouteConfig>,

    pub ms_request_timeout: u64,
    pub ms_response_handling_timeout: u64,
    pub ms_response_delivery_timeout: u64,
    pub ms_idle_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            ports: vec![DEFAULT_PORT],
            server_name: DEFAULT_SERVER_NAME.to_string(),
            default_server: false,
            error_pages: HashMap::new(),
            client_max_body_size: DEFAULT_MAX_BODY_SIZE,
            routes: Vec::new(),
            ms_request_timeout: DEFAULT_REQUEST_TIMEOUT_MS,
            ms_response_handling_timeout: DEFAULT_RESPONSE_HANDLING_TIMEOUT_MS,
            ms_response_delivery_timeout: DEFAULT_RESPONSE_DELIVERY_TIMEOUT_MS,
            ms_idle_timeout: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Longest string-prefix match over this server's locations (spec §4.E step 3).
    pub fn find_route(&self, path: &str) -> Option<&RouteConfig> {
        self.routes
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.path.len())
    }

    /// Resolve a request to the best-matching location and enforce its
    /// method whitelist (spec §4.E steps 3+6).
    pub fn route_request(
        &self,
        path: &str,
        method: &Method,
    ) -> Result<&RouteConfig, RoutingError> {
        let route = self.find_route(path).ok_or(RoutingError::NotFound)?;
        if !route.allows(method.clone()) {
            return Err(RoutingError::MethodNotAllowed);
        }
        Ok(route)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub servers: Vec<ServerConfig>,
}
