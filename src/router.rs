//! Maps a request URL onto a `Location` inside its resolved `ServerConfig`
//! (spec §4.E). Stateless: every function here is a pure transform over a
//! `&ServerConfig`/`&str`, the routing table itself living on `ServerConfig`
//! (`find_route` / `route_request`, spec §3).

use crate::prelude::*;

#[derive(Debug, PartialEq, Eq)]
pub enum RoutingError {
    NotFound,
    MethodNotAllowed,
    BadRequest,
}

/// Outcome of routing a normalized path, before any handler runs.
#[derive(Debug)]
pub enum RouteOutcome<'a> {
    Redirect { status: u16, target: &'a str },
    Cgi(&'a RouteConfig),
    Dispatch(&'a RouteConfig),
}

/// Lowercase the path and, absent a file extension, append a trailing slash
/// -- spec §4.E step 2's normalization ahead of the longest-prefix match.
pub fn normalize_path(raw: &str) -> String {
    let path_only = raw.split(['?', '#']).next().unwrap_or(raw);
    let lower = path_only.to_ascii_lowercase();
    let has_extension = lower
        .rsplit('/')
        .next()
        .map(|last_segment| last_segment.contains('.'))
        .unwrap_or(false);

    if has_extension || lower.ends_with('/') {
        lower
    } else {
        format!("{lower}/")
    }
}

/// Reject `..` segments and embedded NULs -- spec §4.E step 2.
pub fn is_path_traversal(raw: &str) -> bool {
    raw.contains('\0') || raw.split('/').any(|segment| segment == "..")
}

/// Route a request path against one server's location table (spec §4.E
/// steps 3-6). The caller is expected to have already checked `request.state
/// != BAD` (step 1); that check lives in the connection/request layer since
/// it inspects the request, not the config.
pub fn route<'a>(
    s_cfg: &'a ServerConfig,
    raw_path: &str,
    method: &Method,
) -> Result<RouteOutcome<'a>, RoutingError> {
    if is_path_traversal(raw_path) {
        return Err(RoutingError::BadRequest);
    }
    let normalized = normalize_path(raw_path);
    let route = s_cfg.find_route(&normalized).ok_or(RoutingError::NotFound)?;

    if let Some((status, target)) = &route.redirect {
        return Ok(RouteOutcome::Redirect {
            status: *status,
            target,
        });
    }

    if is_cgi_target(&normalized, route) {
        return Ok(RouteOutcome::Cgi(route));
    }

    if !route.allows(method.clone()) {
        return Err(RoutingError::MethodNotAllowed);
    }

    Ok(RouteOutcome::Dispatch(route))
}

/// A path dispatches to CGI when its extension is in the location's CGI set
/// (spec §4.E step 5). Here we only check the extension; the
/// executable-bit/regular-file check happens once the filesystem path is
/// resolved in `http::request`, since that requires joining `route.root`
/// with the relative path.
fn is_cgi_target(path: &str, route: &RouteConfig) -> bool {
    if route.cgi_ext.is_empty() {
        return false;
    }
    match path.rsplit_once('.') {
        Some((_, ext)) => route.is_cgi_extension(ext.trim_end_matches('/')),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::RouteConfig;

    fn server_with_routes(paths: &[&str]) -> ServerConfig {
        let mut s = ServerConfig::default();
        s.routes = paths
            .iter()
            .map(|p| RouteConfig {
                path: p.to_string(),
                ..Default::default()
            })
            .collect();
        s
    }

    #[test]
    fn longest_prefix_wins() {
        let s = server_with_routes(&["/", "/static/", "/static/img/"]);
        let route = s.find_route("/static/img/x.png").unwrap();
        assert_eq!(route.path, "/static/img/");
    }

    #[test]
    fn rejects_dotdot_segments() {
        assert!(is_path_traversal("/a/../b"));
        assert!(is_path_traversal("/a/b\0c"));
        assert!(!is_path_traversal("/a/b..c"));
    }

    #[test]
    fn traversal_is_a_bad_request_not_a_404() {
        let s = server_with_routes(&["/"]);
        let err = route(&s, "/../etc/passwd", &Method::GET).unwrap_err();
        assert_eq!(err, RoutingError::BadRequest);
    }

    #[test]
    fn normalize_appends_slash_without_extension() {
        assert_eq!(normalize_path("/Blog"), "/blog/");
        assert_eq!(normalize_path("/Blog/Post.HTML"), "/blog/post.html");
        assert_eq!(normalize_path("/api?x=1"), "/api/");
    }

    #[test]
    fn route_not_found_yields_routing_error() {
        let s = server_with_routes(&["/only/"]);
        let err = route(&s, "/missing", &Method::GET).unwrap_err();
        assert_eq!(err, RoutingError::NotFound);
    }

    #[test]
    fn method_not_allowed_when_whitelist_excludes_it() {
        let mut s = ServerConfig::default();
        s.routes.push(RouteConfig {
            path: "/".to_string(),
            methods: vec![Method::GET],
            ..Default::default()
        });
        let err = route(&s, "/x.html", &Method::DELETE).unwrap_err();
        assert_eq!(err, RoutingError::MethodNotAllowed);
    }
}
