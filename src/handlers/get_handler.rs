pub use crate::prelude::*;

/// GET: serve an index/listing for a directory or stream a regular file
/// (spec §4.F). Returns the `ActiveAction` the connection should adopt for
/// payload delivery -- `None` if `response` is already complete.
pub fn handle_get(
    request: &HttpRequest,
    response: &mut HttpResponse,
    r_cfg: &RouteConfig,
    s_cfg: &Arc<ServerConfig>,
) -> ActiveAction {
    let root = &r_cfg.root;
    let relative_path = request
        .url
        .strip_prefix(&r_cfg.path)
        .unwrap_or(&request.url);
    let mut path = PathBuf::from(root);
    path.push(relative_path.trim_start_matches('/'));

    if path.is_dir() {
        if !r_cfg.default_file.is_empty() && path.join(&r_cfg.default_file).is_file() {
            path.push(&r_cfg.default_file);
        } else if r_cfg.autoindex {
            generate_autoindex(response, &path, &request.url);
            return ActiveAction::None;
        } else {
            response.set_status_code(HTTP_FORBIDDEN);
            response.set_body(
                b"403 Forbidden: Directory listing denied".to_vec(),
                "text/plain",
            );
            return ActiveAction::None;
        }
    }

    match Payload::on_disk_file(path.clone()) {
        Ok(payload) => {
            let mime_type = get_mime_type(path.extension().and_then(|s| s.to_str()));

            response.set_status_code(HTTP_OK);
            response.set_header("content-length", &payload.total_size().to_string());
            response.set_header("content-type", mime_type);
            response.set_header("cache-control", "no-store");

            ActiveAction::FileDownload(payload)
        }
        Err(e) => {
            match e.kind() {
                std::io::ErrorKind::NotFound => handle_error(response, HTTP_NOT_FOUND, Some(s_cfg)),
                std::io::ErrorKind::PermissionDenied => {
                    handle_error(response, HTTP_FORBIDDEN, Some(s_cfg))
                }
                _ => handle_error(response, HTTP_INTERNAL_SERVER_ERROR, Some(s_cfg)),
            };
            ActiveAction::None
        }
    }
}
