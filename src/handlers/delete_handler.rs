pub use crate::prelude::*;

/// DELETE: unlink a resolved upload-directory target (spec §4.F / §9).
/// `404` if it doesn't exist, `200` on success, `403` outside the upload
/// root or for a directory, `500` on any other I/O failure.
pub fn handle_delete(
    response: &mut HttpResponse,
    request: &HttpRequest,
    r_cfg: &RouteConfig,
    s_cfg: &Arc<ServerConfig>,
) {
    let upload_base = PathBuf::from(&r_cfg.root).join(&r_cfg.upload_dir);

    // e.g., /upload/test.txt -> test.txt
    let relative_path = request.url.strip_prefix(&r_cfg.path).unwrap_or("");
    let target_path = upload_base.join(relative_path.trim_start_matches('/'));

    // Canonicalize and reject path traversal (DELETE /upload/../../etc/passwd).
    let absolute_upload_base = match upload_base.canonicalize() {
        Ok(path) => path,
        Err(_) => return handle_error(response, HTTP_NOT_FOUND, Some(s_cfg)),
    };

    let absolute_target = match target_path.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            return match e.kind() {
                ErrorKind::NotFound => handle_error(response, HTTP_NOT_FOUND, Some(s_cfg)),
                _ => handle_error(response, HTTP_FORBIDDEN, Some(s_cfg)),
            };
        }
    };

    if !absolute_target.starts_with(&absolute_upload_base) {
        return handle_error(response, HTTP_FORBIDDEN, Some(s_cfg));
    }

    if absolute_target.is_dir() {
        return handle_error(response, HTTP_FORBIDDEN, Some(s_cfg));
    }

    match fs::remove_file(&absolute_target) {
        Ok(_) => {
            response.set_status_code(HTTP_OK);
            response.set_body(b"File deleted".to_vec(), "text/plain");
        }
        Err(e) => match e.kind() {
            ErrorKind::PermissionDenied => handle_error(response, HTTP_FORBIDDEN, Some(s_cfg)),
            _ => handle_error(response, HTTP_INTERNAL_SERVER_ERROR, Some(s_cfg)),
        },
    }
}
