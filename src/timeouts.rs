//! Four independent timers per connection (spec §4.D / §5), ported from
//! `examples/original_source/src/http/Connection.cpp`'s `isTimedOut()`. Pure
//! function of timestamps + thresholds so it's testable with a fake "now"
//! (property 7) without needing a real sleep.

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Request,
    ResponseHandling,
    ResponseDelivery,
    Idle,
}

/// Evaluate the four timers against `now`. Returns the first timer found to
/// have exceeded its threshold, or `None` if the connection is healthy.
///
/// - `last_received`: set whenever any bytes arrive; the idle timer only
///   applies once this is `Some` (spec: "Idle timer applies whenever the
///   connection has received any bytes").
/// - `request_handle_start`: set while a request is being read/parsed.
/// - `response_handle_start`: set while a response is PENDING (handler or
///   CGI work in flight), cleared once it reaches READY.
/// - `response_delivery_start`: set on the first write attempt of a READY
///   response, cleared once fully sent.
pub fn is_timed_out(
    now: Instant,
    last_received: Option<Instant>,
    request_handle_start: Option<Instant>,
    response_handle_start: Option<Instant>,
    response_delivery_start: Option<Instant>,
    cfg: &ServerConfig,
) -> Option<TimeoutKind> {
    if let Some(start) = request_handle_start {
        if now.duration_since(start) >= Duration::from_millis(cfg.ms_request_timeout) {
            return Some(TimeoutKind::Request);
        }
    }
    if let Some(start) = response_handle_start {
        if now.duration_since(start) >= Duration::from_millis(cfg.ms_response_handling_timeout) {
            return Some(TimeoutKind::ResponseHandling);
        }
    }
    if let Some(start) = response_delivery_start {
        if now.duration_since(start) >= Duration::from_millis(cfg.ms_response_delivery_timeout) {
            return Some(TimeoutKind::ResponseDelivery);
        }
    }
    if let Some(last) = last_received {
        if now.duration_since(last) >= Duration::from_millis(cfg.ms_idle_timeout) {
            return Some(TimeoutKind::Idle);
        }
    }
    None
}

/// Sweep every connection for the four timers and every in-flight CGI worker
/// for its own cancellation deadline (spec §4.I step 3c, §5). Timed-out
/// connections are closed outright; if a response can still be sent a `408`
/// is queued first (spec §7 "Time exceeded").
pub fn sweep(server: &mut Server, poll: &Poll) {
    let now = Instant::now();

    let timed_out: Vec<Token> = server
        .connections
        .iter()
        .filter_map(|(token, conn)| {
            let cfg = conn.s_cfg.as_ref()?;
            is_timed_out(
                now,
                conn.last_received,
                conn.request_handle_start,
                conn.response_handle_start,
                conn.response_delivery_start,
                cfg,
            )
            .map(|_| *token)
        })
        .collect();

    for token in timed_out {
        if let Some(conn) = server.connections.get_mut(&token) {
            if matches!(conn.action, ActiveAction::Cgi { .. }) {
                force_cgi_timeout(conn, &mut server.cgi_to_client);
            }
            // Only still inject a 408 if nothing has started going out yet --
            // once response delivery has begun, headers may already be on
            // the wire and we simply close instead (spec §7).
            let can_still_respond =
                conn.write_buffer.is_empty() && conn.response_delivery_start.is_none();
            if can_still_respond {
                let mut res = HttpResponse::new(HTTP_REQUEST_TIMEOUT, "Request Timeout");
                handle_error(&mut res, HTTP_REQUEST_TIMEOUT, conn.s_cfg.as_ref());
                conn.write_buffer.extend_from_slice(&res.to_bytes());
                let _ = poll.registry().reregister(
                    &mut conn.stream,
                    token,
                    Interest::READABLE | Interest::WRITABLE,
                );
            }
            conn.timed_out = true;
        }
    }

    server.connections.retain(|token, conn| {
        if let ActiveAction::Cgi { start_time, .. } = &conn.action {
            if start_time.elapsed().as_secs() > TIMEOUT_CGI {
                force_cgi_timeout(conn, &mut server.cgi_to_client);
                let _ = poll
                    .registry()
                    .reregister(&mut conn.stream, *token, Interest::WRITABLE);
            }
        }

        if conn.timed_out && conn.write_buffer.is_empty() {
            let _ = poll.registry().deregister(&mut conn.stream);
            return false;
        }
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ServerConfig {
        let mut c = ServerConfig::default();
        c.ms_request_timeout = 100;
        c.ms_response_handling_timeout = 100;
        c.ms_response_delivery_timeout = 100;
        c.ms_idle_timeout = 100;
        c
    }

    #[test]
    fn healthy_connection_is_not_timed_out() {
        let now = Instant::now();
        let recent = now - Duration::from_millis(10);
        assert_eq!(
            is_timed_out(now, Some(recent), None, None, None, &cfg()),
            None
        );
    }

    #[test]
    fn idle_timer_only_applies_once_bytes_received() {
        let now = Instant::now();
        assert_eq!(is_timed_out(now, None, None, None, None, &cfg()), None);
    }

    #[test]
    fn each_timer_independently_trips() {
        let c = cfg();
        let now = Instant::now();
        let stale = now - Duration::from_millis(200);

        assert_eq!(
            is_timed_out(now, None, Some(stale), None, None, &c),
            Some(TimeoutKind::Request)
        );
        assert_eq!(
            is_timed_out(now, None, None, Some(stale), None, &c),
            Some(TimeoutKind::ResponseHandling)
        );
        assert_eq!(
            is_timed_out(now, None, None, None, Some(stale), &c),
            Some(TimeoutKind::ResponseDelivery)
        );
        assert_eq!(
            is_timed_out(now, Some(stale), None, None, None, &c),
            Some(TimeoutKind::Idle)
        );
    }

    #[test]
    fn monotonicity_boundary_is_inclusive() {
        let c = cfg();
        let now = Instant::now();
        let exactly_at_threshold = now - Duration::from_millis(100);
        assert_eq!(
            is_timed_out(now, Some(exactly_at_threshold), None, None, None, &c),
            Some(TimeoutKind::Idle)
        );
    }
}
