//! One `Server` per listening socket (spec §4.G). Grounded on
//! `examples/original_source/include/Server.hpp` +
//! `src/server/Server.cpp` (`process`, `closeConnection`, `_handleCGI`), with
//! the raw `pollfd`/`WorkerProcess` bookkeeping replaced by `mio`'s own
//! readiness tracking -- this is the teacher's own substitution (see
//! `http/http_connection.rs`'s `poll.registry()` calls), not a fresh choice.
//!
//! A `ServerConfig` may list several ports, and several `ServerConfig`s may
//! share a `(host, port)` pair for name-based virtual hosting (spec §6
//! `server_name`, enforced at `config::validate`'s conflict check). Both
//! cases collapse onto "one listening socket, one or more `ServerConfig`s" --
//! so a `Server` here owns one socket and the list of configs resolvable on
//! it, exactly the shape `HttpConnection::resolve_config` already expects.

use crate::cgi;
use crate::prelude::*;

pub struct Server {
    pub listeners: HashMap<Token, TcpListener>,
    pub config_list: Vec<Arc<ServerConfig>>,
    pub connections: HashMap<Token, HttpConnection>,
    pub cgi_to_client: HashMap<Token, Token>,
    pub zombie_purgatory: Vec<std::process::Child>,
}

impl Server {
    /// Bind one passive socket per distinct `(host, port)` pair across every
    /// `ServerConfig` (spec §4.G construction), grouping configs that share a
    /// pair into the same `Server` for virtual-host dispatch.
    pub fn bind_groups(
        configs: Vec<ServerConfig>,
        poll: &Poll,
        next_token: &mut usize,
    ) -> Result<Vec<Server>> {
        let mut groups: Vec<((String, u16), Vec<Arc<ServerConfig>>)> = Vec::new();
        for cfg in configs {
            let cfg = Arc::new(cfg);
            for &port in &cfg.ports {
                let key = (cfg.host.clone(), port);
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, list)) => list.push(Arc::clone(&cfg)),
                    None => groups.push((key, vec![Arc::clone(&cfg)])),
                }
            }
        }

        let mut servers = Vec::with_capacity(groups.len());
        for ((host, port), config_list) in groups {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let mut listener = TcpListener::bind(addr)?;
            let token = Token(*next_token);
            *next_token += 1;
            poll.registry()
                .register(&mut listener, token, Interest::READABLE)?;

            info!(
                "listening on {}:{} ({} virtual host(s): {})",
                host,
                port,
                config_list.len(),
                config_list
                    .iter()
                    .map(|c| c.server_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let mut listeners = HashMap::new();
            listeners.insert(token, listener);

            servers.push(Server {
                listeners,
                config_list,
                connections: HashMap::new(),
                cgi_to_client: HashMap::new(),
                zombie_purgatory: Vec::new(),
            });
        }
        Ok(servers)
    }

    /// Whether this server is responsible for `token` -- its own listening
    /// socket, a client connection, or a CGI pipe belonging to one.
    pub fn owns(&self, token: Token) -> bool {
        self.listeners.contains_key(&token)
            || self.connections.contains_key(&token)
            || self.cgi_to_client.contains_key(&token)
    }

    /// Dispatch one readiness event (spec §4.G `process`): accept on a
    /// listening socket, drive the client state machine on a connection fd,
    /// or forward to the CGI supervisor on a worker pipe fd.
    pub fn process(
        &mut self,
        poll: &Poll,
        token: Token,
        event: &Event,
        next_token: &mut usize,
    ) -> Result<()> {
        if self.listeners.contains_key(&token) {
            self.accept_loop(poll, token, next_token)?;
            return Ok(());
        }

        if self.connections.contains_key(&token) {
            if event.is_readable() {
                let Server {
                    connections,
                    cgi_to_client,
                    ..
                } = self;
                if let Some(conn) = connections.get_mut(&token) {
                    HttpConnection::handle_read_phase(conn, poll, token, next_token, cgi_to_client)?;
                }
            }

            if self.should_terminate(token) {
                HttpConnection::terminate_connection(self, token);
                return Ok(());
            }

            if event.is_writable() {
                let Server {
                    connections,
                    cgi_to_client,
                    ..
                } = self;
                if let Some(conn) = connections.get_mut(&token) {
                    HttpConnection::handle_write_phase(conn, poll, token, next_token, cgi_to_client)?;
                }

                if self.should_terminate(token) {
                    HttpConnection::terminate_connection(self, token);
                }
            }
            return Ok(());
        }

        if let Some(&client_token) = self.cgi_to_client.get(&token) {
            let Server {
                connections,
                cgi_to_client,
                ..
            } = self;
            if let Some(conn) = connections.get_mut(&client_token) {
                cgi::handle_cgi_event(poll, event, token, client_token, conn, cgi_to_client)?;
            }

            if self.should_terminate(client_token) {
                HttpConnection::terminate_connection(self, client_token);
            }
        }

        Ok(())
    }

    fn should_terminate(&self, token: Token) -> bool {
        self.connections
            .get(&token)
            .map(|c| c.should_close())
            .unwrap_or(false)
    }

    /// spec §4.G: "accept once" per listening-socket readiness -- but since
    /// several clients can queue up between poll cycles, drain until the
    /// accept queue reports `WouldBlock`.
    fn accept_loop(&mut self, poll: &Poll, listener_token: Token, next_token: &mut usize) -> Result<()> {
        let Some(listener) = self.listeners.get_mut(&listener_token) else {
            return Ok(());
        };
        loop {
            match listener.accept() {
                Ok((mut stream, _addr)) => {
                    stream.set_nodelay(true).ok();
                    let client_token = Token(*next_token);
                    *next_token += 1;
                    poll.registry()
                        .register(&mut stream, client_token, Interest::READABLE)?;
                    self.connections.insert(
                        client_token,
                        HttpConnection::new(stream, self.config_list.clone()),
                    );
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    errors!("accept failed on {:?}: {}", listener_token, e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// spec §4.I shutdown: close every connection (SIGTERM-ing and deferring
    /// any still-running CGI child to `zombie_purgatory`), then close the
    /// listening sockets themselves.
    pub fn shutdown(&mut self, poll: &Poll) {
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            HttpConnection::terminate_connection(self, token);
        }
        for listener in self.listeners.values_mut() {
            let _ = poll.registry().deregister(listener);
        }
    }
}
