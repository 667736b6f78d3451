//! Owns every `Server` and drives the single poll loop (spec §4.I).
//! Grounded on `examples/original_source/src/server/ServerManager.cpp`:
//! construct one `Server` per listening socket, `poll()` once per cycle,
//! dispatch each ready fd to its owning server, then reconcile (timeouts,
//! closed connections, unreaped CGI children) -- the donor does this
//! reconciliation with raw `pollfd`/`waitpid(WNOHANG)` bookkeeping every
//! cycle; here `mio` already tracks readiness, so reconciliation narrows to
//! `timeouts::sweep` plus purgatory reaping, run on `RECONCILE_INTERVAL`
//! rather than every single cycle since it no longer gates the poll itself.

use crate::prelude::*;
use crate::signal;
use crate::timeouts;

pub struct ServerManager {
    servers: Vec<Server>,
    next_token: usize,
}

impl ServerManager {
    pub fn new(configs: Vec<ServerConfig>, poll: &Poll) -> Result<Self> {
        let mut next_token = 0usize;
        let servers = Server::bind_groups(configs, poll, &mut next_token)?;
        Ok(Self { servers, next_token })
    }

    /// spec §4.I: loop until SIGINT, dispatching readiness events and
    /// periodically sweeping for timeouts / reaping CGI children.
    pub fn run(&mut self, mut poll: Poll) -> Result<()> {
        let mut events = Events::with_capacity(1024);
        let mut last_sweep = Instant::now();

        while !signal::is_interrupted() {
            match poll.poll(&mut events, Some(RECONCILE_INTERVAL)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            for event in events.iter() {
                let token = event.token();
                if let Some(server) = self.servers.iter_mut().find(|s| s.owns(token)) {
                    if let Err(e) = server.process(&poll, token, event, &mut self.next_token) {
                        errors!("error servicing {:?}: {}", token, e);
                    }
                }
            }

            if last_sweep.elapsed() >= RECONCILE_INTERVAL {
                for server in &mut self.servers {
                    timeouts::sweep(server, &poll);
                    reap_zombies(server);
                }
                last_sweep = Instant::now();
            }
        }

        info!("shutting down");
        self.shutdown(&poll);
        Ok(())
    }

    pub fn shutdown(&mut self, poll: &Poll) {
        for server in &mut self.servers {
            server.shutdown(poll);
            reap_zombies(server);
        }
    }
}

/// spec §4.I: reap children left in `zombie_purgatory` once their exit
/// status becomes available, without blocking the loop on a running one.
fn reap_zombies(server: &mut Server) {
    server.zombie_purgatory.retain_mut(|child| match child.try_wait() {
        Ok(Some(_)) => false,
        Ok(None) => true,
        Err(_) => false,
    });
}
