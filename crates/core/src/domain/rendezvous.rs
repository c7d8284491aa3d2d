// Rendezvous address shared by the master and its workers

use std::fmt;

/// CLI flag the estimation executable expects before the rendezvous address
pub const HOSTNAME_FLAG: &str = "/h";

/// Default hostname when running everything on the local machine
pub const LOCAL_HOST: &str = "localhost";

/// The `host:port` rendezvous shared read-only by all workers and the
/// master for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousAddr {
    host: String,
    port: u16,
}

impl RendezvousAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Rendezvous on the local machine
    pub fn localhost(port: u16) -> Self {
        Self::new(LOCAL_HOST, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Argument form passed to workers: `<host>:<port>`
    pub fn worker_arg(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Argument form passed to the master: `:<port>` (bind all interfaces)
    pub fn master_arg(&self) -> String {
        format!(":{}", self.port)
    }
}

impl fmt::Display for RendezvousAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
