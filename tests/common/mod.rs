//! Shared utilities for integration tests.

use std::ffi::{OsStr, OsString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use lifecycle_notifier::config::ServiceConfig;
use lifecycle_notifier::notify::Notifier;
use tempfile::TempDir;
use tokio::net::UnixDatagram;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Serializes environment writes within a test binary.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Set a variable no other test reads. Each name is written once, before anything
/// that reads it is created; callers never overwrite a variable a running service
/// or notifier already uses.
#[allow(dead_code)]
pub fn set_env(var: &str, value: impl AsRef<OsStr>) {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var(var, value);
}

/// Unique suffix so parallel tests never share a variable or socket name.
#[allow(dead_code)]
pub fn unique_id() -> String {
    format!("{}_{}", std::process::id(), NEXT_ID.fetch_add(1, Ordering::SeqCst))
}

/// A stand-in supervisor: a bound datagram socket plus the variable pointing at it.
pub struct MockSupervisor {
    _dir: Option<TempDir>,
    socket: UnixDatagram,
    address: OsString,
    env_var: String,
}

#[allow(dead_code)]
impl MockSupervisor {
    /// Bind at a fresh filesystem path.
    pub fn bind() -> Self {
        Self::bind_named(OsStr::new("notify.sock"))
    }

    /// Bind at `file_name` inside a fresh directory.
    pub fn bind_named(file_name: &OsStr) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        let socket = UnixDatagram::bind(&path).unwrap();

        let env_var = format!("LIFECYCLE_TEST_NOTIFY_SOCKET_{}", unique_id());
        set_env(&env_var, &path);

        Self {
            _dir: Some(dir),
            socket,
            address: path.into_os_string(),
            env_var,
        }
    }

    /// Bind in the abstract namespace and advertise it as `@name`.
    #[cfg(target_os = "linux")]
    pub fn bind_abstract(name: &str) -> Self {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::SocketAddr;

        let addr = SocketAddr::from_abstract_name(name.as_bytes()).unwrap();
        let std_socket = std::os::unix::net::UnixDatagram::bind_addr(&addr).unwrap();
        std_socket.set_nonblocking(true).unwrap();
        let socket = UnixDatagram::from_std(std_socket).unwrap();

        let address = OsString::from(format!("@{name}"));
        let env_var = format!("LIFECYCLE_TEST_NOTIFY_SOCKET_{}", unique_id());
        set_env(&env_var, &address);

        Self {
            _dir: None,
            socket,
            address,
            env_var,
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Value to hand a child process as `NOTIFY_SOCKET`.
    pub fn address(&self) -> &OsStr {
        &self.address
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::with_socket_env(self.env_var.clone())
    }

    /// Default config pointed at this supervisor, with a short loop interval.
    pub fn config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.notify.socket_env = self.env_var.clone();
        config.service.interval_secs = 1;
        config.debug.listen_address = "127.0.0.1:0".to_string();
        config
    }

    /// Next datagram, or `None` if nothing arrives within `timeout`.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; 4096];
        match tokio::time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Some(buf)
            }
            _ => None,
        }
    }

    /// Next datagram as text. Panics if none arrives within five seconds.
    pub async fn recv(&self) -> String {
        let bytes = self
            .recv_timeout(Duration::from_secs(5))
            .await
            .expect("supervisor received nothing");
        String::from_utf8(bytes).unwrap()
    }

    /// Assert that nothing arrives for a short while.
    pub async fn assert_silent(&self) {
        if let Some(bytes) = self.recv_timeout(Duration::from_millis(200)).await {
            panic!("unexpected datagram: {:?}", String::from_utf8_lossy(&bytes));
        }
    }
}

/// Extract `MONOTONIC_USEC` from a reloading message.
#[allow(dead_code)]
pub fn monotonic_usec(message: &str) -> u64 {
    let mut lines = message.split('\n');
    assert_eq!(lines.next(), Some("RELOADING=1"), "not a reloading message: {message:?}");
    lines
        .next()
        .and_then(|line| line.strip_prefix("MONOTONIC_USEC="))
        .expect("missing MONOTONIC_USEC")
        .parse()
        .unwrap()
}
