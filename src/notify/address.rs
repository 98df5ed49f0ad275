//! Supervisor socket address resolution.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use crate::notify::NotifyError;

/// Where the supervisor listens for notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAddress {
    /// A socket bound at a filesystem path.
    Path(PathBuf),
    /// A socket in the Linux abstract namespace, stored without the leading NUL.
    Abstract(Vec<u8>),
}

impl ChannelAddress {
    /// Parse an address in `NOTIFY_SOCKET` syntax.
    pub fn parse(raw: &str) -> Result<Self, NotifyError> {
        Self::parse_os(OsStr::new(raw))
    }

    /// Parse raw variable contents. Paths keep their bytes even when they are not UTF-8.
    pub fn parse_os(raw: &OsStr) -> Result<Self, NotifyError> {
        match raw.as_bytes() {
            [b'/', ..] => Ok(Self::Path(PathBuf::from(raw))),
            [b'@', name @ ..] if cfg!(any(target_os = "linux", target_os = "android")) => {
                Ok(Self::Abstract(name.to_vec()))
            }
            _ => Err(NotifyError::UnsupportedAddressFamily(
                raw.to_string_lossy().into_owned(),
            )),
        }
    }

    /// Read and parse the address from `var`. Unset or empty means no supervisor.
    pub fn from_env(var: &str) -> Result<Option<Self>, NotifyError> {
        match std::env::var_os(var) {
            Some(value) if !value.is_empty() => Self::parse_os(&value).map(Some),
            _ => Ok(None),
        }
    }

    /// The `sun_path` bytes this address maps to. Abstract names get a leading NUL.
    pub fn socket_name(&self) -> Vec<u8> {
        match self {
            Self::Path(path) => path.as_os_str().as_bytes().to_vec(),
            Self::Abstract(name) => {
                let mut bytes = Vec::with_capacity(name.len() + 1);
                bytes.push(0);
                bytes.extend_from_slice(name);
                bytes
            }
        }
    }

    /// Connect `socket` to this address.
    pub(crate) fn connect(&self, socket: &UnixDatagram) -> io::Result<()> {
        match self {
            Self::Path(path) => socket.connect(path),
            Self::Abstract(name) => connect_abstract(socket, name),
        }
    }
}

#[cfg(target_os = "linux")]
fn connect_abstract(socket: &UnixDatagram, name: &[u8]) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name)?;
    socket.connect_addr(&addr)
}

#[cfg(target_os = "android")]
fn connect_abstract(socket: &UnixDatagram, name: &[u8]) -> io::Result<()> {
    use std::os::android::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name)?;
    socket.connect_addr(&addr)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(_socket: &UnixDatagram, _name: &[u8]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract socket addresses require Linux",
    ))
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Abstract(name) => write!(f, "@{}", String::from_utf8_lossy(name)),
        }
    }
}
