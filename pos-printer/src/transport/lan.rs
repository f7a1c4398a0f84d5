//! Network printers (raw TCP, port 9100)

use super::{Connection, Transport, profile_timeout};
use crate::error::{PrintError, PrinterResult};
use shared::models::DEFAULT_LAN_PORT;
use shared::{PrinterProfile, TransportType};
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use tracing::{info, instrument, warn};

/// Raw socket transport for `{ip, port}` profiles
#[derive(Debug, Clone, Copy, Default)]
pub struct LanTransport;

impl LanTransport {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the profile's `ip` (or `host`) and `port` parameters
    pub fn resolve_addr(profile: &PrinterProfile) -> PrinterResult<SocketAddr> {
        let params = &profile.connection_params;
        let host = params
            .get_str("ip")
            .or_else(|| params.get_str("host"))
            .ok_or_else(|| {
                PrintError::InvalidConfig(format!(
                    "Profile '{}' has no printer IP address",
                    profile.display_name
                ))
            })?;
        let port = match params.get_str("port") {
            None => DEFAULT_LAN_PORT,
            Some(raw) => params.get_u16("port").ok_or_else(|| {
                PrintError::InvalidConfig(format!("Invalid port: {}", raw))
            })?,
        };

        (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| PrintError::Connection(format!("{}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| PrintError::Connection(format!("{}:{} did not resolve", host, port)))
    }
}

impl Transport for LanTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Lan
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    fn connect(&self, profile: &PrinterProfile) -> PrinterResult<Box<dyn Connection>> {
        let addr = Self::resolve_addr(profile)?;
        let timeout = profile_timeout(profile);

        info!(%addr, "Connecting to printer");
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                PrintError::Connection(format!("Connection timeout: {}", addr))
            } else {
                PrintError::Connection(format!("{}: {}", addr, e))
            }
        })?;

        let configured = stream
            .set_write_timeout(Some(timeout))
            .and_then(|_| stream.set_read_timeout(Some(timeout)))
            .and_then(|_| stream.set_nodelay(true));
        if let Err(e) = configured {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(PrintError::Connection(format!("{}: {}", addr, e)));
        }

        Ok(Box::new(TcpConnection {
            stream: Some(stream),
            addr,
        }))
    }
}

struct TcpConnection {
    stream: Option<TcpStream>,
    addr: SocketAddr,
}

impl Connection for TcpConnection {
    fn write_all(&mut self, bytes: &[u8]) -> PrinterResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| PrintError::Connection(format!("{}: connection closed", self.addr)))?;

        stream
            .write_all(bytes)
            .and_then(|_| stream.flush())
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                    PrintError::Connection(format!("Write timeout: {}", self.addr))
                }
                _ => PrintError::write_failed(&self.addr.to_string(), e),
            })
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take()
            && let Err(e) = stream.shutdown(Shutdown::Both)
            && e.kind() != ErrorKind::NotConnected
        {
            warn!(addr = %self.addr, error = %e, "Socket shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ConnectionParams;

    fn lan(params: ConnectionParams) -> PrinterProfile {
        PrinterProfile::new(TransportType::Lan, "kitchen").with_params(params)
    }

    #[test]
    fn test_default_port() {
        let addr =
            LanTransport::resolve_addr(&lan(ConnectionParams::new().with("ip", "127.0.0.1")))
                .unwrap();
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn test_string_port() {
        let params = ConnectionParams::new()
            .with("ip", "127.0.0.1")
            .with("port", "9101");
        assert_eq!(LanTransport::resolve_addr(&lan(params)).unwrap().port(), 9101);
    }

    #[test]
    fn test_missing_ip_is_invalid_config() {
        let err = LanTransport::resolve_addr(&lan(ConnectionParams::new())).unwrap_err();
        assert!(matches!(err, PrintError::InvalidConfig(_)));

        let params = ConnectionParams::new()
            .with("ip", "127.0.0.1")
            .with("port", "ninety");
        let err = LanTransport::resolve_addr(&lan(params)).unwrap_err();
        assert!(matches!(err, PrintError::InvalidConfig(_)));
    }
}
