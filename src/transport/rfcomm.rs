//! # Bluetooth RFCOMM Socket Transport
//!
//! Talks to a printer over the Serial Port Profile by opening an
//! `AF_BLUETOOTH` / `SOCK_STREAM` / `BTPROTO_RFCOMM` socket directly, so no
//! `rfcomm bind` step is needed. The printer must already be paired:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//! [bluetooth]# trust 00:11:62:XX:XX:XX
//! ```
//!
//! Writes use `MSG_NOSIGNAL`: a printer that drops the link surfaces as an
//! `EPIPE` error on the write instead of killing the process.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};

use bluer::Address;
use tracing::debug;

use super::{Connector, Link, RFCOMM_DEFAULT_CHANNEL, SPP_UUID};

// From <bluetooth/bluetooth.h> and <bluetooth/rfcomm.h>
const AF_BLUETOOTH: libc::c_int = 31;
const BTPROTO_RFCOMM: libc::c_int = 3;

/// `sockaddr_rc` from <bluetooth/rfcomm.h>.
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// Opens RFCOMM sockets on a fixed channel.
#[derive(Debug, Clone, Copy)]
pub struct RfcommConnector {
    channel: u8,
}

impl RfcommConnector {
    pub fn new(channel: u8) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl Default for RfcommConnector {
    fn default() -> Self {
        Self::new(RFCOMM_DEFAULT_CHANNEL)
    }
}

impl Connector for RfcommConnector {
    fn open(&self, address: &str) -> io::Result<Box<dyn Link>> {
        debug!(address, channel = self.channel, service = %SPP_UUID, "opening RFCOMM socket");
        let socket = RfcommSocket::connect(address, self.channel)?;
        Ok(Box::new(socket))
    }
}

/// A connected RFCOMM socket.
///
/// `stream_open` tracks the write half; the fd itself is the socket.
#[derive(Debug)]
pub struct RfcommSocket {
    fd: Option<OwnedFd>,
    stream_open: bool,
}

impl RfcommSocket {
    /// Connect to `address` on `channel`. Blocks until the RFCOMM handshake
    /// completes or the kernel gives up.
    pub fn connect(address: &str, channel: u8) -> io::Result<Self> {
        let bdaddr = parse_bdaddr(address)?;

        let raw = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_STREAM, BTPROTO_RFCOMM) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // Owned from here on, so every early return closes it.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = SockaddrRc {
            rc_family: AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr,
            rc_channel: channel,
        };

        loop {
            let ret = unsafe {
                libc::connect(
                    fd.as_raw_fd(),
                    &addr as *const SockaddrRc as *const libc::sockaddr,
                    std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
                )
            };
            if ret == 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }

        Ok(Self::from(fd))
    }

    fn raw_fd(&self) -> io::Result<libc::c_int> {
        match &self.fd {
            Some(fd) if self.stream_open => Ok(fd.as_raw_fd()),
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "RFCOMM stream is closed",
            )),
        }
    }
}

/// Wrap an already connected stream socket.
impl From<OwnedFd> for RfcommSocket {
    fn from(fd: OwnedFd) -> Self {
        Self {
            fd: Some(fd),
            stream_open: true,
        }
    }
}

impl Link for RfcommSocket {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let fd = self.raw_fd()?;
        let mut sent = 0;
        while sent < data.len() {
            let n = unsafe {
                libc::send(
                    fd,
                    data[sent..].as_ptr() as *const libc::c_void,
                    data.len() - sent,
                    libc::MSG_NOSIGNAL,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            sent += n as usize;
        }
        Ok(())
    }

    fn close_stream(&mut self) -> io::Result<()> {
        if !self.stream_open {
            return Ok(());
        }
        self.stream_open = false;
        let Some(fd) = &self.fd else {
            return Ok(());
        };
        let ret = unsafe { libc::shutdown(fd.as_raw_fd(), libc::SHUT_WR) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn close_socket(&mut self) -> io::Result<()> {
        self.stream_open = false;
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        let ret = unsafe { libc::close(fd.into_raw_fd()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse "XX:XX:XX:XX:XX:XX" into BlueZ's `bdaddr_t` (least significant
/// byte first).
fn parse_bdaddr(address: &str) -> io::Result<[u8; 6]> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a valid Bluetooth address", address),
        )
    };
    if !is_valid_mac(address) {
        return Err(invalid());
    }

    let parsed: Address = address.parse().map_err(|_| invalid())?;
    let mut bdaddr = parsed.0;
    bdaddr.reverse();
    Ok(bdaddr)
}
