//! # Bound RFCOMM TTY Transport
//!
//! Writes through an `/dev/rfcommN` device that has already been bound to
//! the printer's address:
//!
//! ```bash
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! Opening the device is what triggers the RFCOMM connection, so `open`
//! blocks for the same handshake a raw socket would.
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data is transmitted without
//! modification:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL
//! - **No flow control**: IXON, IXOFF, IXANY (0x11/0x13 appear in raster data)
//! - **No output processing**: OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, IntoRawFd};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use super::{Connector, Link};

/// Kernel table of bound RFCOMM devices.
const PROC_RFCOMM: &str = "/proc/net/rfcomm";

/// Opens the RFCOMM TTY bound to an address.
#[derive(Debug, Clone, Default)]
pub struct TtyConnector {
    /// Look bindings up in this file instead of `/proc/net/rfcomm`
    table: Option<PathBuf>,
}

impl TtyConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `table` (same format as `/proc/net/rfcomm`) for lookups.
    pub fn with_table(table: impl Into<PathBuf>) -> Self {
        Self {
            table: Some(table.into()),
        }
    }

    fn find_device(&self, address: &str) -> io::Result<PathBuf> {
        let table = self.table.as_deref().unwrap_or(Path::new(PROC_RFCOMM));
        if let Some(path) = find_rfcomm_in_table(table, address) {
            return Ok(path);
        }
        if self.table.is_none() {
            if let Some(path) = find_rfcomm_via_command(address) {
                return Ok(path);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no /dev/rfcomm device is bound to {}", address),
        ))
    }
}

impl Connector for TtyConnector {
    fn open(&self, address: &str) -> io::Result<Box<dyn Link>> {
        let path = self.find_device(address)?;
        debug!(address, device = %path.display(), "opening bound RFCOMM device");
        Ok(Box::new(TtyLink::open(&path)?))
    }
}

/// An open RFCOMM TTY in raw mode.
#[derive(Debug)]
pub struct TtyLink {
    file: Option<File>,
    stream_open: bool,
}

impl TtyLink {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).open(path)?;
        configure_tty_raw(file.as_raw_fd())?;
        Ok(Self::from(file))
    }
}

/// Wrap a device that is already open and configured.
impl From<File> for TtyLink {
    fn from(file: File) -> Self {
        Self {
            file: Some(file),
            stream_open: true,
        }
    }
}

impl Link for TtyLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.file {
            Some(file) if self.stream_open => {
                file.write_all(data)?;
                file.flush()
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "RFCOMM device is closed",
            )),
        }
    }

    /// Wait for queued output to reach the printer, then stop writing.
    fn close_stream(&mut self) -> io::Result<()> {
        if !self.stream_open {
            return Ok(());
        }
        self.stream_open = false;
        let Some(file) = &self.file else {
            return Ok(());
        };
        let ret = unsafe { libc::tcdrain(file.as_raw_fd()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn close_socket(&mut self) -> io::Result<()> {
        self.stream_open = false;
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let ret = unsafe { libc::close(file.into_raw_fd()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Find the device bound to `mac` in an `/proc/net/rfcomm`-style table.
///
/// Lines look like `rfcomm0: 00:11:62:AA:BB:CC channel 1 clean`.
fn find_rfcomm_in_table(table: &Path, mac: &str) -> Option<PathBuf> {
    let contents = fs::read_to_string(table).ok()?;
    device_for_mac(&contents, mac)
}

/// Fallback for kernels without the procfs table: `rfcomm -a`.
fn find_rfcomm_via_command(mac: &str) -> Option<PathBuf> {
    let output = match Command::new("rfcomm").arg("-a").output() {
        Ok(output) => output,
        Err(e) => {
            warn!("failed to run 'rfcomm -a': {}", e);
            return None;
        }
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    device_for_mac(&stdout, mac).filter(|path| path.exists())
}

fn device_for_mac(listing: &str, mac: &str) -> Option<PathBuf> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|name| PathBuf::from(format!("/dev/{}", name.trim())))
        .next()
}

/// Configure a file descriptor for raw TTY mode.
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
rfcomm0: 00:11:62:AA:BB:CC channel 1 clean
rfcomm1: 66:55:44:33:22:11 channel 3 connected
";

    #[test]
    fn test_device_for_mac_matches_case_insensitively() {
        assert_eq!(
            device_for_mac(TABLE, "66:55:44:33:22:11"),
            Some(PathBuf::from("/dev/rfcomm1"))
        );
        assert_eq!(
            device_for_mac(TABLE, "00:11:62:aa:bb:cc"),
            Some(PathBuf::from("/dev/rfcomm0"))
        );
    }

    #[test]
    fn test_device_for_unbound_mac() {
        assert_eq!(device_for_mac(TABLE, "DE:AD:BE:EF:00:01"), None);
        assert_eq!(device_for_mac("", "DE:AD:BE:EF:00:01"), None);
    }

    #[test]
    fn test_connector_reports_unbound_address() {
        let dir = scratch_dir("tty-table");
        let table = dir.join("rfcomm");
        fs::write(&table, TABLE).unwrap();

        let connector = TtyConnector::with_table(&table);
        let err = connector.open("DE:AD:BE:EF:00:01").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs::remove_dir_all(&dir).unwrap();
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("printbridge-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_open_requires_a_tty() {
        let err = TtyLink::open(Path::new("/dev/null")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn test_link_writes_and_closes_once() {
        let dir = scratch_dir("tty-link");
        let path = dir.join("rfcomm0");
        let mut link = TtyLink::from(File::create(&path).unwrap());

        link.write_all(b"\n\x1b@").unwrap();
        // Not a terminal, so draining fails, but only the first close tries.
        assert!(link.close_stream().is_err());
        link.close_stream().unwrap();
        assert_eq!(
            link.write_all(b"x").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        link.close_socket().unwrap();
        link.close_socket().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"\n\x1b@".to_vec());
        fs::remove_dir_all(&dir).unwrap();
    }
}
