//! Host platform identification.

use std::ffi::CStr;
use std::mem::MaybeUninit;

/// Platform version string, e.g. `"Linux 6.8.0-45-generic"`.
pub fn platform_version() -> String {
    match uname() {
        Some((sysname, release)) => format!("{} {}", sysname, release),
        None => std::env::consts::OS.to_string(),
    }
}

fn uname() -> Option<(String, String)> {
    let mut info = MaybeUninit::<libc::utsname>::uninit();
    if unsafe { libc::uname(info.as_mut_ptr()) } != 0 {
        return None;
    }
    let info = unsafe { info.assume_init() };

    let sysname = unsafe { CStr::from_ptr(info.sysname.as_ptr()) };
    let release = unsafe { CStr::from_ptr(info.release.as_ptr()) };
    Some((
        sysname.to_string_lossy().into_owned(),
        release.to_string_lossy().into_owned(),
    ))
}
