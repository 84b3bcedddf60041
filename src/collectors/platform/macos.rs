//! macOS interface counters from the kernel routing table (`NET_RT_IFLIST2`)
//!
//! The sysctl returns a packed run of variable-length routing messages. Each
//! message starts with its own length, so the walker always advances by that
//! length and never assumes a stride. Only `RTM_IFINFO2` messages carry the
//! 64-bit `if_data64` counters; every other message kind is skipped.
//!
//! Record decoding reads fields at fixed offsets in native byte order, so it is
//! available (and tested) on every platform, as is the probe-then-fetch
//! buffer sizing. The sysctl calls themselves only exist on macOS.

use log::{debug, trace};
use std::io;

use crate::collectors::counters::{CollectionError, InterfaceSample};

pub const BACKEND_NAME: &str = "macos-sysctl";

/// `ifm_type` of an interface info message with 64-bit counters
pub const RTM_IFINFO2: u8 = 0x12;
/// `ifi_type` of a software loopback interface
pub const IFT_LOOP: u8 = 0x18;

/// `ifm_msglen` (u16), `ifm_version` (u8), `ifm_type` (u8)
pub const MSG_HEADER_LEN: usize = 4;

// Offsets inside `struct if_msghdr2`
const IFM_MSGLEN_OFFSET: usize = 0;
const IFM_TYPE_OFFSET: usize = 3;
const IFM_INDEX_OFFSET: usize = 12;
const IFM_DATA_OFFSET: usize = 32;

// Offsets inside `struct if_data64`
const IFI_TYPE_OFFSET: usize = 0;
const IFI_IBYTES_OFFSET: usize = 64;
const IFI_OBYTES_OFFSET: usize = 72;

/// Smallest `RTM_IFINFO2` message that still holds both byte counters
pub const IFINFO2_MIN_LEN: usize = IFM_DATA_OFFSET + IFI_OBYTES_OFFSET + 8;

/// Walks a `NET_RT_IFLIST2` buffer and returns one sample per non-loopback interface
///
/// `resolve_name` maps an interface index to its name; interfaces whose index
/// no longer resolves (removed since the sysctl ran) are left out.
///
/// Any framing problem (a length shorter than the message header, a message
/// running past the end of the buffer, or an `RTM_IFINFO2` message too short
/// for its counters) fails the whole walk.
pub fn walk_interface_records<F>(
    buf: &[u8],
    resolve_name: F,
) -> Result<Vec<InterfaceSample>, CollectionError>
where
    F: Fn(u16) -> Option<String>,
{
    let mut samples = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let remaining = &buf[offset..];
        if remaining.len() < MSG_HEADER_LEN {
            return Err(CollectionError::fetch(
                BACKEND_NAME,
                format!(
                    "truncated message header at offset {} ({} bytes left)",
                    offset,
                    remaining.len()
                ),
            ));
        }

        let msg_len = read_u16(remaining, IFM_MSGLEN_OFFSET) as usize;
        if msg_len < MSG_HEADER_LEN {
            return Err(CollectionError::fetch(
                BACKEND_NAME,
                format!("message at offset {} reports length {}", offset, msg_len),
            ));
        }
        if msg_len > remaining.len() {
            return Err(CollectionError::fetch(
                BACKEND_NAME,
                format!(
                    "message at offset {} reports length {} but only {} bytes remain",
                    offset,
                    msg_len,
                    remaining.len()
                ),
            ));
        }

        let record = &remaining[..msg_len];
        let msg_type = record[IFM_TYPE_OFFSET];
        if msg_type == RTM_IFINFO2 {
            if let Some(sample) = interpret_ifinfo2(record, offset, &resolve_name)? {
                samples.push(sample);
            }
        } else {
            trace!(
                "Skipping routing message type {:#x} at offset {} ({} bytes)",
                msg_type, offset, msg_len
            );
        }

        offset += msg_len;
    }

    Ok(samples)
}

fn interpret_ifinfo2<F>(
    record: &[u8],
    offset: usize,
    resolve_name: &F,
) -> Result<Option<InterfaceSample>, CollectionError>
where
    F: Fn(u16) -> Option<String>,
{
    if record.len() < IFINFO2_MIN_LEN {
        return Err(CollectionError::fetch(
            BACKEND_NAME,
            format!(
                "RTM_IFINFO2 message at offset {} is {} bytes, need at least {}",
                offset,
                record.len(),
                IFINFO2_MIN_LEN
            ),
        ));
    }

    let index = read_u16(record, IFM_INDEX_OFFSET);
    if record[IFM_DATA_OFFSET + IFI_TYPE_OFFSET] == IFT_LOOP {
        trace!("Skipping loopback interface index {}", index);
        return Ok(None);
    }

    let Some(name) = resolve_name(index) else {
        debug!("Interface index {} no longer resolves to a name, skipping", index);
        return Ok(None);
    };

    Ok(Some(InterfaceSample::new(
        name,
        read_u64(record, IFM_DATA_OFFSET + IFI_IBYTES_OFFSET),
        read_u64(record, IFM_DATA_OFFSET + IFI_OBYTES_OFFSET),
    )))
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_ne_bytes([buf[at], buf[at + 1]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_ne_bytes(bytes)
}

/// Runs the two-step size probe and fetch of the interface list
///
/// `probe` reports how many bytes the list needs; `fetch` fills the buffer
/// and reports how many bytes it wrote. A failed probe is a query failure. A
/// failed fetch, including a list that outgrew the probed size, is a fetch
/// failure.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn read_interface_list<P, F>(probe: P, fetch: F) -> Result<Vec<u8>, CollectionError>
where
    P: FnOnce() -> io::Result<usize>,
    F: FnOnce(&mut [u8]) -> io::Result<usize>,
{
    let needed = probe().map_err(|e| {
        CollectionError::query(BACKEND_NAME, "sysctl size probe failed").with_io_source(e)
    })?;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(needed).map_err(|_| {
        CollectionError::exhausted(
            BACKEND_NAME,
            format!("unable to allocate {} bytes for the interface list", needed),
        )
    })?;
    buf.resize(needed, 0);

    // A table that grew since the probe comes back as ENOMEM
    let fetched = fetch(&mut buf).map_err(|e| {
        CollectionError::fetch(
            BACKEND_NAME,
            format!("sysctl fetch into {} byte buffer failed", needed),
        )
        .with_io_source(e)
    })?;

    buf.truncate(fetched);
    trace!("Fetched {} of {} probed interface list bytes", buf.len(), needed);
    Ok(buf)
}

#[cfg(target_os = "macos")]
pub use self::sys::SysctlInterfaceCollector;

#[cfg(target_os = "macos")]
mod sys {
    use std::ffi::CStr;
    use std::mem::offset_of;
    use std::ptr;

    use super::*;
    use crate::collectors::platform::InterfaceStatsCollector;

    const _: () = {
        assert!(offset_of!(libc::if_msghdr2, ifm_index) == IFM_INDEX_OFFSET);
        assert!(offset_of!(libc::if_msghdr2, ifm_data) == IFM_DATA_OFFSET);
        assert!(offset_of!(libc::if_data64, ifi_ibytes) == IFI_IBYTES_OFFSET);
        assert!(offset_of!(libc::if_data64, ifi_obytes) == IFI_OBYTES_OFFSET);
    };

    /// Reads interface counters with the two-step `sysctl(NET_RT_IFLIST2)` protocol
    #[derive(Debug, Default, Clone)]
    pub struct SysctlInterfaceCollector;

    impl SysctlInterfaceCollector {
        pub fn new() -> Self {
            Self
        }

        fn read_samples(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
            let buf = fetch_interface_list()?;
            walk_interface_records(&buf, interface_name)
        }
    }

    impl InterfaceStatsCollector for SysctlInterfaceCollector {
        fn collect(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
            let samples = self.read_samples().map_err(CollectionError::logged)?;
            debug!("Collected {} interfaces via sysctl", samples.len());
            Ok(samples)
        }

        fn backend_name(&self) -> &'static str {
            BACKEND_NAME
        }
    }

    fn fetch_interface_list() -> Result<Vec<u8>, CollectionError> {
        let mut mib: [libc::c_int; 6] = [
            libc::CTL_NET,
            libc::PF_ROUTE,
            0,
            0,
            libc::NET_RT_IFLIST2,
            0,
        ];
        let name = mib.as_mut_ptr();
        let name_len = mib.len() as libc::c_uint;

        read_interface_list(
            || {
                let mut needed: libc::size_t = 0;
                let rc = unsafe {
                    libc::sysctl(
                        name,
                        name_len,
                        ptr::null_mut(),
                        &mut needed,
                        ptr::null_mut(),
                        0,
                    )
                };
                if rc < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(needed)
            },
            |buf| {
                let mut fetched: libc::size_t = buf.len();
                let rc = unsafe {
                    libc::sysctl(
                        name,
                        name_len,
                        buf.as_mut_ptr().cast(),
                        &mut fetched,
                        ptr::null_mut(),
                        0,
                    )
                };
                if rc < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(fetched)
            },
        )
    }

    fn interface_name(index: u16) -> Option<String> {
        let mut name = [0 as libc::c_char; libc::IF_NAMESIZE];
        let found = unsafe { libc::if_indextoname(libc::c_uint::from(index), name.as_mut_ptr()) };
        if found.is_null() {
            return None;
        }
        let name = unsafe { CStr::from_ptr(name.as_ptr()) };
        Some(name.to_string_lossy().into_owned())
    }
}
