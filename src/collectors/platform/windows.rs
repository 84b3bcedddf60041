//! Windows interface counters from the IP Helper interface table (`GetIfTable`)
//!
//! Since Vista the table lists several virtual rows per physical adapter, all
//! sharing the adapter's hardware address. Rows are therefore keyed by hardware
//! address, and a row whose address was already accepted in the same call is
//! dropped.
//!
//! Table decoding, buffer sizing and row filtering are independent of the OS
//! call and build on every platform; only `GetIfTable` itself is Windows-only.

use log::{debug, trace};
use std::mem::{offset_of, size_of};

use crate::collectors::counters::{CollectionError, InterfaceSample, format_hardware_address};

pub const BACKEND_NAME: &str = "windows-iftable";

/// `IF_TYPE_SOFTWARE_LOOPBACK`
pub const IF_TYPE_SOFTWARE_LOOPBACK: u32 = 24;
/// `IF_TYPE_ETHERNET_CSMACD`
pub const IF_TYPE_ETHERNET_CSMACD: u32 = 6;
/// `MIB_IF_OPER_STATUS_OPERATIONAL`
pub const MIB_IF_OPER_STATUS_OPERATIONAL: u32 = 5;
/// `MIB_IF_OPER_STATUS_NON_OPERATIONAL`
pub const MIB_IF_OPER_STATUS_NON_OPERATIONAL: u32 = 0;

/// `MAXLEN_PHYSADDR`
pub const MAXLEN_PHYSADDR: usize = 8;

/// The fields of one `MIB_IFROW` that decide whether and how it is sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfTableRow {
    pub if_type: u32,
    pub oper_status: u32,
    pub phys_addr: [u8; MAXLEN_PHYSADDR],
    pub in_octets: u64,
    pub out_octets: u64,
}

impl IfTableRow {
    /// Loopback rows and rows that are not operational are never sampled.
    ///
    /// Adapters disabled around sleep report zero counters for a few seconds,
    /// which shows up as a huge delta once they come back; skipping
    /// non-operational rows keeps those readings out.
    pub fn is_sampled(&self) -> bool {
        self.if_type != IF_TYPE_SOFTWARE_LOOPBACK
            && self.oper_status == MIB_IF_OPER_STATUS_OPERATIONAL
    }

    pub fn identity(&self) -> String {
        format_hardware_address(&self.phys_addr)
    }
}

/// Filters interface table rows into samples, keeping the first row per hardware address
pub fn samples_from_rows<I>(rows: I) -> Vec<InterfaceSample>
where
    I: IntoIterator<Item = IfTableRow>,
{
    let mut samples: Vec<InterfaceSample> = Vec::new();

    for row in rows {
        if !row.is_sampled() {
            trace!(
                "Skipping interface row type={} oper_status={}",
                row.if_type, row.oper_status
            );
            continue;
        }

        let sample = InterfaceSample::new(row.identity(), row.in_octets, row.out_octets);
        if samples.iter().any(|s| s.identity == sample.identity) {
            trace!("Dropping duplicate interface row for {}", sample.identity);
            continue;
        }
        samples.push(sample);
    }

    samples
}

pub const NO_ERROR: u32 = 0;
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

const MAX_INTERFACE_NAME_LEN: usize = 256;
const MAXLEN_IFDESCR: usize = 256;

/// `MIB_IFROW`
#[repr(C)]
#[allow(dead_code)]
struct MibIfRow {
    name: [u16; MAX_INTERFACE_NAME_LEN],
    index: u32,
    if_type: u32,
    mtu: u32,
    speed: u32,
    phys_addr_len: u32,
    phys_addr: [u8; MAXLEN_PHYSADDR],
    admin_status: u32,
    oper_status: u32,
    last_change: u32,
    in_octets: u32,
    in_ucast_pkts: u32,
    in_nucast_pkts: u32,
    in_discards: u32,
    in_errors: u32,
    in_unknown_protos: u32,
    out_octets: u32,
    out_ucast_pkts: u32,
    out_nucast_pkts: u32,
    out_discards: u32,
    out_errors: u32,
    out_qlen: u32,
    descr_len: u32,
    descr: [u8; MAXLEN_IFDESCR],
}

/// `MIB_IFTABLE`
#[repr(C)]
#[allow(dead_code)]
struct MibIfTable {
    num_entries: u32,
    table: [MibIfRow; 1],
}

const _: () = assert!(size_of::<MibIfRow>() == 860);

/// Working memory for one `GetIfTable` call, freed when dropped
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
struct TableBuffer {
    words: Vec<u32>,
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
impl TableBuffer {
    fn with_size(bytes: u32) -> Result<Self, CollectionError> {
        let len = (bytes as usize).div_ceil(size_of::<u32>());
        let mut words = Vec::new();
        words.try_reserve_exact(len).map_err(|_| {
            CollectionError::exhausted(
                BACKEND_NAME,
                format!("unable to allocate {} bytes for the interface table", bytes),
            )
        })?;
        words.resize(len, 0);
        Ok(Self { words })
    }

    fn byte_len(&self) -> usize {
        self.words.len() * size_of::<u32>()
    }

    fn as_table_ptr(&mut self) -> *mut MibIfTable {
        self.words.as_mut_ptr().cast()
    }

    fn rows(&self) -> Result<Vec<IfTableRow>, CollectionError> {
        let num_entries = self.words.first().copied().unwrap_or(0) as usize;
        let rows_offset = offset_of!(MibIfTable, table);
        let needed = num_entries
            .checked_mul(size_of::<MibIfRow>())
            .and_then(|n| n.checked_add(rows_offset));
        if needed.is_none_or(|n| n > self.byte_len()) {
            return Err(CollectionError::fetch(
                BACKEND_NAME,
                format!(
                    "interface table claims {} rows but the buffer is {} bytes",
                    num_entries,
                    self.byte_len()
                ),
            ));
        }

        let base = self.words.as_ptr().cast::<u8>();
        let rows = (0..num_entries)
            .map(|i| {
                // In bounds per the size check above; u32 backing keeps rows aligned
                let row = unsafe {
                    &*base
                        .add(rows_offset + i * size_of::<MibIfRow>())
                        .cast::<MibIfRow>()
                };
                IfTableRow {
                    if_type: row.if_type,
                    oper_status: row.oper_status,
                    phys_addr: row.phys_addr,
                    in_octets: u64::from(row.in_octets),
                    out_octets: u64::from(row.out_octets),
                }
            })
            .collect();
        Ok(rows)
    }
}

/// Fetches and decodes the interface table through `get_if_table`
///
/// `get_if_table` has the `GetIfTable` contract: it fills the buffer and
/// returns `NO_ERROR`, or stores the required size and returns
/// `ERROR_INSUFFICIENT_BUFFER`. The buffer is regrown exactly once; a second
/// failure is a fetch failure, any other first-call error a query failure.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn fetch_rows<F>(mut get_if_table: F) -> Result<Vec<IfTableRow>, CollectionError>
where
    F: FnMut(&mut TableBuffer, &mut u32) -> u32,
{
    let mut size = size_of::<MibIfTable>() as u32;
    let mut buffer = TableBuffer::with_size(size)?;

    let rc = get_if_table(&mut buffer, &mut size);
    match rc {
        NO_ERROR => {}
        ERROR_INSUFFICIENT_BUFFER => {
            debug!("GetIfTable needs {} bytes, retrying", size);
            drop(buffer);
            buffer = TableBuffer::with_size(size)?;

            let rc = get_if_table(&mut buffer, &mut size);
            if rc != NO_ERROR {
                return Err(CollectionError::fetch(
                    BACKEND_NAME,
                    format!("GetIfTable retry with {} bytes failed", buffer.byte_len()),
                )
                .with_os_code(rc as i32));
            }
        }
        _ => {
            return Err(CollectionError::query(BACKEND_NAME, "GetIfTable failed")
                .with_os_code(rc as i32));
        }
    }

    buffer.rows()
}

#[cfg(target_os = "windows")]
pub use self::sys::IfTableCollector;

#[cfg(target_os = "windows")]
mod sys {
    use super::*;
    use crate::collectors::platform::InterfaceStatsCollector;

    #[link(name = "iphlpapi")]
    unsafe extern "system" {
        fn GetIfTable(table: *mut MibIfTable, size: *mut u32, order: i32) -> u32;
    }

    /// Reads interface counters from `GetIfTable`, growing the buffer once if asked to
    #[derive(Debug, Default, Clone)]
    pub struct IfTableCollector;

    impl IfTableCollector {
        pub fn new() -> Self {
            Self
        }

        fn read_samples(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
            // The size argument never exceeds the buffer handed over with it
            let rows = fetch_rows(|buffer, size| unsafe {
                GetIfTable(buffer.as_table_ptr(), size, 0)
            })?;
            Ok(samples_from_rows(rows))
        }
    }

    impl InterfaceStatsCollector for IfTableCollector {
        fn collect(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
            let samples = self.read_samples().map_err(CollectionError::logged)?;
            debug!("Collected {} interfaces via GetIfTable", samples.len());
            Ok(samples)
        }

        fn backend_name(&self) -> &'static str {
            BACKEND_NAME
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::counters::CollectionErrorKind;

    fn row(if_type: u32, oper_status: u32, mac: [u8; 6], rx: u64, tx: u64) -> IfTableRow {
        let mut phys_addr = [0u8; MAXLEN_PHYSADDR];
        phys_addr[..6].copy_from_slice(&mac);
        IfTableRow {
            if_type,
            oper_status,
            phys_addr,
            in_octets: rx,
            out_octets: tx,
        }
    }

    const MAC_A: [u8; 6] = [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e];
    const MAC_B: [u8; 6] = [0xf0, 0xde, 0xf1, 0x00, 0x00, 0x01];

    #[test]
    fn test_duplicate_hardware_addresses_collapse() {
        let rows = vec![
            row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_A, 100, 200),
            row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_A, 100, 200),
            row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_B, 7, 8),
        ];

        let samples = samples_from_rows(rows);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].identity, "001A2B3C4D5E");
        assert_eq!(samples[0].download_bytes, 100);
        assert_eq!(samples[1].identity, "F0DEF1000001");
    }

    #[test]
    fn test_first_duplicate_wins() {
        let rows = vec![
            row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_A, 1, 2),
            row(71, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_A, 3, 4),
        ];

        let samples = samples_from_rows(rows);
        assert_eq!(samples, vec![InterfaceSample::new("001A2B3C4D5E", 1, 2)]);
    }

    #[test]
    fn test_non_operational_row_is_excluded() {
        let rows = vec![row(
            IF_TYPE_ETHERNET_CSMACD,
            MIB_IF_OPER_STATUS_NON_OPERATIONAL,
            MAC_A,
            0,
            0,
        )];
        assert!(samples_from_rows(rows).is_empty());

        // Unreachable, disconnected, connecting and connected are not operational either
        for status in [1, 2, 3, 4] {
            let r = row(IF_TYPE_ETHERNET_CSMACD, status, MAC_B, 1, 1);
            assert!(!r.is_sampled(), "status {} should be filtered", status);
        }
    }

    #[test]
    fn test_loopback_row_is_excluded() {
        let rows = vec![
            row(IF_TYPE_SOFTWARE_LOOPBACK, MIB_IF_OPER_STATUS_OPERATIONAL, [0; 6], 5, 5),
            row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_B, 9, 9),
        ];

        let samples = samples_from_rows(rows);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].identity, "F0DEF1000001");
    }

    #[test]
    fn test_identity_uses_six_address_bytes() {
        let mut r = row(IF_TYPE_ETHERNET_CSMACD, MIB_IF_OPER_STATUS_OPERATIONAL, MAC_A, 0, 0);
        r.phys_addr[6] = 0xff;
        r.phys_addr[7] = 0xff;
        assert_eq!(r.identity(), "001A2B3C4D5E");
    }

    #[test]
    fn test_no_rows() {
        assert!(samples_from_rows(Vec::new()).is_empty());
    }

    fn ethernet_row(mac: [u8; 6], rx: u32, tx: u32) -> MibIfRow {
        // All-zero is a valid MIB_IFROW
        let mut row: MibIfRow = unsafe { std::mem::zeroed() };
        row.if_type = IF_TYPE_ETHERNET_CSMACD;
        row.oper_status = MIB_IF_OPER_STATUS_OPERATIONAL;
        row.phys_addr_len = 6;
        row.phys_addr[..6].copy_from_slice(&mac);
        row.in_octets = rx;
        row.out_octets = tx;
        row
    }

    /// Lays rows out the way GetIfTable does
    fn write_rows(buffer: &mut TableBuffer, rows: Vec<MibIfRow>) {
        let offset = offset_of!(MibIfTable, table);
        assert!(offset + rows.len() * size_of::<MibIfRow>() <= buffer.byte_len());

        buffer.words[0] = rows.len() as u32;
        let base = buffer.as_table_ptr().cast::<u8>();
        for (i, row) in rows.into_iter().enumerate() {
            unsafe {
                base.add(offset + i * size_of::<MibIfRow>())
                    .cast::<MibIfRow>()
                    .write(row)
            };
        }
    }

    fn table_bytes(rows: usize) -> u32 {
        (offset_of!(MibIfTable, table) + rows * size_of::<MibIfRow>()) as u32
    }

    #[test]
    fn test_table_that_fits_needs_one_call() {
        let mut calls = 0;
        let rows = fetch_rows(|buffer, _size| {
            calls += 1;
            write_rows(buffer, vec![ethernet_row(MAC_A, u32::MAX, 12)]);
            NO_ERROR
        })
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].in_octets, u64::from(u32::MAX));
        assert_eq!(rows[0].out_octets, 12);
        assert_eq!(rows[0].identity(), "001A2B3C4D5E");
    }

    #[test]
    fn test_insufficient_buffer_is_regrown_once() {
        let required = table_bytes(2);
        let mut calls = 0;
        let rows = fetch_rows(|buffer, size| {
            calls += 1;
            if calls == 1 {
                assert!(buffer.byte_len() < required as usize);
                *size = required;
                return ERROR_INSUFFICIENT_BUFFER;
            }
            assert!(buffer.byte_len() >= *size as usize);
            write_rows(
                buffer,
                vec![ethernet_row(MAC_A, 1, 2), ethernet_row(MAC_B, 3, 4)],
            );
            NO_ERROR
        })
        .unwrap();

        assert_eq!(calls, 2);
        let samples = samples_from_rows(rows);
        assert_eq!(
            samples,
            vec![
                InterfaceSample::new("001A2B3C4D5E", 1, 2),
                InterfaceSample::new("F0DEF1000001", 3, 4),
            ]
        );
    }

    #[test]
    fn test_second_insufficient_buffer_is_fetch_failure() {
        let mut calls = 0;
        let err = fetch_rows(|_buffer, size| {
            calls += 1;
            // The table keeps growing between calls
            *size += size_of::<MibIfRow>() as u32;
            ERROR_INSUFFICIENT_BUFFER
        })
        .unwrap_err();

        assert_eq!(calls, 2);
        assert_eq!(err.kind(), CollectionErrorKind::FetchFailure);
        assert_eq!(err.os_code(), Some(ERROR_INSUFFICIENT_BUFFER as i32));
        assert_eq!(err.backend(), BACKEND_NAME);
    }

    #[test]
    fn test_other_first_call_error_is_query_failure() {
        let mut calls = 0;
        let err = fetch_rows(|_buffer, _size| {
            calls += 1;
            87
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert_eq!(err.kind(), CollectionErrorKind::QueryFailure);
        assert_eq!(err.os_code(), Some(87));
    }

    #[test]
    fn test_entry_count_beyond_buffer_is_rejected() {
        let err = fetch_rows(|buffer, _size| {
            buffer.words[0] = 5;
            NO_ERROR
        })
        .unwrap_err();

        assert_eq!(err.kind(), CollectionErrorKind::FetchFailure);
    }

    #[test]
    fn test_empty_table() {
        let rows = fetch_rows(|buffer, _size| {
            write_rows(buffer, Vec::new());
            NO_ERROR
        })
        .unwrap();
        assert!(rows.is_empty());
    }
}
