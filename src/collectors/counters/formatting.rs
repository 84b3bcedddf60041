//! Formatting utilities for interface counters
//!
//! Human-readable byte totals for the CLI, and the fixed-width hexadecimal
//! rendering used as the Windows interface identity.

/// Number of hardware address bytes rendered into an identity
pub const HARDWARE_ADDRESS_LEN: usize = 6;

/// Formats byte counters with appropriate units
///
/// Converts raw byte counts into human-readable format with binary unit
/// prefixes (B, KB, MB, GB, TB).
///
/// # Examples
///
/// ```
/// use kaipo_counters::collectors::counters::formatting::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1048576), "1.00 MB");
/// assert_eq!(format_bytes(1073741824), "1.00 GB");
/// assert_eq!(format_bytes(1099511627776), "1.00 TB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;

    if value < KB {
        format!("{} B", bytes)
    } else if value < KB * KB {
        format!("{:.2} KB", value / KB)
    } else if value < KB * KB * KB {
        format!("{:.2} MB", value / (KB * KB))
    } else if value < KB * KB * KB * KB {
        format!("{:.2} GB", value / (KB * KB * KB))
    } else {
        format!("{:.2} TB", value / (KB * KB * KB * KB))
    }
}

/// Renders the first [`HARDWARE_ADDRESS_LEN`] bytes of a hardware address as
/// uppercase hex with no separators
///
/// Missing trailing bytes are rendered as `00` so the result is always
/// `2 * HARDWARE_ADDRESS_LEN` characters wide.
///
/// ```
/// use kaipo_counters::collectors::counters::formatting::format_hardware_address;
///
/// assert_eq!(format_hardware_address(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]), "001A2B3C4D5E");
/// assert_eq!(format_hardware_address(&[0xff]), "FF0000000000");
/// ```
pub fn format_hardware_address(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(HARDWARE_ADDRESS_LEN * 2);
    for i in 0..HARDWARE_ADDRESS_LEN {
        let byte = bytes.get(i).copied().unwrap_or(0);
        out.push_str(&format!("{:02X}", byte));
    }
    out
}
