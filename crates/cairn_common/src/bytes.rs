//! Little-endian field accessors over raw byte buffers.
//!
//! Every binary structure in a cache file is read and written field by field
//! through these helpers. Reads return `None` and writes return `false` when
//! the field would run past the end of the buffer.

/// Reads a little-endian `u16` at `offset`.
pub fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Reads a little-endian `u32` at `offset`.
pub fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads a little-endian IEEE-754 `f32` at `offset`.
pub fn read_f32(data: &[u8], offset: usize) -> Option<f32> {
    read_u32(data, offset).map(f32::from_bits)
}

/// Writes a little-endian `u16` at `offset`.
pub fn write_u16(data: &mut [u8], offset: usize, value: u16) -> bool {
    write_slice(data, offset, &value.to_le_bytes())
}

/// Writes a little-endian `u32` at `offset`.
pub fn write_u32(data: &mut [u8], offset: usize, value: u32) -> bool {
    write_slice(data, offset, &value.to_le_bytes())
}

/// Writes a little-endian IEEE-754 `f32` at `offset`.
pub fn write_f32(data: &mut [u8], offset: usize, value: f32) -> bool {
    write_u32(data, offset, value.to_bits())
}

/// Copies `value` into `data` at `offset`.
pub fn write_slice(data: &mut [u8], offset: usize, value: &[u8]) -> bool {
    let Some(end) = offset.checked_add(value.len()) else {
        return false;
    };
    match data.get_mut(offset..end) {
        Some(dst) => {
            dst.copy_from_slice(value);
            true
        }
        None => false,
    }
}

/// Reads a fixed-width, NUL-padded string field.
pub fn read_fixed_str(data: &[u8], offset: usize, width: usize) -> Option<String> {
    let raw = data.get(offset..offset.checked_add(width)?)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Some(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Writes `value` into a fixed-width field, truncating so that at least one
/// terminating NUL remains, and zero-filling the rest.
pub fn write_fixed_str(data: &mut [u8], offset: usize, width: usize, value: &str) -> bool {
    let Some(end) = offset.checked_add(width) else {
        return false;
    };
    let Some(dst) = data.get_mut(offset..end) else {
        return false;
    };
    dst.fill(0);
    let len = value.len().min(width.saturating_sub(1));
    dst[..len].copy_from_slice(&value.as_bytes()[..len]);
    true
}

/// Rounds `value` up to the next multiple of `align` (a power of two).
///
/// Returns `None` if the result does not fit in a `u64`.
pub fn align_up(value: u64, align: u64) -> Option<u64> {
    debug_assert!(align.is_power_of_two());
    Some(value.checked_add(align - 1)? & !(align - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_roundtrip() {
        let mut buf = [0u8; 8];
        assert!(write_u32(&mut buf, 4, 0xDEAD_BEEF));
        assert_eq!(buf[4..], [0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(read_u32(&buf, 4), Some(0xDEAD_BEEF));
    }

    #[test]
    fn out_of_bounds() {
        let mut buf = [0u8; 4];
        assert_eq!(read_u32(&buf, 1), None);
        assert_eq!(read_u16(&buf, usize::MAX), None);
        assert!(!write_u32(&mut buf, 2, 1));
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn f32_field() {
        let mut buf = [0u8; 4];
        write_f32(&mut buf, 0, 360.0);
        assert_eq!(read_f32(&buf, 0), Some(360.0));
    }

    #[test]
    fn fixed_str_truncates_and_pads() {
        let mut buf = [0xAAu8; 8];
        assert!(write_fixed_str(&mut buf, 0, 4, "bloodgulch"));
        assert_eq!(&buf[..4], b"blo\0");
        assert_eq!(buf[4], 0xAA);
        assert_eq!(read_fixed_str(&buf, 0, 4).as_deref(), Some("blo"));
    }

    #[test]
    fn align_up_values() {
        assert_eq!(align_up(0, 4), Some(0));
        assert_eq!(align_up(1, 4), Some(4));
        assert_eq!(align_up(0x800, 16), Some(0x800));
        assert_eq!(align_up(0x801, 0x1000), Some(0x1000));
        assert_eq!(align_up(u64::MAX, 2), None);
    }
}
