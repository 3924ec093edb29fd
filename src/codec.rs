//! Stateless conversions between raw register bytes and their bit, flag-name
//! and numeric views.
//!
//! Multi-byte values are always little-endian: the first byte of a register
//! holds the least significant bits. Bits are numbered LSB first within each
//! byte and concatenated in register order, so bit `8 * j + i` is bit `i` of
//! byte `j`.

use bitmaps::Bitmap;

use crate::{
    error::{Error, Result},
    types::FlagNames,
};

/// Expands bytes into bits, LSB first per byte, concatenated in byte order.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| {
            let bits = Bitmap::<8>::from_value(byte);
            (0..8).map(move |i| bits.get(i))
        })
        .collect()
}

/// Packs bits back into bytes.
///
/// A trailing partial byte is zero-extended, so only byte-aligned input
/// round-trips through [`bytes_to_bits`].
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let mut byte = Bitmap::<8>::new();
            for (i, &bit) in chunk.iter().enumerate() {
                byte.set(i, bit);
            }
            byte.into_value()
        })
        .collect()
}

fn check_int_len(bytes: &[u8]) -> Result<()> {
    match bytes.len() {
        1 | 2 | 4 | 8 => Ok(()),
        size => Err(Error::InvalidSize { size }),
    }
}

/// Decodes 1, 2, 4 or 8 little-endian bytes as an unsigned integer.
pub fn to_uint(bytes: &[u8]) -> Result<u64> {
    check_int_len(bytes)?;
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

/// Decodes 1, 2, 4 or 8 little-endian bytes as a two's-complement integer.
pub fn to_int(bytes: &[u8]) -> Result<i64> {
    let raw = to_uint(bytes)?;
    let shift = 64 - 8 * bytes.len() as u32;
    // Arithmetic shift sign-extends from the top bit of the last byte.
    Ok(((raw << shift) as i64) >> shift)
}

/// Decodes little-endian IEEE-754 half, single or double precision.
pub fn to_float(bytes: &[u8]) -> Result<f64> {
    match bytes.len() {
        2 => Ok(half_to_f64(u16::from_le_bytes([bytes[0], bytes[1]]))),
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(bytes);
            Ok(f32::from_le_bytes(buf) as f64)
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(f64::from_le_bytes(buf))
        }
        size => Err(Error::InvalidSize { size }),
    }
}

fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let mantissa = f64::from(bits & 0x03ff);

    match exponent {
        0 => sign * mantissa * 2f64.powi(-24),
        0x1f if mantissa == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    }
}

/// Encodes `value` as `size` little-endian bytes.
///
/// Sizes above 8 are zero-filled past the eighth byte.
pub fn pack_uint(value: u64, size: usize) -> Result<Vec<u8>> {
    if size < 8 && value >> (8 * size) != 0 {
        return Err(Error::ValueOverflow { value, size });
    }
    let le = value.to_le_bytes();
    Ok((0..size).map(|i| le.get(i).copied().unwrap_or(0)).collect())
}

/// Encodes `value` as `size` little-endian two's-complement bytes.
///
/// Sizes above 8 are sign-extended past the eighth byte.
pub fn pack_int(value: i64, size: usize) -> Result<Vec<u8>> {
    let fits = match size {
        0 => value == 0,
        1..8 => {
            let shift = 64 - 8 * size as u32;
            (value << shift) >> shift == value
        }
        _ => true,
    };
    if !fits {
        return Err(Error::ValueOverflow {
            value: value as u64,
            size,
        });
    }
    let fill = if value < 0 { 0xff } else { 0x00 };
    let le = value.to_le_bytes();
    Ok((0..size).map(|i| le.get(i).copied().unwrap_or(fill)).collect())
}

/// Splits a flag-name string on spaces and commas, dropping empty tokens.
pub fn split_flag_names(names: &str) -> impl Iterator<Item = &str> {
    names
        .split(|c: char| c == ' ' || c == ',')
        .filter(|name| !name.is_empty())
}

/// Builds the byte mask of the bits whose positional name is in `wanted`.
///
/// Blank positional names never match.
pub fn flag_mask<S: AsRef<str>>(names: &FlagNames, wanted: &[S]) -> u8 {
    let mut mask = Bitmap::<8>::new();
    for (i, name) in names.iter().enumerate() {
        if !name.is_empty() && wanted.iter().any(|w| w.as_ref() == *name) {
            mask.set(i, true);
        }
    }
    mask.into_value()
}

/// Returns the names of all set bits joined by single spaces, in bit and
/// byte order. Bytes without a table entry and blank names contribute nothing.
pub fn active_flag_names(bytes: &[u8], table: &[FlagNames]) -> String {
    let mut active = Vec::new();
    for (&byte, names) in bytes.iter().zip(table) {
        let bits = Bitmap::<8>::from_value(byte);
        for i in &bits {
            if !names[i].is_empty() {
                active.push(names[i]);
            }
        }
    }
    active.join(" ")
}

/// Returns the first wanted name that matches no flag in `table`.
pub(crate) fn first_unmatched<'a>(table: &[FlagNames], wanted: &[&'a str]) -> Option<&'a str> {
    wanted
        .iter()
        .copied()
        .find(|w| !table.iter().any(|names| names.iter().any(|n| n == w)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[FlagNames] = &[
        ["A", "B", "", "", "", "", "", ""],
        ["C", "", "", "", "", "", "", ""],
    ];

    #[test]
    fn bits_are_lsb_first_per_byte() {
        let bits = bytes_to_bits(&[0x01, 0x80]);
        assert_eq!(bits.len(), 16);
        assert!(bits[0]);
        assert!(bits[15]);
        assert_eq!(bits.iter().filter(|&&b| b).count(), 2);
    }

    #[test]
    fn bits_to_bytes_zero_extends_partial_byte() {
        assert_eq!(bits_to_bytes(&[true, false, true]), vec![0x05]);
        assert_eq!(
            bits_to_bytes(&bytes_to_bits(&[0xA5, 0x3C])),
            vec![0xA5, 0x3C]
        );
        assert!(bits_to_bytes(&[]).is_empty());
    }

    #[test]
    fn int_decode_signed_and_unsigned() {
        let ones = [0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(to_int(&ones).unwrap(), -1);
        assert_eq!(to_uint(&ones).unwrap(), 4_294_967_295);

        assert_eq!(to_int(&[0x80]).unwrap(), -128);
        assert_eq!(to_uint(&[0x34, 0x12]).unwrap(), 0x1234);
        assert_eq!(to_int(&[0xFF; 8]).unwrap(), -1);
        assert_eq!(to_uint(&[0xFF; 8]).unwrap(), u64::MAX);
    }

    #[test]
    fn signed_and_unsigned_differ_by_modulus() {
        for bytes in [&[0x80u8][..], &[0x00, 0x80], &[0x01, 0x00, 0x00, 0xF0]] {
            let modulus = 1i128 << (8 * bytes.len());
            let diff = to_uint(bytes).unwrap() as i128 - to_int(bytes).unwrap() as i128;
            assert_eq!(diff, modulus);
        }
        assert_eq!(to_uint(&[0x7F]).unwrap() as i64, to_int(&[0x7F]).unwrap());
    }

    #[test]
    fn int_decode_rejects_odd_lengths() {
        for len in [0usize, 3, 5, 16] {
            let bytes = vec![0u8; len];
            assert!(matches!(to_int(&bytes), Err(Error::InvalidSize { size }) if size == len));
        }
    }

    #[test]
    fn float_decode() {
        assert_eq!(to_float(&1.5f32.to_le_bytes()).unwrap(), 1.5);
        assert_eq!(to_float(&(-2.25f64).to_le_bytes()).unwrap(), -2.25);
        // half: 0x3C00 = 1.0, 0xC000 = -2.0, 0x0001 = smallest subnormal
        assert_eq!(to_float(&[0x00, 0x3C]).unwrap(), 1.0);
        assert_eq!(to_float(&[0x00, 0xC0]).unwrap(), -2.0);
        assert_eq!(to_float(&[0x01, 0x00]).unwrap(), 2f64.powi(-24));
        assert!(to_float(&[0x00, 0x7C]).unwrap().is_infinite());
        assert!(to_float(&[0x00]).is_err());
    }

    #[test]
    fn pack_uint_round_trips_and_checks_width() {
        assert_eq!(pack_uint(0x1234, 2).unwrap(), vec![0x34, 0x12]);
        assert_eq!(to_uint(&pack_uint(0xDEAD_BEEF, 4).unwrap()).unwrap(), 0xDEAD_BEEF);
        assert_eq!(pack_uint(1, 10).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            pack_uint(0x100, 1),
            Err(Error::ValueOverflow { value: 0x100, size: 1 })
        ));
    }

    #[test]
    fn signed_values_round_trip() {
        assert_eq!(pack_int(-5, 4).unwrap(), vec![0xFB, 0xFF, 0xFF, 0xFF]);
        assert_eq!(pack_int(-5, 4).unwrap(), pack_uint((-5i32) as u32 as u64, 4).unwrap());

        for bytes in [&[0x80u8][..], &[0xFE, 0xFF], &[0x01, 0x00, 0x00, 0xF0], &[0xFF; 8]] {
            let value = to_int(bytes).unwrap();
            let packed = pack_int(value, bytes.len()).unwrap();
            assert_eq!(packed, bytes);
            assert_eq!(to_int(&packed).unwrap(), value);
        }

        assert_eq!(pack_int(-1, 10).unwrap(), vec![0xFF; 10]);
        assert_eq!(pack_int(127, 1).unwrap(), vec![0x7F]);
        assert!(pack_int(128, 1).is_err());
        assert!(pack_int(-129, 1).is_err());
        assert!(matches!(
            pack_int(-32_769, 2),
            Err(Error::ValueOverflow { size: 2, .. })
        ));
    }

    #[test]
    fn flag_names_split_on_space_and_comma() {
        let names: Vec<_> = split_flag_names(" A,B  C,,").collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(split_flag_names("").count(), 0);
    }

    #[test]
    fn flag_mask_ignores_blank_names() {
        assert_eq!(flag_mask(&TABLE[0], &["B"]), 0x02);
        assert_eq!(flag_mask(&TABLE[0], &["A", "B", "C"]), 0x03);
        assert_eq!(flag_mask(&TABLE[0], &[""]), 0x00);
    }

    #[test]
    fn active_flag_names_in_order() {
        assert_eq!(active_flag_names(&[0x02, 0x01], TABLE), "B C");
        // Unnamed bits are set but not listed
        assert_eq!(active_flag_names(&[0xFF, 0xFF], TABLE), "A B C");
        assert_eq!(active_flag_names(&[0x00, 0x00], TABLE), "");
    }

    #[test]
    fn first_unmatched_reports_typos() {
        assert_eq!(first_unmatched(TABLE, &["A", "C"]), None);
        assert_eq!(first_unmatched(TABLE, &["A", "X"]), Some("X"));
    }
}
