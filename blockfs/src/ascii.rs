//! Fixed-width ASCII-decimal packing shared by the directory and metadata
//! regions (§3: "Layout as ASCII-decimal, null-padded fixed-width fields").
//!
//! Every field is a contiguous byte window holding the value's decimal
//! digits left-aligned, with the remainder of the window filled with NUL
//! bytes. This is wasteful compared to a binary encoding but is the
//! specification's wire-exact format (see the Design Notes on why this
//! crate keeps it rather than switching to little-endian binary).

/// Writes `value` into `field` as left-aligned ASCII decimal digits,
/// NUL-padding the remainder. Panics if `value` does not fit in
/// `field.len()` digits -- callers only ever pass values bounded by the
/// specification's own size limits, so this indicates a logic error rather
/// than bad input.
pub fn encode_decimal(value: u32, field: &mut [u8]) {
    field.fill(0);
    let s = value.to_string();
    assert!(
        s.len() <= field.len(),
        "value {value} does not fit in a {}-byte field",
        field.len()
    );
    field[..s.len()].copy_from_slice(s.as_bytes());
}

/// Parses a NUL-padded ASCII decimal field back into a `u32`. An
/// all-NUL (empty) field decodes to 0.
pub fn decode_decimal(field: &[u8]) -> u32 {
    let digits: Vec<u8> = field
        .iter()
        .copied()
        .take_while(|&b| b != 0)
        .collect();
    if digits.is_empty() {
        return 0;
    }
    let s = std::str::from_utf8(&digits).unwrap_or("0");
    s.parse().unwrap_or(0)
}

/// Reinterprets a whole block as the 128 fixed-width pointer fields an
/// indirect block packs them into (`128 * ADDR_WIDTH == BLOCK_SIZE`). A
/// plain byte-array-of-byte-arrays cast, but written through `bytemuck`
/// rather than manual offset slicing, matching how the teacher reaches for
/// it when a block buffer is really an array of smaller fixed-width
/// records.
pub fn pointer_fields(
    block: &crate::device::Block,
) -> &[[u8; crate::layout::ADDR_WIDTH]; crate::layout::POINTERS_PER_BLOCK] {
    bytemuck::cast_ref(block)
}

pub fn pointer_fields_mut(
    block: &mut crate::device::Block,
) -> &mut [[u8; crate::layout::ADDR_WIDTH]; crate::layout::POINTERS_PER_BLOCK] {
    bytemuck::cast_mut(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_zero() {
        let mut field = [0u8; 7];
        encode_decimal(0, &mut field);
        assert_eq!(decode_decimal(&field), 0);
    }

    #[test]
    fn round_trips_max_width_value() {
        let mut field = [0u8; 7];
        encode_decimal(71_680, &mut field);
        assert_eq!(&field[..5], b"71680");
        assert_eq!(field[5], 0);
        assert_eq!(decode_decimal(&field), 71_680);
    }

    #[test]
    fn pads_with_nul_not_spaces_or_zeros() {
        let mut field = [0xFFu8; 4];
        encode_decimal(12, &mut field);
        assert_eq!(field, [b'1', b'2', 0, 0]);
    }

    #[test]
    #[should_panic]
    fn rejects_values_too_wide_for_field() {
        let mut field = [0u8; 2];
        encode_decimal(123, &mut field);
    }
}
