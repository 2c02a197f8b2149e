//! Bit-level numeric helpers

/// Reinterpret a 64-bit pattern as an IEEE-754 double
#[inline]
pub const fn bits_to_double(bits: u64) -> f64 {
    f64::from_bits(bits)
}

/// Reinterpret an IEEE-754 double as its 64-bit pattern
#[inline]
pub const fn double_to_bits(value: f64) -> u64 {
    value.to_bits()
}

/// Sign-extend the low `width` bytes of `value` to a full `i64`
///
/// Bits above `width` bytes are ignored. A width of 0 yields 0; widths of 8 or
/// more return the value reinterpreted as-is.
pub const fn sign_extend(value: u64, width: u32) -> i64 {
    if width == 0 {
        return 0;
    }
    if width >= 8 {
        return value as i64;
    }
    let bits = width * 8;
    let mask = (1u64 << bits) - 1;
    let value = value & mask;
    if value & (1u64 << (bits - 1)) != 0 {
        (value | !mask) as i64
    } else {
        value as i64
    }
}

/// Join two 32-bit halves into one 64-bit value
#[inline]
pub const fn join_halves(lo: u32, hi: u32) -> u64 {
    (hi as u64) << 32 | lo as u64
}

/// Split a 64-bit value into its low and high 32-bit halves
#[inline]
pub const fn split_halves(value: u64) -> (u32, u32) {
    (value as u32, (value >> 32) as u32)
}
