pub trait NumExt {
    /// Returns the base 2 logarithm of the number, rounding up to the next integer.
    fn ilog2_ceil(self) -> Self;
}

impl NumExt for usize {
    #[inline]
    fn ilog2_ceil(self) -> Self {
        match self {
            0 | 1 => 0,
            n => (usize::BITS - (n - 1).leading_zeros()) as Self,
        }
    }
}

/// Returns the key of the group at `index`: `A` to `Z`, then `G27`, `G28`, ...
pub fn group_key(index: usize) -> String {
    match u8::try_from(index) {
        Ok(n) if n < 26 => char::from(b'A' + n).to_string(),
        _ => format!("G{}", index + 1),
    }
}
