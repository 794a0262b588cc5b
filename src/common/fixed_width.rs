//! Fixed-width binary encoding for keys, values and page ids.

/// A type that always serializes to exactly `WIDTH` bytes.
///
/// Index pages store keys, child ids and values in fixed slots, so every type
/// placed in a page implements this trait. Integers are little-endian.
pub trait FixedWidth: Sized {
    /// Serialized size in bytes.
    const WIDTH: usize;

    /// Write `self` into `buf[..WIDTH]`.
    ///
    /// # Panics
    /// Panics if `buf.len() < WIDTH`.
    fn write_to(&self, buf: &mut [u8]);

    /// Read a value back from `buf[..WIDTH]`.
    ///
    /// # Panics
    /// Panics if `buf.len() < WIDTH`.
    fn read_from(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_width_int {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_to(&self, buf: &mut [u8]) {
                    buf[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_from(buf: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(&buf[..Self::WIDTH]);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_fixed_width_int!(u16, u32, u64, i32, i64);

/// Copy `src` into a zero-padded array, truncating anything past `N` bytes.
pub fn truncate_or_pad<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = src.len().min(N);
    out[..len].copy_from_slice(&src[..len]);
    out
}

/// Strip the zero padding added by [`truncate_or_pad`].
pub fn trim_padding(src: &[u8]) -> &[u8] {
    let end = src.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &src[..end]
}
