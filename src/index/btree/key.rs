//! Key and value bounds, plus the fixed-width string key.

use std::fmt;

use crate::common::config::MOVIE_ID_SIZE;
use crate::common::{trim_padding, truncate_or_pad, FixedWidth};

/// Anything usable as a B+Tree key: totally ordered with a fixed-width slot.
pub trait IndexKey: FixedWidth + Ord + Clone + fmt::Debug {}

impl<T: FixedWidth + Ord + Clone + fmt::Debug> IndexKey for T {}

/// Anything storable as a B+Tree value. The tree never interprets values.
pub trait IndexValue: FixedWidth + Clone + fmt::Debug {}

impl<T: FixedWidth + Clone + fmt::Debug> IndexValue for T {}

/// A string key truncated or zero-padded to exactly `N` bytes.
///
/// Ordering is bytewise over the padded array, which matches string ordering
/// for keys that do not themselves contain NUL bytes.
///
/// # Example
/// ```
/// use pagetree::index::btree::FixedKey;
///
/// let a = FixedKey::<4>::from("ab");
/// let b = FixedKey::<4>::from("abc");
/// assert!(a < b);
/// assert_eq!(a.to_string(), "ab");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedKey<const N: usize>([u8; N]);

/// Key of the movie-id index, e.g. `tt0000001`.
pub type MovieId = FixedKey<MOVIE_ID_SIZE>;

impl<const N: usize> FixedKey<N> {
    pub fn new(bytes: &[u8]) -> Self {
        Self(truncate_or_pad(bytes))
    }

    /// The full padded slot.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> From<&str> for FixedKey<N> {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl<const N: usize> fmt::Display for FixedKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(trim_padding(&self.0)))
    }
}

impl<const N: usize> fmt::Debug for FixedKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl<const N: usize> FixedWidth for FixedKey<N> {
    const WIDTH: usize = N;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..N].copy_from_slice(&self.0);
    }

    fn read_from(buf: &[u8]) -> Self {
        Self::new(&buf[..N])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_id_ordering() {
        let a = MovieId::from("tt0000001");
        let b = MovieId::from("tt0000002");
        assert!(a < b);
        assert_eq!(a.to_string(), "tt0000001");
    }

    #[test]
    fn test_long_key_is_truncated() {
        let key = FixedKey::<3>::from("abcdef");
        assert_eq!(key.to_string(), "abc");
        assert_eq!(key, FixedKey::<3>::from("abc"));
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert!(FixedKey::<8>::from("tt") < FixedKey::<8>::from("tt0"));
    }

    #[test]
    fn test_debug_shows_text() {
        assert_eq!(format!("{:?}", MovieId::from("tt42")), "\"tt42\"");
    }
}
