//! Record identifiers and the fixed-width title/name record.

use std::fmt;

use crate::common::config::{MOVIE_TITLE_SIZE, PERSON_NAME_SIZE, RID_SIZE};
use crate::common::{trim_padding, truncate_or_pad, Error, FixedWidth, Result};

/// Locates a stored tuple: the heap page it lives on and its slot.
///
/// The B+Tree stores `Rid`s as opaque values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_id: u32,
    pub slot_id: u32,
}

impl Rid {
    #[inline]
    pub fn new(page_id: u32, slot_id: u32) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_id, self.slot_id)
    }
}

impl FixedWidth for Rid {
    const WIDTH: usize = RID_SIZE;

    fn write_to(&self, buf: &mut [u8]) {
        self.page_id.write_to(&mut buf[..4]);
        self.slot_id.write_to(&mut buf[4..8]);
    }

    fn read_from(buf: &[u8]) -> Self {
        Self {
            page_id: u32::read_from(&buf[..4]),
            slot_id: u32::read_from(&buf[4..8]),
        }
    }
}

/// A (movie title, person name) pair with both fields held at fixed width.
///
/// Fields longer than their width are truncated, shorter ones zero padded.
#[derive(Clone, PartialEq, Eq)]
pub struct TitleNameRecord {
    title: [u8; MOVIE_TITLE_SIZE],
    name: [u8; PERSON_NAME_SIZE],
}

impl TitleNameRecord {
    pub const FIELD_COUNT: usize = 2;

    pub fn new(title: &[u8], name: &[u8]) -> Self {
        Self {
            title: truncate_or_pad(title),
            name: truncate_or_pad(name),
        }
    }

    pub fn title(&self) -> String {
        Self::text(&self.title)
    }

    pub fn name(&self) -> String {
        Self::text(&self.name)
    }

    /// Field by position: 0 is the title, 1 the name.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for any other index.
    pub fn field(&self, index: usize) -> Result<String> {
        match index {
            0 => Ok(self.title()),
            1 => Ok(self.name()),
            _ => Err(Error::InvalidArgument(format!(
                "invalid field index for TitleNameRecord: {}",
                index
            ))),
        }
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(trim_padding(bytes)).trim().to_string()
    }
}

impl fmt::Debug for TitleNameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleNameRecord")
            .field("title", &self.title())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for TitleNameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TitleNameRecord{{title={}, name={}}}",
            self.title(),
            self.name()
        )
    }
}

impl FixedWidth for TitleNameRecord {
    const WIDTH: usize = MOVIE_TITLE_SIZE + PERSON_NAME_SIZE;

    fn write_to(&self, buf: &mut [u8]) {
        buf[..MOVIE_TITLE_SIZE].copy_from_slice(&self.title);
        buf[MOVIE_TITLE_SIZE..Self::WIDTH].copy_from_slice(&self.name);
    }

    fn read_from(buf: &[u8]) -> Self {
        Self::new(&buf[..MOVIE_TITLE_SIZE], &buf[MOVIE_TITLE_SIZE..Self::WIDTH])
    }
}
