//! Page types and layout.
//!
//! - [`Page`] - The raw 4KB data container
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`MetaPage`] - Accessors for the per-space root pointer page

mod meta_page;
#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use meta_page::MetaPage;
pub use page::Page;
pub use page_header::{PageHeader, PageType};
