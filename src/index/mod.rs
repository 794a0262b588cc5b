//! Index structures stored in buffer pool pages.

pub mod btree;
