//! Storage services for the clinic website
//!
//! Collections are kept as single JSON documents inside an object store. This crate
//! provides the blob store abstraction with its S3 and in-memory backends, the generic
//! read-modify-write document repository, and the news and patient image repositories
//! built on top of it.

pub mod blob;
pub mod document;
pub mod news;
pub mod patient_image;
