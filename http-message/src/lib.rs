//! HTTP/1.x message heads: parsing with `httparse`, header lookup, and the
//! framing and content-coding decisions derived from the headers.

pub mod coding;
pub mod framing;
pub mod header;
pub mod message;
mod span;
pub mod version;
