//! Small building blocks shared by the bodycheck crates: a read buffer that
//! never over-reads the socket, byte formatting for logs, and RFC 9110
//! character tables.

pub mod buffer;
pub mod debug;
pub mod parse;
