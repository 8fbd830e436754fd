//! Structured-tree XML substrate
//!
//! The codec never works against raw events: wire documents are parsed into
//! a small element tree ([`tree::Element`]) and encoded back from one. The
//! tree keeps qualified names as written; decoding matches on local names so
//! that foreign prefix choices do not break round-trips.

pub mod names;
pub mod tree;

pub use tree::Element;
