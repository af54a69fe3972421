//! Readers over a finalized buffer.
//!
//! [`PositionalReader`] gives `O(1)` random access once header 0 has been
//! decoded. [`SequentialReader`] walks the header table with a cursor,
//! which is what the schema engine and generic decoder need for
//! peek-before-consume and nested descent.

mod positional;
mod sequential;

pub use positional::PositionalReader;
pub use sequential::SequentialReader;
