//! Low-level byte access for method bodies.
//!
//! - [`io`] - the [`io::CilIO`] trait and free-standing little-endian readers
//! - [`parser`] - the [`parser::Parser`] cursor used by the instruction decoder

pub mod io;
pub mod parser;
