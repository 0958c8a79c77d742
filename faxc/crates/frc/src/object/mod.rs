//! Object Module - Heap Object Layout
//!
//! Every heap object starts with the same 16-byte header (see [`header`]).
//! On top of that uniform layout the language has two built-in reference
//! types:
//!
//! - [`string`]: immutable UTF-8 text, no owned pointers
//! - [`list`]: fixed-capacity list of owned references

pub mod header;
pub mod list;
pub mod string;

pub use header::{ObjectHeader, HEADER_SIZE, POINTER_SIZE};
pub use list::{list_get, list_len, list_pop, list_push, list_slots, new_list};
pub use string::{new_string, string_as_str, string_bytes, string_concat, string_len};
