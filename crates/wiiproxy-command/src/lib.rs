//! MultiWii command descriptors and payload codec.
//!
//! A [`CommandTable`] maps each command code to a [`Descriptor`] holding the
//! payload [`Layout`]. The table is built once and never mutated; the codec
//! uses it to turn a descriptor plus [`Values`] into wire bytes and back.
//!
//! Typed records such as [`records::Attitude`] are declared with
//! [`msp_record!`], which derives the struct and its layout from the same
//! field list.

pub mod boxes;
pub mod catalog;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod layout;
pub mod record;
pub mod records;
pub mod table;

pub use boxes::{BoxActivation, BoxConfig, BoxId, BoxIds, BoxState};
pub use catalog::{codes, multiwii, DEFAULT_POLL};
pub use codec::{
    assemble, check_outgoing, decode_message, decode_values, disassemble, encode_message,
    encode_payload,
};
pub use descriptor::{Descriptor, Kind, MAX_CODE, MIN_CODE, SET_THRESHOLD};
pub use error::{CommandError, Mismatch, Result};
pub use field::{FieldType, Primitive, Value, Values};
pub use layout::Layout;
pub use record::MspRecord;
pub use table::{CommandTable, CommandTableBuilder};
