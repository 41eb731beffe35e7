//! Identifier handling: catalog object names and XML name encoding.

pub mod object_name;
pub mod xml_name;

pub use object_name::{escape_part, ObjectName};
pub use xml_name::{decode_name, encode_name};
