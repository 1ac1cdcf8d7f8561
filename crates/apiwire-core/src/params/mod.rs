//! Parameter declaration and placement
//!
//! Parameters are declared per call with a location (template, query,
//! header, form, body or one of the bulk "additional" maps), validated
//! before anything is sent and written into the request state in a fixed
//! order so explicit parameters always win over bulk entries.

pub mod parameter;
pub mod serialization;
pub mod set;

pub use parameter::{Parameter, ParameterLocation, ParameterValue, ValueSerializer};
pub use serialization::{append_query, flatten_pairs, value_to_string, ArraySerialization};
pub use set::ParameterSet;
