//! Request construction
//!
//! `RequestBuilder` collects the declaration of one call; `build` merges it
//! with the global configuration into an immutable `HttpRequest`.
//! `RequestParts` is the mutable state parameters and auth managers write
//! into while building.

pub mod builder;
pub mod parts;
pub mod reference;
pub mod template;

pub use builder::RequestBuilder;
pub use parts::{FormField, FormValue, RequestParts};
