//! Schema mapping for FieldCast.
//!
//! Defines how a replicated object type exposes its fields to the
//! replication core:
//! - [`Replicated`]: implemented by every mirrorable type; stringified field
//!   access over a static per-type schema
//! - [`ObjectSchema`] / [`SchemaBuilder`]: the field-to-attribute table,
//!   declared once per type (default attribute = field name lower-cased,
//!   overridable per field)
//! - [`replicated!`]: declares a plain struct together with its generated
//!   `Replicated` impl
//!
//! Persisted and broadcast values are flat text regardless of a field's
//! native type; typed fields round-trip through `Display`/`FromStr` at this
//! boundary and the core never sees anything but strings.

mod macros;
mod replicated;
mod schema;

pub use replicated::Replicated;
pub use schema::{FieldDef, ObjectSchema, SchemaBuilder};

/// Errors raised while constructing a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Two distinct fields resolved to the same attribute name. Fatal at
    /// mapping-construction time, never at save time.
    #[error(
        "duplicate attribute {attribute:?} in schema for {type_name}: \
         fields {first:?} and {second:?} both map to it"
    )]
    DuplicateAttribute {
        type_name: String,
        attribute: String,
        first: String,
        second: String,
    },
}
