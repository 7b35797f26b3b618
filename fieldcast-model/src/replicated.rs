use crate::ObjectSchema;

/// Implemented by every type whose instances replicate across processes.
///
/// The replication core only ever sees an object through this trait: the
/// schema names the fields, `field` reads a stringified value, `set_field`
/// writes one back from raw text. Implementations are usually generated by
/// [`replicated!`](crate::replicated); hand-written impls work the same way
/// where field storage is not a plain struct.
pub trait Replicated: Send + Sync {
    /// The field-to-attribute mapping for this type. Every instance of a
    /// type returns the same table.
    fn schema(&self) -> &'static ObjectSchema;

    /// Current value of a field, stringified, or `None` for an unknown name.
    fn field(&self, name: &str) -> Option<String>;

    /// Overwrites a field from its raw text form. Returns `false` when the
    /// name is unknown or the text does not coerce to the field's native
    /// type; the caller skips the field and moves on.
    fn set_field(&mut self, name: &str, raw: &str) -> bool;
}
