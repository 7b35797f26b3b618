use std::collections::HashMap;

use crate::SchemaError;

/// One replicated field: the in-memory name and the external attribute it
/// maps to in the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub attribute: String,
}

/// Field-to-attribute mapping for one replicated object type.
///
/// The mapping is total and injective: every declared field maps to exactly
/// one attribute and no two fields share one. It is identical for every
/// instance of the type; `Replicated::schema` impls build it once and cache
/// it in a `static`.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    type_name: String,
    fields: Vec<FieldDef>,
    by_attribute: HashMap<String, usize>,
}

impl ObjectSchema {
    /// Starts a schema for `type_name`.
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of mapped fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the schema maps no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by its in-memory name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Looks up a field by its external attribute name.
    #[must_use]
    pub fn field_by_attribute(&self, attribute: &str) -> Option<&FieldDef> {
        self.by_attribute
            .get(attribute)
            .map(|&index| &self.fields[index])
    }
}

/// Accumulates field declarations for an [`ObjectSchema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Declares a field whose attribute is its name lower-cased.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let attribute = name.to_lowercase();
        self.fields.push(FieldDef { name, attribute });
        self
    }

    /// Declares a field with an explicit attribute override.
    #[must_use]
    pub fn field_as(mut self, name: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            attribute: attribute.into(),
        });
        self
    }

    /// Validates injectivity and produces the schema.
    pub fn build(self) -> Result<ObjectSchema, SchemaError> {
        let mut by_attribute = HashMap::with_capacity(self.fields.len());
        for (index, field) in self.fields.iter().enumerate() {
            if let Some(previous) = by_attribute.insert(field.attribute.clone(), index) {
                return Err(SchemaError::DuplicateAttribute {
                    type_name: self.type_name.clone(),
                    attribute: field.attribute.clone(),
                    first: self.fields[previous].name.clone(),
                    second: field.name.clone(),
                });
            }
        }
        Ok(ObjectSchema {
            type_name: self.type_name,
            fields: self.fields,
            by_attribute,
        })
    }
}
