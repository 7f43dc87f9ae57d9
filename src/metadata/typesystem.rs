//! Types, fields and properties declared by the module under verification.

use crate::metadata::{
    method::MethodDef,
    references::{full_type_name, FieldReference, MethodReference, TypeReference},
    token::Token,
};

/// A field declared on a [`TypeDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// `Field` token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Simple name of the field type
    pub field_type: String,
}

/// A property declared on a [`TypeDef`], owning its accessor methods.
///
/// Accessors are not part of [`TypeDef::methods`]; they are verified through the property so
/// that violations inside them are reported against the property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// `get_<Name>` accessor
    pub getter: Option<MethodDef>,
    /// `set_<Name>` accessor
    pub setter: Option<MethodDef>,
}

impl PropertyDef {
    /// The accessors that exist, getter first.
    pub fn accessors(&self) -> impl Iterator<Item = &MethodDef> {
        self.getter.iter().chain(self.setter.iter())
    }
}

/// A type declared by the module under verification.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// `TypeDef` token
    pub token: Token,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// The direct ancestor, `None` for interfaces and `System.Object`
    pub extends: Option<TypeReference>,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Constructors and methods, in declaration order
    pub methods: Vec<MethodDef>,
    /// Declared properties
    pub properties: Vec<PropertyDef>,
}

impl TypeDef {
    /// `Namespace.Name`, or just `Name` in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        full_type_name(&self.namespace, &self.name)
    }

    /// This type as seen from a referencing instruction.
    #[must_use]
    pub fn as_reference(&self) -> TypeReference {
        TypeReference {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            scope: None,
            base: self.extends.clone().map(Box::new),
        }
    }

    /// Reference to one of this type's methods or accessors.
    #[must_use]
    pub fn method_reference(&self, method: &MethodDef, property: Option<&str>) -> MethodReference {
        MethodReference {
            declaring_type: self.as_reference(),
            name: method.name.clone(),
            return_type: method.return_type.clone(),
            property: property.map(str::to_string),
        }
    }

    /// Reference to one of this type's fields.
    #[must_use]
    pub fn field_reference(&self, field: &FieldDef) -> FieldReference {
        FieldReference::new(self.as_reference(), field.name.clone(), field.field_type.clone())
    }

    /// Number of method bodies the verifier may decode for this type, accessors included.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.methods.iter().filter(|m| m.body.is_some()).count()
            + self
                .properties
                .iter()
                .flat_map(PropertyDef::accessors)
                .filter(|m| m.body.is_some())
                .count()
    }
}
