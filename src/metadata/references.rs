//! Symbols a method body can reference through a metadata token.
//!
//! Every symbol-bearing token in an instruction stream (`TypeRef`, `TypeDef`, `TypeSpec`,
//! `MemberRef`, `MethodDef`, `MethodSpec`, `Field`) resolves to one [`Reference`]. References
//! are plain data: they carry names and the defining assembly, never a handle back into a
//! loaded module, so they can be produced by any host loader.

use std::fmt;

use crate::metadata::{identity::AssemblyIdentity, method::MethodKind};

/// Join a namespace and a simple name into a full type name.
pub(crate) fn full_type_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// A reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name (for nested types, `Outer/Inner`)
    pub name: String,
    /// Defining assembly, `None` when the type is defined by the module under verification
    pub scope: Option<AssemblyIdentity>,
    /// The direct ancestor, when known
    pub base: Option<Box<TypeReference>>,
}

impl TypeReference {
    /// Reference a type by namespace and name, with no known scope or base.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeReference {
            namespace: namespace.into(),
            name: name.into(),
            scope: None,
            base: None,
        }
    }

    /// Set the defining assembly.
    #[must_use]
    pub fn with_scope(mut self, scope: AssemblyIdentity) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set the direct ancestor.
    #[must_use]
    pub fn with_base(mut self, base: TypeReference) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    /// `Namespace.Name`, or just `Name` in the global namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        full_type_name(&self.namespace, &self.name)
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A reference to a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
    /// The type declaring the method
    pub declaring_type: TypeReference,
    /// Method name (`.ctor` / `.cctor` for constructors)
    pub name: String,
    /// Simple name of the return type (`Void` for constructors)
    pub return_type: String,
    /// Name of the property this method is an accessor of, if any
    pub property: Option<String>,
}

impl MethodReference {
    /// Reference a method on `declaring_type`.
    pub fn new(
        declaring_type: TypeReference,
        name: impl Into<String>,
        return_type: impl Into<String>,
    ) -> Self {
        MethodReference {
            declaring_type,
            name: name.into(),
            return_type: return_type.into(),
            property: None,
        }
    }

    /// Reference the instance constructor of `declaring_type`.
    pub fn constructor(declaring_type: TypeReference) -> Self {
        Self::new(declaring_type, ".ctor", "Void")
    }

    /// Mark this method as the getter or setter of `property`.
    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Returns `true` for `.ctor` / `.cctor`.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        MethodKind::from_name(&self.name) == MethodKind::Constructor
    }
}

/// A reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    /// The type declaring the field
    pub declaring_type: TypeReference,
    /// Field name
    pub name: String,
    /// Simple name of the field type
    pub field_type: String,
}

impl FieldReference {
    /// Reference a field on `declaring_type`.
    pub fn new(
        declaring_type: TypeReference,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        FieldReference {
            declaring_type,
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// What a symbol token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// `TypeRef`, `TypeDef` or `TypeSpec`
    Type(TypeReference),
    /// `MethodDef`, `MemberRef` to a method, or `MethodSpec`
    Method(MethodReference),
    /// `Field` or `MemberRef` to a field
    Field(FieldReference),
}

impl Reference {
    /// The assembly that defines the referenced symbol, `None` for the module's own symbols.
    #[must_use]
    pub fn scope(&self) -> Option<&AssemblyIdentity> {
        match self {
            Reference::Type(ty) => ty.scope.as_ref(),
            Reference::Method(method) => method.declaring_type.scope.as_ref(),
            Reference::Field(field) => field.declaring_type.scope.as_ref(),
        }
    }
}

impl From<TypeReference> for Reference {
    fn from(reference: TypeReference) -> Self {
        Reference::Type(reference)
    }
}

impl From<MethodReference> for Reference {
    fn from(reference: MethodReference) -> Self {
        Reference::Method(reference)
    }
}

impl From<FieldReference> for Reference {
    fn from(reference: FieldReference) -> Self {
        Reference::Field(reference)
    }
}
