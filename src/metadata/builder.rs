//! Fluent construction of [`Module`] values.
//!
//! Hosts that already have a metadata loader build [`Module`] directly. [`ModuleBuilder`]
//! serves hosts with a thinner loader and tests: it hands out tokens the way a metadata
//! writer allocates rows, one counter per table, so the code bytes emitted for a method can
//! embed the tokens returned here.
//!
//! Methods, fields and properties attach to the most recently added type, the same ownership
//! rule the `TypeDef` table's method and field lists follow.
//!
//! # Examples
//!
//! ```rust
//! use cilguard::metadata::builder::{MethodDefBuilder, ModuleBuilder, TypeDefBuilder};
//! use cilguard::metadata::identity::AssemblyIdentity;
//! use cilguard::metadata::references::{MethodReference, TypeReference};
//!
//! let mut builder = ModuleBuilder::new(AssemblyIdentity::simple("MyPlugin"));
//! let io = AssemblyIdentity::simple("System.IO");
//! let delete = builder.member_ref(MethodReference::new(
//!     TypeReference::new("System.IO", "File").with_scope(io),
//!     "Delete",
//!     "Void",
//! ));
//!
//! TypeDefBuilder::new().namespace("MyPlugin").name("Main").build(&mut builder)?;
//!
//! let mut code = vec![0x28]; // call
//! code.extend_from_slice(&delete.value().to_le_bytes());
//! code.push(0x2A); // ret
//! MethodDefBuilder::new().name("Run").public().code(code).build(&mut builder)?;
//!
//! let module = builder.build();
//! assert_eq!(module.types().len(), 1);
//! assert!(module.resolve(delete).is_some());
//! # Ok::<(), cilguard::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    metadata::{
        identity::AssemblyIdentity,
        method::{MethodAccess, MethodAttributes, MethodBody, MethodDef, MethodKind, MethodModifiers},
        module::Module,
        references::{FieldReference, MethodReference, Reference, TypeReference},
        token::{
            Token, TABLE_FIELD, TABLE_MEMBER_REF, TABLE_METHOD_DEF, TABLE_METHOD_SPEC,
            TABLE_TYPE_DEF, TABLE_TYPE_REF, TABLE_TYPE_SPEC,
        },
        typesystem::{FieldDef, PropertyDef, TypeDef},
    },
    Result,
};

/// Collects types and references and allocates their tokens.
#[derive(Debug)]
pub struct ModuleBuilder {
    assembly: AssemblyIdentity,
    types: Vec<TypeDef>,
    references: HashMap<Token, Reference>,
    rids: HashMap<u8, u32>,
}

impl ModuleBuilder {
    /// Start a module belonging to `assembly`.
    #[must_use]
    pub fn new(assembly: AssemblyIdentity) -> Self {
        ModuleBuilder {
            assembly,
            types: Vec::new(),
            references: HashMap::new(),
            rids: HashMap::new(),
        }
    }

    /// Allocate the next row of `table`. Rows start at 1.
    fn next_token(&mut self, table: u8) -> Token {
        let rid = self.rids.entry(table).or_insert(0);
        *rid += 1;
        Token::from_parts(table, *rid)
    }

    fn add_reference(&mut self, table: u8, reference: Reference) -> Token {
        let token = self.next_token(table);
        self.references.insert(token, reference);
        token
    }

    /// Add a `TypeRef` row.
    pub fn type_ref(&mut self, reference: TypeReference) -> Token {
        self.add_reference(TABLE_TYPE_REF, Reference::Type(reference))
    }

    /// Add a `TypeSpec` row, resolving to the generic definition it instantiates.
    pub fn type_spec(&mut self, reference: TypeReference) -> Token {
        self.add_reference(TABLE_TYPE_SPEC, Reference::Type(reference))
    }

    /// Add a `MemberRef` row referencing a method.
    pub fn member_ref(&mut self, reference: MethodReference) -> Token {
        self.add_reference(TABLE_MEMBER_REF, Reference::Method(reference))
    }

    /// Add a `MemberRef` row referencing a field.
    pub fn field_ref(&mut self, reference: FieldReference) -> Token {
        self.add_reference(TABLE_MEMBER_REF, Reference::Field(reference))
    }

    /// Add a `MethodSpec` row, resolving to the generic method it instantiates.
    pub fn method_spec(&mut self, reference: MethodReference) -> Token {
        self.add_reference(TABLE_METHOD_SPEC, Reference::Method(reference))
    }

    /// Register `reference` under an arbitrary token, replacing any previous entry.
    pub fn reference(&mut self, token: Token, reference: Reference) -> &mut Self {
        self.references.insert(token, reference);
        self
    }

    fn current_type(&mut self, what: &str) -> Result<&mut TypeDef> {
        self.types
            .last_mut()
            .ok_or_else(|| malformed_error!("{} requires a declaring TypeDef", what))
    }

    /// Finish the module.
    #[must_use]
    pub fn build(self) -> Module {
        Module::new(self.assembly, self.types, self.references)
    }
}

/// Builder for a [`TypeDef`].
#[derive(Debug, Default)]
pub struct TypeDefBuilder {
    name: Option<String>,
    namespace: Option<String>,
    extends: Option<TypeReference>,
}

impl TypeDefBuilder {
    /// Creates a new `TypeDefBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the type name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the type namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the base type that this type extends.
    #[must_use]
    pub fn extends(mut self, extends: TypeReference) -> Self {
        self.extends = Some(extends);
        self
    }

    /// Add the type to `module` and return its `TypeDef` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no name was set.
    pub fn build(self, module: &mut ModuleBuilder) -> Result<Token> {
        let name = self
            .name
            .ok_or_else(|| malformed_error!("TypeDef name is required"))?;

        let token = module.next_token(TABLE_TYPE_DEF);
        module.types.push(TypeDef {
            token,
            namespace: self.namespace.unwrap_or_default(),
            name,
            extends: self.extends,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        });

        Ok(token)
    }
}

/// Builder for a [`MethodDef`].
///
/// Defaults to a public, `HideBySig` method returning `Void` without a body.
#[derive(Debug, Default)]
pub struct MethodDefBuilder {
    name: Option<String>,
    return_type: Option<String>,
    access: Option<MethodAccess>,
    modifiers: MethodModifiers,
    body: Option<MethodBody>,
}

impl MethodDefBuilder {
    /// Creates a new `MethodDefBuilder`.
    #[must_use]
    pub fn new() -> Self {
        MethodDefBuilder {
            modifiers: MethodModifiers::HIDE_BY_SIG,
            ..Self::default()
        }
    }

    /// Sets the method name. `.ctor` and `.cctor` make the method a constructor.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the simple name of the return type.
    #[must_use]
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Sets the raw `MethodAttributes` word, replacing access and modifiers.
    #[must_use]
    pub fn flags(mut self, flags: u16) -> Self {
        let attributes = MethodAttributes::from_bits(flags);
        self.access = Some(attributes.access);
        self.modifiers = attributes.modifiers;
        self
    }

    /// Sets the member access.
    #[must_use]
    pub fn access(mut self, access: MethodAccess) -> Self {
        self.access = Some(access);
        self
    }

    /// Shorthand for `access(MethodAccess::Public)`.
    #[must_use]
    pub fn public(self) -> Self {
        self.access(MethodAccess::Public)
    }

    /// Shorthand for `access(MethodAccess::Private)`.
    #[must_use]
    pub fn private(self) -> Self {
        self.access(MethodAccess::Private)
    }

    /// Adds modifier flags.
    #[must_use]
    pub fn modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Shorthand for `modifiers(MethodModifiers::STATIC)`.
    #[must_use]
    pub fn static_method(self) -> Self {
        self.modifiers(MethodModifiers::STATIC)
    }

    /// Sets an already parsed body.
    #[must_use]
    pub fn body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the body from raw IL code, without a method header.
    #[must_use]
    pub fn code(self, code: impl Into<Vec<u8>>) -> Self {
        self.body(MethodBody::from_code(code))
    }

    fn finish(self, token: Token) -> Result<MethodDef> {
        let name = self
            .name
            .ok_or_else(|| malformed_error!("MethodDef name is required"))?;
        let kind = MethodKind::from_name(&name);

        Ok(MethodDef {
            token,
            return_type: self.return_type.unwrap_or_else(|| "Void".to_string()),
            kind,
            name,
            attributes: MethodAttributes::new(
                self.access.unwrap_or(MethodAccess::Public),
                self.modifiers,
            ),
            body: self.body,
        })
    }

    /// Add the method to the last type of `module` and return its `MethodDef` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no name was set or no type was added yet.
    pub fn build(self, module: &mut ModuleBuilder) -> Result<Token> {
        module.current_type("MethodDef")?;
        let token = module.next_token(TABLE_METHOD_DEF);
        let method = self.finish(token)?;
        module.current_type("MethodDef")?.methods.push(method);
        Ok(token)
    }
}

/// Builder for a [`FieldDef`].
#[derive(Debug, Default)]
pub struct FieldDefBuilder {
    name: Option<String>,
    field_type: Option<String>,
}

impl FieldDefBuilder {
    /// Creates a new `FieldDefBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the simple name of the field type.
    #[must_use]
    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Add the field to the last type of `module` and return its `Field` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no name or type was set, or no type was added yet.
    pub fn build(self, module: &mut ModuleBuilder) -> Result<Token> {
        let name = self
            .name
            .ok_or_else(|| malformed_error!("Field name is required"))?;
        let field_type = self
            .field_type
            .ok_or_else(|| malformed_error!("Field type is required"))?;

        module.current_type("Field")?;
        let token = module.next_token(TABLE_FIELD);
        module.current_type("Field")?.fields.push(FieldDef {
            token,
            name,
            field_type,
        });
        Ok(token)
    }
}

/// Builder for a [`PropertyDef`] and its accessors.
#[derive(Debug, Default)]
pub struct PropertyDefBuilder {
    name: Option<String>,
    getter: Option<MethodDefBuilder>,
    setter: Option<MethodDefBuilder>,
}

impl PropertyDefBuilder {
    /// Creates a new `PropertyDefBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the property name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the getter. Without an explicit name it is called `get_<Name>`.
    #[must_use]
    pub fn getter(mut self, getter: MethodDefBuilder) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Sets the setter. Without an explicit name it is called `set_<Name>`.
    #[must_use]
    pub fn setter(mut self, setter: MethodDefBuilder) -> Self {
        self.setter = Some(setter);
        self
    }

    fn accessor(
        module: &mut ModuleBuilder,
        builder: Option<MethodDefBuilder>,
        default_name: String,
    ) -> Result<Option<MethodDef>> {
        let Some(mut builder) = builder else {
            return Ok(None);
        };
        if builder.name.is_none() {
            builder.name = Some(default_name);
        }
        builder.modifiers |= MethodModifiers::SPECIAL_NAME;

        let token = module.next_token(TABLE_METHOD_DEF);
        builder.finish(token).map(Some)
    }

    /// Add the property to the last type of `module`. Returns the accessor tokens, getter
    /// first.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no name was set or no type was added yet.
    pub fn build(self, module: &mut ModuleBuilder) -> Result<Vec<Token>> {
        let name = self
            .name
            .ok_or_else(|| malformed_error!("Property name is required"))?;
        module.current_type("Property")?;

        let getter = Self::accessor(module, self.getter, format!("get_{}", name))?;
        let setter = Self::accessor(module, self.setter, format!("set_{}", name))?;

        let property = PropertyDef {
            name,
            getter,
            setter,
        };
        let tokens = property.accessors().map(|m| m.token).collect();
        module.current_type("Property")?.properties.push(property);
        Ok(tokens)
    }
}
