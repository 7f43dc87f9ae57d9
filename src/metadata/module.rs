//! The unit of code handed to the verifier.

use std::collections::HashMap;

use crate::metadata::{
    identity::AssemblyIdentity, references::Reference, token::Token, typesystem::TypeDef,
};

/// An already-loaded plugin module: its assembly identity, its declared types in declaration
/// order and the table that resolves the tokens its method bodies use.
///
/// The module's own `TypeDef`, `MethodDef` and `Field` tokens are indexed on construction, so
/// instructions calling into the plugin itself resolve without the host registering them.
#[derive(Debug, Clone)]
pub struct Module {
    assembly: AssemblyIdentity,
    types: Vec<TypeDef>,
    references: HashMap<Token, Reference>,
}

impl Module {
    /// Assemble a module.
    ///
    /// Entries in `references` take precedence over the module's own definitions for the same
    /// token.
    #[must_use]
    pub fn new(
        assembly: AssemblyIdentity,
        types: Vec<TypeDef>,
        mut references: HashMap<Token, Reference>,
    ) -> Self {
        for ty in &types {
            references
                .entry(ty.token)
                .or_insert_with(|| Reference::Type(ty.as_reference()));

            for field in &ty.fields {
                references
                    .entry(field.token)
                    .or_insert_with(|| Reference::Field(ty.field_reference(field)));
            }

            for method in &ty.methods {
                references
                    .entry(method.token)
                    .or_insert_with(|| Reference::Method(ty.method_reference(method, None)));
            }

            for property in &ty.properties {
                for accessor in property.accessors() {
                    references.entry(accessor.token).or_insert_with(|| {
                        Reference::Method(ty.method_reference(accessor, Some(&property.name)))
                    });
                }
            }
        }

        Module {
            assembly,
            types,
            references,
        }
    }

    /// Identity of the assembly this module belongs to.
    #[must_use]
    pub fn assembly(&self) -> &AssemblyIdentity {
        &self.assembly
    }

    /// Declared types, in declaration order.
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Resolve a symbol token used by an instruction.
    #[must_use]
    pub fn resolve(&self, token: Token) -> Option<&Reference> {
        self.references.get(&token)
    }

    /// Number of resolvable tokens, own definitions included.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        method::{MethodAttributes, MethodDef, MethodKind},
        references::{MethodReference, TypeReference},
        token::{TABLE_METHOD_DEF, TABLE_TYPE_DEF},
        typesystem::PropertyDef,
    };

    fn accessor(row: u32) -> MethodDef {
        MethodDef {
            token: Token::from_parts(TABLE_METHOD_DEF, row),
            name: "get_Name".to_string(),
            return_type: "String".to_string(),
            kind: MethodKind::Method,
            attributes: MethodAttributes::default(),
            body: None,
        }
    }

    #[test]
    fn own_definitions_resolve() {
        let ty = TypeDef {
            token: Token::from_parts(TABLE_TYPE_DEF, 2),
            namespace: "Plugin".to_string(),
            name: "Main".to_string(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: vec![PropertyDef {
                name: "Name".to_string(),
                getter: Some(accessor(1)),
                setter: None,
            }],
        };
        let module = Module::new(AssemblyIdentity::simple("Plugin"), vec![ty], HashMap::new());

        assert_eq!(module.reference_count(), 2);
        match module.resolve(Token::from_parts(TABLE_METHOD_DEF, 1)) {
            Some(Reference::Method(method)) => {
                assert_eq!(method.property.as_deref(), Some("Name"));
                assert_eq!(method.declaring_type.full_name(), "Plugin.Main");
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
        assert!(module.resolve(Token::from_parts(TABLE_METHOD_DEF, 9)).is_none());
    }

    #[test]
    fn explicit_references_win() {
        let token = Token::from_parts(TABLE_TYPE_DEF, 2);
        let ty = TypeDef {
            token,
            namespace: "Plugin".to_string(),
            name: "Main".to_string(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        };
        let override_ref = Reference::Method(MethodReference::new(
            TypeReference::new("System", "Object"),
            "ToString",
            "String",
        ));
        let module = Module::new(
            AssemblyIdentity::simple("Plugin"),
            vec![ty],
            HashMap::from([(token, override_ref.clone())]),
        );

        assert_eq!(module.resolve(token), Some(&override_ref));
    }
}
