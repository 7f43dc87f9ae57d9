//! The symbol classifier: references and definitions in, [`SymbolDescriptor`]s out.
//!
//! Every function here is total. Any reference a module can produce maps to exactly one
//! descriptor variant.

use std::collections::BTreeSet;

use crate::{
    disassembler::Instruction,
    metadata::{
        identity::AssemblyIdentity,
        method::{MethodAttribute, MethodDef},
        references::{FieldReference, MethodReference, Reference, TypeReference},
        typesystem::{FieldDef, PropertyDef, TypeDef},
    },
    sandbox::descriptor::{
        AssemblyRef, AttributeMaskRef, FieldRef, MethodRef, MethodRole, OperandOwner, OperandRef,
        PropertyRef, SymbolDescriptor, TypeRef,
    },
};

/// Describe an assembly.
#[must_use]
pub fn classify_assembly(identity: &AssemblyIdentity) -> SymbolDescriptor {
    SymbolDescriptor::AssemblyRef(AssemblyRef::new(identity.clone()))
}

fn type_ref(reference: &TypeReference) -> TypeRef {
    TypeRef {
        full_name: reference.full_name(),
        declared_base_type: reference.base.as_ref().map(|base| base.full_name()),
        base_scope: reference.base.as_ref().and_then(|base| base.scope.clone()),
        scope: reference.scope.clone(),
        on_base: false,
    }
}

fn method_ref(reference: &MethodReference) -> MethodRef {
    MethodRef {
        declaring_type_name: reference.declaring_type.full_name(),
        method_name: reference.name.clone(),
        return_type_name: reference.return_type.clone(),
        is_constructor: reference.is_constructor(),
        scope: reference.declaring_type.scope.clone(),
    }
}

fn field_ref(reference: &FieldReference) -> FieldRef {
    FieldRef {
        declaring_type_name: reference.declaring_type.full_name(),
        field_name: reference.name.clone(),
        field_type_name: reference.field_type.clone(),
        scope: reference.declaring_type.scope.clone(),
    }
}

/// Describe a type reference.
#[must_use]
pub fn classify_type_reference(reference: &TypeReference) -> SymbolDescriptor {
    SymbolDescriptor::TypeRef(type_ref(reference))
}

/// Describe a method reference. Accessor references become a [`PropertyRef`].
#[must_use]
pub fn classify_method_reference(reference: &MethodReference) -> SymbolDescriptor {
    let method = method_ref(reference);
    match &reference.property {
        Some(property_name) => SymbolDescriptor::PropertyRef(PropertyRef {
            property_name: property_name.clone(),
            accessor: method,
        }),
        None => SymbolDescriptor::MethodRef(method),
    }
}

/// Describe a field reference.
#[must_use]
pub fn classify_field_reference(reference: &FieldReference) -> SymbolDescriptor {
    SymbolDescriptor::FieldRef(field_ref(reference))
}

/// Describe whatever a resolved token points at.
#[must_use]
pub fn classify_reference(reference: &Reference) -> SymbolDescriptor {
    match reference {
        Reference::Type(ty) => classify_type_reference(ty),
        Reference::Method(method) => classify_method_reference(method),
        Reference::Field(field) => classify_field_reference(field),
    }
}

/// Describe a type declared by the module, with its direct ancestor.
#[must_use]
pub fn classify_type(ty: &TypeDef) -> SymbolDescriptor {
    classify_type_reference(&ty.as_reference())
}

/// Describe a type whose ancestor matched a rule; the label gains `on <Base>`.
#[must_use]
pub fn classify_type_on_base(ty: &TypeDef) -> SymbolDescriptor {
    let mut descriptor = type_ref(&ty.as_reference());
    descriptor.on_base = true;
    SymbolDescriptor::TypeRef(descriptor)
}

/// Describe a method or constructor declared by the module.
#[must_use]
pub fn classify_method(ty: &TypeDef, method: &MethodDef) -> MethodRef {
    method_ref(&ty.method_reference(method, None))
}

/// Describe a field declared by the module.
#[must_use]
pub fn classify_field(ty: &TypeDef, field: &FieldDef) -> FieldRef {
    field_ref(&ty.field_reference(field))
}

/// Describe an accessor of a property declared by the module.
#[must_use]
pub fn classify_property(ty: &TypeDef, property: &PropertyDef, accessor: &MethodDef) -> PropertyRef {
    PropertyRef {
        property_name: property.name.clone(),
        accessor: classify_method(ty, accessor),
    }
}

/// Describe required attributes that were absent.
#[must_use]
pub fn classify_attributes(
    applies_to: MethodRole,
    missing: impl IntoIterator<Item = MethodAttribute>,
) -> SymbolDescriptor {
    SymbolDescriptor::AttributeMaskRef(AttributeMaskRef {
        applies_to,
        missing_flags: missing.into_iter().collect::<BTreeSet<_>>(),
    })
}

/// Describe the position of `instruction` inside `owner`'s body. `operand` is the
/// descriptor of the symbol the instruction references, if any.
#[must_use]
pub fn classify_operand(
    owner: &OperandOwner,
    instruction: &Instruction,
    operand: Option<&SymbolDescriptor>,
) -> SymbolDescriptor {
    SymbolDescriptor::OperandRef(OperandRef {
        containing_method: owner.clone(),
        opcode_name: instruction.mnemonic,
        byte_offset: instruction.offset,
        operand_name: operand.and_then(SymbolDescriptor::qualified_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::Operand,
        metadata::{
            builder::{MethodDefBuilder, ModuleBuilder, PropertyDefBuilder, TypeDefBuilder},
            token::Token,
        },
        sandbox::descriptor::Category,
    };

    fn file() -> TypeReference {
        TypeReference::new("System.IO", "File").with_scope(AssemblyIdentity::simple("System.IO"))
    }

    #[test]
    fn references_map_to_one_variant_each() {
        let ty = classify_reference(&Reference::Type(file()));
        assert_eq!(ty.category(), Category::Type);
        assert_eq!(ty.scope().map(|s| s.name.as_str()), Some("System.IO"));

        let method = classify_reference(&Reference::Method(MethodReference::new(
            file(),
            "Delete",
            "Void",
        )));
        assert_eq!(method.to_string(), "[METHOD] Void System.IO.File.Delete");

        let ctor = classify_reference(&Reference::Method(MethodReference::constructor(file())));
        assert_eq!(ctor.category(), Category::Constructor);

        let accessor = classify_reference(&Reference::Method(
            MethodReference::new(file(), "get_Exists", "Boolean").with_property("Exists"),
        ));
        assert_eq!(accessor.category(), Category::Property);

        let field = classify_reference(&Reference::Field(FieldReference::new(
            file(),
            "Separator",
            "Char",
        )));
        assert_eq!(field.to_string(), "[FIELD] Char System.IO.File.Separator");
    }

    #[test]
    fn call_sites_do_not_affect_identity() {
        let a = classify_reference(&Reference::Method(MethodReference::new(
            file(),
            "Delete",
            "Void",
        )));
        let b = classify_method_reference(&MethodReference::new(
            TypeReference::new("System.IO", "File"),
            "Delete",
            "Void",
        ));
        assert_eq!(a, b);
    }

    #[test]
    fn declared_definitions() {
        let mut builder = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
        TypeDefBuilder::new()
            .namespace("Plugin")
            .name("Main")
            .extends(TypeReference::new("System", "MarshalByRefObject"))
            .build(&mut builder)
            .unwrap();
        MethodDefBuilder::new()
            .name(".ctor")
            .build(&mut builder)
            .unwrap();
        PropertyDefBuilder::new()
            .name("Name")
            .getter(MethodDefBuilder::new().returns("String"))
            .build(&mut builder)
            .unwrap();
        let module = builder.build();
        let ty = &module.types()[0];

        assert_eq!(classify_type(ty).to_string(), "[TYPE] Plugin.Main");
        assert_eq!(
            classify_type_on_base(ty).to_string(),
            "[TYPE] Plugin.Main on System.MarshalByRefObject"
        );
        assert_eq!(classify_type(ty), classify_type_on_base(ty));

        let ctor = classify_method(ty, &ty.methods[0]);
        assert!(ctor.is_constructor);
        assert!(ctor.scope.is_none());

        let property = &ty.properties[0];
        let getter = property.getter.as_ref().unwrap();
        let descriptor = SymbolDescriptor::PropertyRef(classify_property(ty, property, getter));
        assert_eq!(
            descriptor.to_string(),
            "[PROPERTY] String Plugin.Main.get_Name"
        );
    }

    #[test]
    fn operands_record_the_referenced_name() {
        let owner = OperandOwner::Method(MethodRef {
            declaring_type_name: "Plugin.Main".to_string(),
            method_name: "Run".to_string(),
            return_type_name: "Void".to_string(),
            is_constructor: false,
            scope: None,
        });
        let instruction = Instruction {
            offset: 5,
            size: 5,
            opcode: 0x28,
            prefix: 0,
            mnemonic: "call",
            operand: Operand::Token(Token::new(0x0A00_0001)),
        };
        let target = classify_method_reference(&MethodReference::new(file(), "Delete", "Void"));

        match classify_operand(&owner, &instruction, Some(&target)) {
            SymbolDescriptor::OperandRef(operand) => {
                assert_eq!(operand.byte_offset, 5);
                assert_eq!(operand.opcode_name, "call");
                assert_eq!(operand.operand_name.as_deref(), Some("System.IO.File.Delete"));
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }
}
