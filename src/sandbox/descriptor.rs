//! Normalized, comparable descriptions of referenced symbols.
//!
//! A [`SymbolDescriptor`] is built once from a reference and never changes. Two invariants
//! shape every type in this module:
//!
//! - Equality and hashing cover only what identifies the referenced symbol. Auxiliary
//!   context carried for policy evaluation (the defining assembly, a declared base type, the
//!   operand name at an instruction) is ignored, so a method referenced from two call sites
//!   yields two equal descriptors.
//! - The label is rendered on demand by `Display` and is never compared. Every label starts
//!   with the bracketed [`Category`] tag.

use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use strum::{Display, EnumIter, EnumString};

use crate::metadata::{identity::AssemblyIdentity, method::MethodAttribute};

/// The category tag every label starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// A type
    Type,
    /// A method that is not a constructor
    Method,
    /// An instruction position inside a method body
    Operand,
    /// Required method attributes that were missing
    MethodAttribute,
    /// An assembly
    Assembly,
    /// An instance or type initializer
    Constructor,
    /// A property, through one of its accessors
    Property,
    /// A field
    Field,
}

/// Which kind of method a required-attribute rule applies to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MethodRole {
    /// Regular methods
    Method,
    /// `.ctor` and `.cctor`
    Constructor,
    /// Property getters and setters
    Accessor,
}

/// The last segment of a dotted or nested type name.
pub(crate) fn simple_type_name(full_name: &str) -> &str {
    full_name.rsplit(['.', '/']).next().unwrap_or(full_name)
}

/// An assembly, identified by its full identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyRef {
    /// The assembly's identity
    pub identity: AssemblyIdentity,
}

impl AssemblyRef {
    /// Describe `identity`.
    #[must_use]
    pub fn new(identity: AssemblyIdentity) -> Self {
        AssemblyRef { identity }
    }

    /// The full display identity, e.g. `System.IO, Version=4.0.0.0, Culture=neutral, ...`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.identity.display_name()
    }
}

/// A type, identified by its full name.
#[derive(Debug, Clone)]
pub struct TypeRef {
    /// `Namespace.Name`
    pub full_name: String,
    /// Full name of the direct ancestor, when known
    pub declared_base_type: Option<String>,
    /// Defining assembly of the direct ancestor, `None` when it is the module's own
    pub base_scope: Option<AssemblyIdentity>,
    /// Defining assembly, `None` for the module's own types
    pub scope: Option<AssemblyIdentity>,
    /// Set when a violation is about the ancestor rather than the type itself
    pub on_base: bool,
}

impl TypeRef {
    /// The simple name, without namespace or enclosing type.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.full_name)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
    }
}

/// A method or constructor, identified by declaring type, name, return type and kind.
#[derive(Debug, Clone)]
pub struct MethodRef {
    /// Full name of the declaring type
    pub declaring_type_name: String,
    /// Method name
    pub method_name: String,
    /// Simple name of the return type
    pub return_type_name: String,
    /// `.ctor` or `.cctor`
    pub is_constructor: bool,
    /// Defining assembly of the declaring type, `None` for the module's own methods
    pub scope: Option<AssemblyIdentity>,
}

impl MethodRef {
    /// `DeclaringType.Name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type_name, self.method_name)
    }

    fn write_name(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constructor {
            write!(f, "{}.{}", self.declaring_type_name, self.method_name)
        } else {
            write!(
                f,
                "{} {}.{}",
                self.return_type_name, self.declaring_type_name, self.method_name
            )
        }
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type_name == other.declaring_type_name
            && self.method_name == other.method_name
            && self.return_type_name == other.return_type_name
            && self.is_constructor == other.is_constructor
    }
}

impl Eq for MethodRef {}

impl Hash for MethodRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type_name.hash(state);
        self.method_name.hash(state);
        self.return_type_name.hash(state);
        self.is_constructor.hash(state);
    }
}

/// A property, seen through the accessor that was referenced or verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    /// Property name
    pub property_name: String,
    /// The getter or setter
    pub accessor: MethodRef,
}

/// A field, identified by declaring type, name and field type.
#[derive(Debug, Clone)]
pub struct FieldRef {
    /// Full name of the declaring type
    pub declaring_type_name: String,
    /// Field name
    pub field_name: String,
    /// Simple name of the field type
    pub field_type_name: String,
    /// Defining assembly of the declaring type, `None` for the module's own fields
    pub scope: Option<AssemblyIdentity>,
}

impl FieldRef {
    /// `DeclaringType.Name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type_name, self.field_name)
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type_name == other.declaring_type_name
            && self.field_name == other.field_name
            && self.field_type_name == other.field_type_name
    }
}

impl Eq for FieldRef {}

impl Hash for FieldRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type_name.hash(state);
        self.field_name.hash(state);
        self.field_type_name.hash(state);
    }
}

/// Required method attributes a method did not have.
///
/// The set is ordered by [`MethodAttribute`] declaration order, which keeps labels stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeMaskRef {
    /// The kind of method the requirement applied to
    pub applies_to: MethodRole,
    /// The absent attributes
    pub missing_flags: BTreeSet<MethodAttribute>,
}

/// The member whose body contains an [`OperandRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperandOwner {
    /// A method or constructor
    Method(MethodRef),
    /// A property accessor
    Property(PropertyRef),
}

impl OperandOwner {
    /// The method whose body was decoded.
    #[must_use]
    pub fn method(&self) -> &MethodRef {
        match self {
            OperandOwner::Method(method) => method,
            OperandOwner::Property(property) => &property.accessor,
        }
    }
}

/// One instruction position: containing member, opcode and byte offset.
#[derive(Debug, Clone)]
pub struct OperandRef {
    /// The member whose body contains the instruction
    pub containing_method: OperandOwner,
    /// Opcode mnemonic
    pub opcode_name: &'static str,
    /// Byte offset of the instruction within the body
    pub byte_offset: usize,
    /// Qualified name of the symbol the operand references, if it references one
    pub operand_name: Option<String>,
}

impl PartialEq for OperandRef {
    fn eq(&self, other: &Self) -> bool {
        self.containing_method == other.containing_method
            && self.opcode_name == other.opcode_name
            && self.byte_offset == other.byte_offset
    }
}

impl Eq for OperandRef {}

impl Hash for OperandRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.containing_method.hash(state);
        self.opcode_name.hash(state);
        self.byte_offset.hash(state);
    }
}

/// A normalized reference to something a policy can deny.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolDescriptor {
    /// An assembly
    AssemblyRef(AssemblyRef),
    /// A type
    TypeRef(TypeRef),
    /// A method or constructor
    MethodRef(MethodRef),
    /// A property accessor
    PropertyRef(PropertyRef),
    /// A field
    FieldRef(FieldRef),
    /// Missing required method attributes
    AttributeMaskRef(AttributeMaskRef),
    /// An instruction position
    OperandRef(OperandRef),
}

impl SymbolDescriptor {
    /// The category tag of the label.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            SymbolDescriptor::AssemblyRef(_) => Category::Assembly,
            SymbolDescriptor::TypeRef(_) => Category::Type,
            SymbolDescriptor::MethodRef(method) if method.is_constructor => Category::Constructor,
            SymbolDescriptor::MethodRef(_) => Category::Method,
            SymbolDescriptor::PropertyRef(_) => Category::Property,
            SymbolDescriptor::FieldRef(_) => Category::Field,
            SymbolDescriptor::AttributeMaskRef(_) => Category::MethodAttribute,
            SymbolDescriptor::OperandRef(_) => Category::Operand,
        }
    }

    /// The assembly that defines the symbol, when it is not the module's own.
    #[must_use]
    pub fn scope(&self) -> Option<&AssemblyIdentity> {
        match self {
            SymbolDescriptor::TypeRef(ty) => ty.scope.as_ref(),
            SymbolDescriptor::MethodRef(method) => method.scope.as_ref(),
            SymbolDescriptor::PropertyRef(property) => property.accessor.scope.as_ref(),
            SymbolDescriptor::FieldRef(field) => field.scope.as_ref(),
            _ => None,
        }
    }

    /// The dotted name opcode rules match operands against: `Namespace.Type` for types,
    /// `Namespace.Type.Member` for methods, accessors and fields.
    #[must_use]
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            SymbolDescriptor::TypeRef(ty) => Some(ty.full_name.clone()),
            SymbolDescriptor::MethodRef(method) => Some(method.qualified_name()),
            SymbolDescriptor::PropertyRef(property) => Some(property.accessor.qualified_name()),
            SymbolDescriptor::FieldRef(field) => Some(field.qualified_name()),
            _ => None,
        }
    }

    /// The label without its category tag.
    fn write_name(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolDescriptor::AssemblyRef(assembly) => f.write_str(&assembly.display_name()),
            SymbolDescriptor::TypeRef(ty) => {
                f.write_str(&ty.full_name)?;
                match (&ty.declared_base_type, ty.on_base) {
                    (Some(base), true) => write!(f, " on {}", base),
                    _ => Ok(()),
                }
            }
            SymbolDescriptor::MethodRef(method) => method.write_name(f),
            SymbolDescriptor::PropertyRef(property) => property.accessor.write_name(f),
            SymbolDescriptor::FieldRef(field) => write!(
                f,
                "{} {}.{}",
                field.field_type_name, field.declaring_type_name, field.field_name
            ),
            SymbolDescriptor::AttributeMaskRef(mask) => {
                f.write_str("[")?;
                for (index, flag) in mask.missing_flags.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", flag)?;
                }
                f.write_str("]")
            }
            SymbolDescriptor::OperandRef(operand) => {
                operand.containing_method.method().write_name(f)?;
                write!(
                    f,
                    " (on operand: {} @@ 0x{:X})",
                    operand.opcode_name, operand.byte_offset
                )
            }
        }
    }
}

impl fmt::Display for SymbolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.category())?;
        self.write_name(f)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn method(declaring_type: &str, name: &str, scope: Option<&str>) -> MethodRef {
        MethodRef {
            declaring_type_name: declaring_type.to_string(),
            method_name: name.to_string(),
            return_type_name: "Void".to_string(),
            is_constructor: name == ".ctor",
            scope: scope.map(AssemblyIdentity::simple),
        }
    }

    #[test]
    fn method_identity_ignores_scope() {
        let a = SymbolDescriptor::MethodRef(method("System.IO.File", "Delete", Some("System.IO")));
        let b = SymbolDescriptor::MethodRef(method("System.IO.File", "Delete", None));
        let c = SymbolDescriptor::MethodRef(method("System.IO.Directory", "Delete", None));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn type_identity_ignores_base_and_label_context() {
        let own = TypeRef {
            full_name: "Plugin.Main".to_string(),
            declared_base_type: Some("System.Object".to_string()),
            base_scope: Some(AssemblyIdentity::simple("mscorlib")),
            scope: None,
            on_base: false,
        };
        let mut on_base = own.clone();
        on_base.on_base = true;
        on_base.declared_base_type = Some("System.MarshalByRefObject".to_string());

        assert_eq!(own, on_base);
        assert_eq!(
            SymbolDescriptor::TypeRef(own).to_string(),
            "[TYPE] Plugin.Main"
        );
        assert_eq!(
            SymbolDescriptor::TypeRef(on_base).to_string(),
            "[TYPE] Plugin.Main on System.MarshalByRefObject"
        );
    }

    #[test]
    fn method_labels() {
        let delete = SymbolDescriptor::MethodRef(method("System.IO.File", "Delete", None));
        assert_eq!(delete.to_string(), "[METHOD] Void System.IO.File.Delete");

        let ctor = SymbolDescriptor::MethodRef(method("System.Net.WebClient", ".ctor", None));
        assert_eq!(ctor.category(), Category::Constructor);
        assert_eq!(ctor.to_string(), "[CONSTRUCTOR] System.Net.WebClient..ctor");
    }

    #[test]
    fn property_and_field_labels() {
        let mut getter = method("System.Environment", "get_CurrentDirectory", None);
        getter.return_type_name = "String".to_string();
        let property = SymbolDescriptor::PropertyRef(PropertyRef {
            property_name: "CurrentDirectory".to_string(),
            accessor: getter,
        });
        assert_eq!(
            property.to_string(),
            "[PROPERTY] String System.Environment.get_CurrentDirectory"
        );

        let field = SymbolDescriptor::FieldRef(FieldRef {
            declaring_type_name: "System.IntPtr".to_string(),
            field_name: "Zero".to_string(),
            field_type_name: "IntPtr".to_string(),
            scope: None,
        });
        assert_eq!(field.to_string(), "[FIELD] IntPtr System.IntPtr.Zero");
        assert_eq!(field.qualified_name().as_deref(), Some("System.IntPtr.Zero"));
    }

    #[test]
    fn attribute_mask_label_is_sorted() {
        let mask = SymbolDescriptor::AttributeMaskRef(AttributeMaskRef {
            applies_to: MethodRole::Method,
            missing_flags: [MethodAttribute::Static, MethodAttribute::Public]
                .into_iter()
                .collect(),
        });
        assert_eq!(mask.to_string(), "[METHOD_ATTRIBUTE] [Public, Static]");
    }

    #[test]
    fn operand_label_and_identity() {
        let owner = OperandOwner::Method(method("Plugin.Main", "Run", None));
        let first = OperandRef {
            containing_method: owner.clone(),
            opcode_name: "call",
            byte_offset: 0x1A,
            operand_name: Some("System.IO.File.Delete".to_string()),
        };
        let mut second = first.clone();
        second.operand_name = None;

        assert_eq!(first, second);
        assert_eq!(
            SymbolDescriptor::OperandRef(first).to_string(),
            "[OPERAND] Void Plugin.Main.Run (on operand: call @@ 0x1A)"
        );
    }

    #[test]
    fn simple_names() {
        assert_eq!(simple_type_name("System.IO.File"), "File");
        assert_eq!(simple_type_name("Outer/Inner"), "Inner");
        assert_eq!(simple_type_name("<Module>"), "<Module>");
    }
}
