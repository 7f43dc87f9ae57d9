//! Method definitions, method attribute flags and method body headers.
//!
//! # Key Types
//! - [`MethodAttributes`] - the raw `MethodAttributes` word split into access and modifiers
//! - [`MethodAttribute`] - one nameable attribute, used by required-attribute policy rules
//! - [`MethodBody`] - tiny / fat header parsing, yielding the raw IL code
//! - [`MethodDef`] - a method or constructor declared by the module under verification
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 23.1.10 - Flags for methods
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use bitflags::bitflags;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    file::io::read_le,
    metadata::token::Token,
    Error::{Empty, OutOfBounds},
    Result,
};

/// Bitmask for `ACCESS` state extraction
pub const METHOD_ACCESS_MASK: u16 = 0x0007;

/// Method member access, the three low bits of `MethodAttributes`.
///
/// Unlike the other attributes this is an enumerated field, not a set of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MethodAccess {
    /// Member not referenceable
    CompilerControlled = 0x0000,
    /// Accessible only by the parent type
    Private = 0x0001,
    /// Accessible by sub-types only in this Assembly
    FamilyAndAssembly = 0x0002,
    /// Accessibly by anyone in the Assembly
    Assembly = 0x0003,
    /// Accessible only by type and sub-types
    Family = 0x0004,
    /// Accessibly by sub-types anywhere, plus anyone in assembly
    FamilyOrAssembly = 0x0005,
    /// Accessibly by anyone who has visibility to this scope
    Public = 0x0006,
}

impl MethodAccess {
    /// Extract access from raw method attributes. The reserved value 7 maps to
    /// `CompilerControlled`, which no required-attribute rule can be satisfied by.
    #[must_use]
    pub fn from_method_flags(flags: u16) -> Self {
        match flags & METHOD_ACCESS_MASK {
            0x0001 => MethodAccess::Private,
            0x0002 => MethodAccess::FamilyAndAssembly,
            0x0003 => MethodAccess::Assembly,
            0x0004 => MethodAccess::Family,
            0x0005 => MethodAccess::FamilyOrAssembly,
            0x0006 => MethodAccess::Public,
            _ => MethodAccess::CompilerControlled,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method modifiers and properties
    pub struct MethodModifiers: u16 {
        /// Reserved: shall be zero for conforming implementations
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overriden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, dpending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associate with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

/// A single, nameable method attribute.
///
/// Names follow `System.Reflection.MethodAttributes`, since that is how policy authors write
/// them. The derived ordering is the declaration order below and is what makes the list of
/// missing attributes in a violation deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum MethodAttribute {
    /// Access is compiler controlled
    PrivateScope,
    /// Access is private
    Private,
    /// Access is family and assembly
    #[strum(to_string = "FamANDAssem")]
    FamilyAndAssembly,
    /// Access is assembly
    Assembly,
    /// Access is family
    Family,
    /// Access is family or assembly
    #[strum(to_string = "FamORAssem")]
    FamilyOrAssembly,
    /// Access is public
    Public,
    /// [`MethodModifiers::STATIC`]
    Static,
    /// [`MethodModifiers::FINAL`]
    Final,
    /// [`MethodModifiers::VIRTUAL`]
    Virtual,
    /// [`MethodModifiers::HIDE_BY_SIG`]
    HideBySig,
    /// [`MethodModifiers::NEW_SLOT`]
    NewSlot,
    /// [`MethodModifiers::STRICT`]
    CheckAccessOnOverride,
    /// [`MethodModifiers::ABSTRACT`]
    Abstract,
    /// [`MethodModifiers::SPECIAL_NAME`]
    SpecialName,
    /// [`MethodModifiers::RTSPECIAL_NAME`]
    #[strum(to_string = "RTSpecialName")]
    RtSpecialName,
    /// [`MethodModifiers::PINVOKE_IMPL`]
    PinvokeImpl,
    /// [`MethodModifiers::UNMANAGED_EXPORT`]
    UnmanagedExport,
    /// [`MethodModifiers::HAS_SECURITY`]
    HasSecurity,
    /// [`MethodModifiers::REQUIRE_SEC_OBJECT`]
    RequireSecObject,
}

impl MethodAttribute {
    fn access(self) -> Option<MethodAccess> {
        match self {
            MethodAttribute::PrivateScope => Some(MethodAccess::CompilerControlled),
            MethodAttribute::Private => Some(MethodAccess::Private),
            MethodAttribute::FamilyAndAssembly => Some(MethodAccess::FamilyAndAssembly),
            MethodAttribute::Assembly => Some(MethodAccess::Assembly),
            MethodAttribute::Family => Some(MethodAccess::Family),
            MethodAttribute::FamilyOrAssembly => Some(MethodAccess::FamilyOrAssembly),
            MethodAttribute::Public => Some(MethodAccess::Public),
            _ => None,
        }
    }

    fn modifier(self) -> MethodModifiers {
        match self {
            MethodAttribute::Static => MethodModifiers::STATIC,
            MethodAttribute::Final => MethodModifiers::FINAL,
            MethodAttribute::Virtual => MethodModifiers::VIRTUAL,
            MethodAttribute::HideBySig => MethodModifiers::HIDE_BY_SIG,
            MethodAttribute::NewSlot => MethodModifiers::NEW_SLOT,
            MethodAttribute::CheckAccessOnOverride => MethodModifiers::STRICT,
            MethodAttribute::Abstract => MethodModifiers::ABSTRACT,
            MethodAttribute::SpecialName => MethodModifiers::SPECIAL_NAME,
            MethodAttribute::RtSpecialName => MethodModifiers::RTSPECIAL_NAME,
            MethodAttribute::PinvokeImpl => MethodModifiers::PINVOKE_IMPL,
            MethodAttribute::UnmanagedExport => MethodModifiers::UNMANAGED_EXPORT,
            MethodAttribute::HasSecurity => MethodModifiers::HAS_SECURITY,
            MethodAttribute::RequireSecObject => MethodModifiers::REQUIRE_SEC_OBJECT,
            _ => MethodModifiers::empty(),
        }
    }
}

/// The `MethodAttributes` word of a method definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodAttributes {
    /// Member access
    pub access: MethodAccess,
    /// All other attribute bits
    pub modifiers: MethodModifiers,
}

impl MethodAttributes {
    /// Split a raw `MethodAttributes` value.
    #[must_use]
    pub fn from_bits(flags: u16) -> Self {
        Self {
            access: MethodAccess::from_method_flags(flags),
            modifiers: MethodModifiers::from_bits_truncate(flags & !METHOD_ACCESS_MASK),
        }
    }

    /// Build attributes from an access level and a set of modifiers.
    #[must_use]
    pub fn new(access: MethodAccess, modifiers: MethodModifiers) -> Self {
        Self { access, modifiers }
    }

    /// Returns `true` if `attribute` is present.
    #[must_use]
    pub fn contains(&self, attribute: MethodAttribute) -> bool {
        match attribute.access() {
            Some(access) => self.access == access,
            None => self.modifiers.contains(attribute.modifier()),
        }
    }

    /// All named attributes present on the method, in [`MethodAttribute`] order.
    pub fn iter(&self) -> impl Iterator<Item = MethodAttribute> + '_ {
        MethodAttribute::iter().filter(|attribute| self.contains(*attribute))
    }
}

impl Default for MethodAttributes {
    fn default() -> Self {
        Self::new(MethodAccess::Public, MethodModifiers::HIDE_BY_SIG)
    }
}

/// Whether a method definition is a regular method or an instance / type initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Any method that is not a constructor
    Method,
    /// `.ctor` or `.cctor`
    Constructor,
}

impl MethodKind {
    /// Derive the kind from a method name, the way the runtime does.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == ".ctor" || name == ".cctor" {
            MethodKind::Constructor
        } else {
            MethodKind::Method
        }
    }
}

/// The code of one method, stripped of its header.
///
/// The verifier only consumes [`MethodBody::code`]; the header fields are kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// The raw IL instruction stream
    pub code: Vec<u8>,
    /// Size of the method header in bytes (0 when built from raw code)
    pub size_header: usize,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// Token of the local variable signature, 0 if there are no locals
    pub local_var_sig_token: u32,
    /// Flag, indicating the type of the method header
    pub is_fat: bool,
}

impl MethodBody {
    /// Wrap already extracted IL code.
    #[must_use]
    pub fn from_code(code: impl Into<Vec<u8>>) -> Self {
        MethodBody {
            code: code.into(),
            size_header: 0,
            max_stack: 8,
            local_var_sig_token: 0,
            is_fat: false,
        }
    }

    /// Parse a method body that starts with a tiny or fat header (ECMA-335 II.25.4).
    ///
    /// Trailing extra data sections (exception clauses) are ignored.
    ///
    /// # Errors
    /// Returns an error if the data is empty, the header is neither tiny nor fat, or the
    /// declared code size exceeds the data.
    pub fn parse(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(Empty);
        }

        let first_byte = read_le::<u8>(data)?;
        match first_byte & 0b_0000_0011 {
            0x2 => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    code: data[1..=size_code].to_vec(),
                    size_header: 1,
                    max_stack: 8,
                    local_var_sig_token: 0,
                    is_fat: false,
                })
            }
            0x3 => {
                if data.len() < 12 {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;
                let size_header = ((first_duo >> 12) * 4) as usize;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat method header declares size {} (minimum is 12)",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                let Some(end) = size_header.checked_add(size_code) else {
                    return Err(OutOfBounds);
                };
                if data.len() < end {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    code: data[size_header..end].to_vec(),
                    size_header,
                    max_stack: read_le::<u16>(&data[2..])? as usize,
                    local_var_sig_token: read_le::<u32>(&data[8..])?,
                    is_fat: true,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Size of the IL code in bytes.
    #[must_use]
    pub fn size_code(&self) -> usize {
        self.code.len()
    }
}

/// A method or constructor declared by the module under verification.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// `MethodDef` token of this method
    pub token: Token,
    /// Method name (e.g. `Run`, `.ctor`, `get_Name`)
    pub name: String,
    /// Display name of the return type (`Void` for constructors)
    pub return_type: String,
    /// Constructor or regular method
    pub kind: MethodKind,
    /// Access and modifiers
    pub attributes: MethodAttributes,
    /// Method body; `None` for abstract, extern and runtime-provided methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Returns `true` for `.ctor` / `.cctor`.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn access_is_enumerated() {
        let attributes = MethodAttributes::from_bits(0x0006 | 0x0010 | 0x0080);
        assert_eq!(attributes.access, MethodAccess::Public);
        assert!(attributes.contains(MethodAttribute::Public));
        assert!(attributes.contains(MethodAttribute::Static));
        assert!(attributes.contains(MethodAttribute::HideBySig));
        assert!(!attributes.contains(MethodAttribute::Private));
        // Public (6) shares bits with Family (4) and FamANDAssem (2)
        assert!(!attributes.contains(MethodAttribute::Family));
        assert!(!attributes.contains(MethodAttribute::FamilyAndAssembly));
    }

    #[test]
    fn attribute_names() {
        assert_eq!(MethodAttribute::FamilyAndAssembly.to_string(), "FamANDAssem");
        assert_eq!(MethodAttribute::RtSpecialName.to_string(), "RTSpecialName");
        assert_eq!(
            "public".parse::<MethodAttribute>().unwrap(),
            MethodAttribute::Public
        );
        assert_eq!(
            "FamORAssem".parse::<MethodAttribute>().unwrap(),
            MethodAttribute::FamilyOrAssembly
        );
        assert!("Sneaky".parse::<MethodAttribute>().is_err());
    }

    #[test]
    fn iter_lists_present_attributes() {
        let attributes = MethodAttributes::new(
            MethodAccess::Private,
            MethodModifiers::STATIC | MethodModifiers::VIRTUAL,
        );
        let present: Vec<_> = attributes.iter().collect();
        assert_eq!(
            present,
            vec![
                MethodAttribute::Private,
                MethodAttribute::Static,
                MethodAttribute::Virtual
            ]
        );
    }

    #[test]
    fn kind_from_name() {
        assert_eq!(MethodKind::from_name(".ctor"), MethodKind::Constructor);
        assert_eq!(MethodKind::from_name(".cctor"), MethodKind::Constructor);
        assert_eq!(MethodKind::from_name("Run"), MethodKind::Method);
    }

    #[test]
    fn tiny_header() {
        // Tiny header, 2 bytes of code: nop, ret
        let data = [0x0A, 0x00, 0x2A];
        let body = MethodBody::parse(&data).unwrap();
        assert!(!body.is_fat);
        assert_eq!(body.size_header, 1);
        assert_eq!(body.code, vec![0x00, 0x2A]);
    }

    #[test]
    fn tiny_header_truncated() {
        let data = [0x0E, 0x00, 0x2A];
        assert!(matches!(MethodBody::parse(&data), Err(Error::OutOfBounds)));
    }

    #[test]
    fn fat_header() {
        let data = [
            0x13, 0x30, // flags: fat + init locals, header size 3 * 4
            0x02, 0x00, // max stack
            0x01, 0x00, 0x00, 0x00, // code size
            0x01, 0x00, 0x00, 0x11, // local var sig token
            0x2A, // ret
        ];
        let body = MethodBody::parse(&data).unwrap();
        assert!(body.is_fat);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.local_var_sig_token, 0x1100_0001);
        assert_eq!(body.code, vec![0x2A]);
    }

    #[test]
    fn fat_header_code_exceeds_data() {
        let data = [
            0x03, 0x30, 0x02, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A,
        ];
        assert!(matches!(MethodBody::parse(&data), Err(Error::OutOfBounds)));
    }

    #[test]
    fn invalid_header() {
        assert!(matches!(MethodBody::parse(&[]), Err(Error::Empty)));
        assert!(matches!(
            MethodBody::parse(&[0x00, 0x2A]),
            Err(Error::Malformed { .. })
        ));
    }
}
