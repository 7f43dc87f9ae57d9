//! Metadata tokens as they appear in CIL operands.
//!
//! A token is a 32-bit value: the high byte selects the metadata table, the low 24 bits are
//! the 1-based row index (ECMA-335 Partition III, 1.9). The verifier only cares about the
//! table byte, to decide whether an operand names a symbol that must be checked against policy.

use std::fmt;

/// `TypeRef` table (0x01)
pub const TABLE_TYPE_REF: u8 = 0x01;
/// `TypeDef` table (0x02)
pub const TABLE_TYPE_DEF: u8 = 0x02;
/// `Field` table (0x04)
pub const TABLE_FIELD: u8 = 0x04;
/// `MethodDef` table (0x06)
pub const TABLE_METHOD_DEF: u8 = 0x06;
/// `MemberRef` table (0x0A)
pub const TABLE_MEMBER_REF: u8 = 0x0A;
/// `StandAloneSig` table (0x11), used by `calli` and local signatures
pub const TABLE_STANDALONE_SIG: u8 = 0x11;
/// `TypeSpec` table (0x1B)
pub const TABLE_TYPE_SPEC: u8 = 0x1B;
/// `MethodSpec` table (0x2B)
pub const TABLE_METHOD_SPEC: u8 = 0x2B;
/// `#US` heap (0x70), used by `ldstr`
pub const HEAP_USER_STRING: u8 = 0x70;

/// A metadata token referencing a row in a metadata table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Create a new token from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table byte and a row index (only the low 24 bits are kept).
    #[must_use]
    pub const fn from_parts(table: u8, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The row index.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` if the token has a zero row (a nil reference).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Returns `true` if this token points into a table whose rows are types, methods or
    /// fields, i.e. something a policy can deny.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(
            self.table(),
            TABLE_TYPE_REF
                | TABLE_TYPE_DEF
                | TABLE_FIELD
                | TABLE_METHOD_DEF
                | TABLE_MEMBER_REF
                | TABLE_TYPE_SPEC
                | TABLE_METHOD_SPEC
        )
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0A00_0003);
        assert_eq!(token.table(), TABLE_MEMBER_REF);
        assert_eq!(token.row(), 3);
        assert_eq!(Token::from_parts(TABLE_MEMBER_REF, 3), token);
    }

    #[test]
    fn test_token_from_parts_truncates_row() {
        let token = Token::from_parts(TABLE_TYPE_DEF, 0xFF00_0001);
        assert_eq!(token.value(), 0x0200_0001);
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token::new(0x0600_0000).is_null());
        assert!(!Token::new(0x0600_0001).is_null());
    }

    #[test]
    fn test_symbol_tables() {
        assert!(Token::from_parts(TABLE_METHOD_DEF, 1).is_symbol());
        assert!(Token::from_parts(TABLE_METHOD_SPEC, 1).is_symbol());
        assert!(Token::from_parts(TABLE_FIELD, 1).is_symbol());
        assert!(!Token::from_parts(HEAP_USER_STRING, 1).is_symbol());
        assert!(!Token::from_parts(TABLE_STANDALONE_SIG, 1).is_symbol());
    }

    #[test]
    fn test_token_display_debug() {
        let token = Token(0x0600_0001);
        assert_eq!(format!("{}", token), "0x06000001");
        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }
}
