use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! configuration_error {
    ($fmt:expr) => {
        crate::Error::Configuration($fmt.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Configuration(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only two operations in `cilguard` can fail: building a [`crate::Policy`] and decoding a method
/// body. Policy violations are *not* errors, they are reported as regular values through
/// [`crate::CheckResult`]. Decode failures that happen during [`crate::Verifier::check`] are
/// likewise folded into a failing [`crate::CheckResult`], so the variants below only surface
/// from the lower-level decoding and configuration APIs.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid method body / instruction stream
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the body
/// - [`Error::Empty`] - Empty input provided
///
/// ## Policy Errors
/// - [`Error::Configuration`] - Ambiguous or malformed policy, detected at load time
/// - [`Error::Json`] - The policy document is not valid JSON for [`crate::PolicyConfig`]
/// - [`Error::FileError`] - The policy document could not be read
///
/// # Examples
///
/// ```rust
/// use cilguard::{Error, Policy};
///
/// match Policy::from_json(r#"{ "opcodes": [ { "opcode": "not.an.opcode" } ] }"#) {
///     Ok(_) => unreachable!(),
///     Err(Error::Configuration(message)) => println!("rejected policy: {}", message),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The method body is damaged and could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding.
    ///
    /// Raised for truncated operands and headers whose declared size exceeds the data.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The policy is ambiguous or malformed.
    ///
    /// Raised while building a [`crate::Policy`]; no verifier can be constructed from it.
    #[error("Invalid policy - {0}")]
    Configuration(String),

    /// The policy document could not be deserialized.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error while reading a policy document.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_captures_location() {
        let error = malformed_error!("bad opcode {:02X}", 0x24);
        match error {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad opcode 24");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("Expected Error::Malformed"),
        }
    }

    #[test]
    fn configuration_display() {
        let error = configuration_error!("conflicting reasons for {}", "System.IO");
        assert_eq!(
            error.to_string(),
            "Invalid policy - conflicting reasons for System.IO"
        );
    }
}
