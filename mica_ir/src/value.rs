//! Runtime values
//!
//! The IL has a single runtime value type: the arbitrary-precision
//! signed integer. Everything else (comparison results, branch
//! conditions, I/O) is expressed through it.

use num_bigint::BigInt;

/// An IL value.
pub type Value = BigInt;

/// Shorthand for building values from machine integers.
pub fn val(i: i64) -> Value {
    Value::from(i)
}

/// Whether `name` is a well-formed register or label name: non-empty,
/// drawn from `[A-Za-z0-9_.]`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
