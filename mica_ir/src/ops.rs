//! Binary operators over IL values
//!
//! The canonical operator set the data model stores. Surface forms
//! `>` and `>=` are normalized away by the parser (operand swap) and
//! never appear here.

use crate::value::Value;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
}

/// Evaluation failures. Shared by the interpreter and by constant
/// folding, which must leave failing operations in place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    #[error("division by zero")]
    DivByZero,

    #[error("negative shift amount")]
    NegativeShift,
}

impl BinOp {
    /// Evaluate `lhs ⊕ rhs`.
    ///
    /// Division truncates toward zero; the remainder satisfies
    /// `lhs == (lhs / rhs) * rhs + lhs % rhs`. Right shift is
    /// arithmetic. Comparisons yield 0 or 1.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<Value, OpError> {
        match self {
            BinOp::Add => Ok(lhs + rhs),
            BinOp::Sub => Ok(lhs - rhs),
            BinOp::Mul => Ok(lhs * rhs),
            BinOp::Div => {
                if rhs.is_zero() {
                    Err(OpError::DivByZero)
                } else {
                    Ok(lhs / rhs)
                }
            }
            BinOp::Rem => {
                if rhs.is_zero() {
                    Err(OpError::DivByZero)
                } else {
                    Ok(lhs % rhs)
                }
            }
            BinOp::And => Ok(lhs & rhs),
            BinOp::Or => Ok(lhs | rhs),
            BinOp::Xor => Ok(lhs ^ rhs),
            BinOp::Shl => Ok(lhs << shift_amount(rhs)?),
            BinOp::Shr => Ok(lhs >> shift_amount(rhs)?),
            BinOp::Eq => Ok(Value::from((lhs == rhs) as u8)),
            BinOp::Ne => Ok(Value::from((lhs != rhs) as u8)),
            BinOp::Lt => Ok(Value::from((lhs < rhs) as u8)),
            BinOp::Le => Ok(Value::from((lhs <= rhs) as u8)),
        }
    }

    /// Whether evaluation can fail for some operand values.
    pub fn can_trap(self) -> bool {
        matches!(self, BinOp::Div | BinOp::Rem | BinOp::Shl | BinOp::Shr)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le)
    }

    /// Surface spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
        }
    }

    /// Parse a canonical operator symbol. `>` and `>=` are not
    /// canonical; the parser handles them by swapping operands.
    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        Some(match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Rem,
            "&" => BinOp::And,
            "|" => BinOp::Or,
            "^" => BinOp::Xor,
            "<<" => BinOp::Shl,
            ">>" => BinOp::Shr,
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            _ => return None,
        })
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn shift_amount(rhs: &Value) -> Result<usize, OpError> {
    if rhs.is_negative() {
        return Err(OpError::NegativeShift);
    }
    // Amounts past usize::MAX are not materializable anyway.
    Ok(rhs.to_usize().unwrap_or(usize::MAX))
}
