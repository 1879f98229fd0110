//! Stock passes
//!
//! Small, real analyses and transformations that ship with the
//! workbench and exercise the manager end to end.

pub mod cfold;
pub mod dce;
pub mod simplify;
pub mod stats;

use crate::manager::Registration;

/// Registrations for every stock pass, in listing order.
pub fn defaults() -> Vec<Registration> {
    vec![
        stats::registration(),
        cfold::registration(),
        dce::registration(),
        simplify::registration(),
    ]
}
