//! Built-in board definitions.

pub mod bochen_kintex7_base;

pub use bochen_kintex7_base::BochenKintex7Base;

/// Returns the catalog names of all built-in boards.
pub fn builtin_boards() -> Vec<&'static str> {
    vec![bochen_kintex7_base::NAME]
}
