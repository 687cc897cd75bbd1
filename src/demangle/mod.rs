//! Demangler helpers for Rust and C++ (Itanium) symbol names.

use once_cell::sync::Lazy;
use regex::Regex;

/// Itanium (GCC/Clang) ABI names start with `_Z`.
static RE_ITANIUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_Z[a-zA-Z0-9_]+").expect("valid itanium mangled regex"));

/// Demangle a single symbol name, trying Rust (v0 and legacy) before Itanium.
///
/// Returns `None` when the name is not mangled in either scheme.
pub fn demangle_one(s: &str) -> Option<String> {
    if let Ok(dm) = rustc_demangle::try_demangle(s) {
        return Some(format!("{dm:#}"));
    }
    if RE_ITANIUM.is_match(s) {
        if let Ok(sym) = cpp_demangle::Symbol::new(s) {
            return Some(sym.to_string());
        }
    }
    None
}
