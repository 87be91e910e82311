//! Built-in export profiles embedded in the binary
//!
//! Lets users run `--config gestion` instead of pointing at a YAML file.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in export YAML definitions
pub static BUILTIN_PROFILES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // Inventory management (categories, products, stock movements)
        m.insert("gestion", include_str!("../profiles/gestion.yaml"));

        m
    });

/// Default profile when no `--config` is given
pub const DEFAULT_PROFILE: &str = "gestion";

/// Get a built-in profile by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_PROFILES.get(name).copied()
}

/// Check if a name is a built-in profile
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_PROFILES.contains_key(name)
}

/// List all built-in profile names
pub fn list_builtin() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTIN_PROFILES.keys().copied().collect();
    names.sort_unstable();
    names
}
