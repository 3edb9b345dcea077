use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Process-wide interner backing every `EntityName`.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned name of an entity in the object graph.
/// Copyable handle; equality and hashing never touch the string.
///
/// Names identify entities only at a given instant: renames free the old
/// name and claim the new one, and a deleted entity's name may be reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityName(Spur);

impl EntityName {
    /// Intern a string as an EntityName, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        EntityName(INTERNER.get_or_intern(s))
    }

    /// Look up a name without interning it.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(EntityName)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EntityName {
    fn from(s: &str) -> Self {
        EntityName::intern(s)
    }
}

impl Serialize for EntityName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EntityName::intern(&s))
    }
}

// ─── Name generation ─────────────────────────────────────────────────────

/// Replace every character that is not alphanumeric or `_` with `_`.
/// An empty result becomes `"unnamed"`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Return `desired` if free, otherwise the smallest free `base_N` (N ≥ 1),
/// where `base` is `desired` with any trailing `_N` suffix removed.
///
/// `ko` → `ko_1`, and `ko_1` → `ko_2` when both are taken.
pub fn unique_name(desired: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(desired) {
        return desired.to_string();
    }
    let base = strip_numeric_suffix(desired);
    (1u64..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| desired.to_string())
}

fn strip_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((base, digits))
            if !base.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}
