//! Hashing utilities.
//!
//! Type aliases for [`FxHashMap`] and [`FxHashSet`] from the `rustc-hash`
//! crate, used for every registry and lookup table, and [`string_hash32`], the
//! stable 32-bit string hash used to disambiguate generated file names.
//!
//! # Examples
//!
//! ```
//! use km_core::{FxHashMap, fx_hash_map, string_hash32};
//!
//! let mut map: FxHashMap<String, i32> = fx_hash_map();
//! map.insert("key".to_owned(), 42);
//!
//! assert_eq!(string_hash32("abc"), 96354);
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

/// The JVM `String.hashCode` of `s`: `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16
/// code units, with wrapping 32-bit arithmetic.
///
/// Generated file names embed this value so they stay identical to names
/// produced by JVM tooling for the same signature.
#[must_use]
pub fn string_hash32(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}
