//! Provider registry: custom converters indexed by canonical type keys.
//!
//! Registration and lookup are separate phases. A [`ProviderRegistryBuilder`]
//! accepts entries and rejects ambiguous unqualified duplicates; once
//! [`build`](ProviderRegistryBuilder::build) returns, the [`ProviderRegistry`]
//! is immutable and safe to share across threads.
//!
//! # Keys
//!
//! Each provider is indexed under `(receiver, returns, qualifier)`, with the
//! receiver keyed by its alias expansion. The return type is indexed under its
//! expansion and, when it is an alias, under the alias spelling as well, so a
//! provider declared once is reachable from either spelling at the use site.
//!
//! # Examples
//!
//! ```
//! use km_core::{FunctionRef, ProviderEntry, TypeRef};
//! use km_engine::ProviderRegistryBuilder;
//!
//! let mut builder = ProviderRegistryBuilder::new();
//! builder.add(ProviderEntry::new(
//!     FunctionRef::new("com.acme", "toEmail"),
//!     TypeRef::new("kotlin.String"),
//!     TypeRef::new("com.acme.Email"),
//!     None,
//! )).unwrap();
//! let registry = builder.build();
//!
//! let hit = registry
//!     .lookup(&TypeRef::new("kotlin.String").nullable(), &TypeRef::new("com.acme.Email").nullable(), None)
//!     .unwrap();
//! assert!(hit.null_safe);
//! ```

use km_core::{CanonicalKey, FxHashMap, ProviderEntry, TypeRef, canonical_key, key_pair};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    receiver: CanonicalKey,
    returns: CanonicalKey,
    qualifier: Option<String>,
}

/// Collects providers and enforces uniqueness of unqualified converters.
#[derive(Debug, Default)]
pub struct ProviderRegistryBuilder {
    entries: Vec<ProviderEntry>,
    by_pair: FxHashMap<PairKey, usize>,
}

impl ProviderRegistryBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateProvider`] if an unqualified provider
    /// for the same receiver and return key is already registered, and
    /// [`EngineError::UnkeyableType`] if either type cannot be keyed. A
    /// rejected entry is not registered under any key.
    pub fn add(&mut self, entry: ProviderEntry) -> Result<(), EngineError> {
        let receiver = canonical_key(&entry.receiver, false)
            .ok_or_else(|| EngineError::UnkeyableType(entry.receiver.to_string()))?;
        let (expanded, alias) = key_pair(&entry.returns)
            .ok_or_else(|| EngineError::UnkeyableType(entry.returns.to_string()))?;

        let keys: SmallVec<[PairKey; 2]> = std::iter::once(expanded)
            .chain(alias)
            .map(|returns| PairKey {
                receiver: receiver.clone(),
                returns,
                qualifier: entry.qualifier.clone(),
            })
            .collect();

        for key in &keys {
            if let Some(&existing) = self.by_pair.get(key) {
                let existing = &self.entries[existing];
                if key.qualifier.is_none() {
                    return Err(EngineError::DuplicateProvider {
                        receiver: key.receiver.to_string(),
                        returns: key.returns.to_string(),
                        existing: existing.function.to_string(),
                        duplicate: entry.function.to_string(),
                    });
                }
                warn!(
                    receiver = %key.receiver,
                    returns = %key.returns,
                    qualifier = ?key.qualifier,
                    kept = %existing.function,
                    ignored = %entry.function,
                    "Duplicate qualified provider, keeping the first"
                );
            }
        }

        let index = self.entries.len();
        for key in keys {
            trace!(receiver = %key.receiver, returns = %key.returns, function = %entry.function, "Indexing provider");
            self.by_pair.entry(key).or_insert(index);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Number of providers registered so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends the registration phase.
    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        debug!(
            providers = self.entries.len(),
            keys = self.by_pair.len(),
            "Provider registry built"
        );
        ProviderRegistry {
            entries: self.entries,
            by_pair: self.by_pair,
        }
    }
}

/// Which nullability relaxation produced a provider match.
///
/// Variants are listed in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// Exact receiver and return nullability.
    Exact,
    /// Nullable source, provider on the non-null receiver.
    NonNullReceiver,
    /// As [`Relaxation::NonNullReceiver`], also returning non-null into a nullable target.
    NonNullReceiverAndReturn,
    /// Non-null source, provider on the nullable receiver.
    NullableReceiver,
    /// As [`Relaxation::NullableReceiver`], also returning non-null into a nullable target.
    NullableReceiverNonNullReturn,
    /// Provider returning non-null into a nullable target.
    NonNullReturn,
}

impl Relaxation {
    /// Whether the provider must be invoked with a null-safe call.
    #[inline]
    #[must_use]
    pub const fn needs_null_safe_call(self) -> bool {
        matches!(self, Self::NonNullReceiver | Self::NonNullReceiverAndReturn)
    }
}

/// A successful provider lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderMatch<'r> {
    /// The matched provider.
    pub entry: &'r ProviderEntry,
    /// The relaxation that matched.
    pub relaxation: Relaxation,
    /// Whether the invocation must use the null-safe form.
    pub null_safe: bool,
}

/// An immutable index of custom converters.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    by_pair: FxHashMap<PairKey, usize>,
}

impl ProviderRegistry {
    /// Number of registered providers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no providers are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates registered providers in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }

    /// Looks up a provider with exactly the given nullabilities.
    ///
    /// The receiver is keyed by its expansion; the return type keeps its alias
    /// spelling when it is an alias.
    #[must_use]
    pub fn find(
        &self,
        receiver: &TypeRef,
        returns: &TypeRef,
        qualifier: Option<&str>,
    ) -> Option<&ProviderEntry> {
        let key = PairKey {
            receiver: canonical_key(receiver, false)?,
            returns: canonical_key(returns, returns.is_alias())?,
            qualifier: km_core::non_blank(qualifier).map(str::to_owned),
        };
        self.by_pair.get(&key).map(|&i| &self.entries[i])
    }

    /// Looks up a provider, retrying with relaxed nullability.
    ///
    /// Attempts run in [`Relaxation`] order and the first hit wins. Relaxations
    /// that do not apply to the given nullabilities are skipped.
    #[must_use]
    pub fn lookup(
        &self,
        receiver: &TypeRef,
        returns: &TypeRef,
        qualifier: Option<&str>,
    ) -> Option<ProviderMatch<'_>> {
        attempts(receiver, returns)
            .into_iter()
            .find_map(|(src, dst, relaxation)| {
                self.find(&src, &dst, qualifier).map(|entry| ProviderMatch {
                    entry,
                    relaxation,
                    null_safe: relaxation.needs_null_safe_call(),
                })
            })
            .inspect(|hit| {
                trace!(
                    receiver = %receiver,
                    returns = %returns,
                    function = %hit.entry.function,
                    relaxation = ?hit.relaxation,
                    "Provider matched"
                );
            })
    }

    /// Resolves a provider for a conversion.
    ///
    /// A blank or absent qualifier returns `Ok(None)` when nothing matches so
    /// the caller can try other strategies.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingQualifiedProvider`] when a qualifier is
    /// given and no provider carries it.
    pub fn resolve(
        &self,
        receiver: &TypeRef,
        returns: &TypeRef,
        qualifier: Option<&str>,
    ) -> Result<Option<ProviderMatch<'_>>, EngineError> {
        let hit = self.lookup(receiver, returns, qualifier);
        match (hit, km_core::non_blank(qualifier)) {
            (None, Some(qualifier)) => Err(EngineError::MissingQualifiedProvider {
                site: format!("{receiver} -> {returns}"),
                receiver: receiver.to_string(),
                returns: returns.to_string(),
                qualifier: qualifier.to_owned(),
            }),
            (hit, _) => Ok(hit),
        }
    }
}

/// The ordered lookup attempts for a conversion.
fn attempts(src: &TypeRef, dst: &TypeRef) -> SmallVec<[(TypeRef, TypeRef, Relaxation); 6]> {
    let mut out = SmallVec::new();
    out.push((src.clone(), dst.clone(), Relaxation::Exact));
    if src.nullable {
        out.push((src.as_non_null(), dst.clone(), Relaxation::NonNullReceiver));
        if dst.nullable {
            out.push((
                src.as_non_null(),
                dst.as_non_null(),
                Relaxation::NonNullReceiverAndReturn,
            ));
        }
    } else {
        out.push((src.as_nullable(), dst.clone(), Relaxation::NullableReceiver));
        if dst.nullable {
            out.push((
                src.as_nullable(),
                dst.as_non_null(),
                Relaxation::NullableReceiverNonNullReturn,
            ));
        }
    }
    if dst.nullable {
        out.push((src.clone(), dst.as_non_null(), Relaxation::NonNullReturn));
    }
    out
}
