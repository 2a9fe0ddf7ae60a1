//! Factory resolution: choosing the callable that constructs a target type.

use km_core::{CalleeDescriptor, FxHashMap};
use tracing::debug;

use crate::error::EngineError;

/// Factories grouped by the type they build.
#[derive(Debug, Default)]
pub struct FactoryIndex {
    by_target: FxHashMap<String, Vec<CalleeDescriptor>>,
}

impl FactoryIndex {
    /// Indexes factories by [`CalleeDescriptor::target_name`], keeping
    /// declaration order within each target.
    #[must_use]
    pub fn new(factories: &[CalleeDescriptor]) -> Self {
        let mut by_target: FxHashMap<String, Vec<CalleeDescriptor>> = FxHashMap::default();
        for factory in factories {
            by_target
                .entry(factory.target_name())
                .or_default()
                .push(factory.clone());
        }
        Self { by_target }
    }

    /// Number of indexed factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    /// Returns `true` if no factories are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    /// Chooses the factory that builds `target`.
    ///
    /// 1. The first candidate whose qualifier is in `wanted`.
    /// 2. Otherwise the unqualified candidate.
    /// 3. Otherwise `None`: construct with the primary constructor.
    ///
    /// A wanted qualifier with no candidate is not an error; the search falls
    /// through to the next step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateFactory`] if two candidates for
    /// `target` share a qualifier (including two unqualified candidates).
    ///
    /// # Examples
    ///
    /// ```
    /// use km_core::{CalleeDescriptor, CalleeRef, FunctionRef, TypeRef};
    /// use km_engine::FactoryIndex;
    ///
    /// let make = |name: &str| CalleeDescriptor::new(
    ///     CalleeRef::Function(FunctionRef::new("a", name)),
    ///     TypeRef::new("a.Entity"),
    /// );
    /// let index = FactoryIndex::new(&[make("plain"), make("grouped").with_qualifier("group")]);
    ///
    /// let chosen = index.resolve("a.Entity", &["group".to_owned()]).unwrap().unwrap();
    /// assert_eq!(chosen.callee.display_name(), "a.grouped");
    ///
    /// let chosen = index.resolve("a.Entity", &[]).unwrap().unwrap();
    /// assert_eq!(chosen.callee.display_name(), "a.plain");
    /// ```
    pub fn resolve(
        &self,
        target: &str,
        wanted: &[String],
    ) -> Result<Option<&CalleeDescriptor>, EngineError> {
        let Some(candidates) = self.by_target.get(target) else {
            return Ok(None);
        };

        check_duplicates(target, candidates)?;

        let chosen = candidates
            .iter()
            .find(|c| c.qualifier().is_some_and(|q| wanted.iter().any(|w| w == q)))
            .or_else(|| candidates.iter().find(|c| c.qualifier().is_none()));

        if let Some(factory) = chosen {
            debug!(
                target,
                factory = %factory.callee.display_name(),
                qualifier = factory.qualifier().unwrap_or(""),
                "Resolved factory"
            );
        }
        Ok(chosen)
    }
}

/// Rejects candidates that share a qualifier label.
fn check_duplicates(target: &str, candidates: &[CalleeDescriptor]) -> Result<(), EngineError> {
    let mut groups: Vec<(Option<&str>, Vec<String>)> = Vec::new();
    for candidate in candidates {
        let label = candidate.qualifier();
        let name = candidate.callee.display_name();
        match groups.iter_mut().find(|(q, _)| *q == label) {
            Some((_, names)) => names.push(name),
            None => groups.push((label, vec![name])),
        }
    }
    match groups.into_iter().find(|(_, names)| names.len() > 1) {
        Some((qualifier, candidates)) => Err(EngineError::DuplicateFactory {
            target: target.to_owned(),
            qualifier: qualifier.map(str::to_owned),
            candidates,
        }),
        None => Ok(()),
    }
}
