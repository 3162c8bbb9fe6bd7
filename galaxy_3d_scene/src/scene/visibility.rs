/// Visibility filters: which drawables take part in a render pass.
///
/// Cullable drawables use an exact match: every bit of the pass must be
/// set in the drawable's mask, `(mask & pass) == pass`. With a single-bit
/// pass this is plain membership; with a multi-bit pass it selects only
/// drawables belonging to all of those stages.
///
/// Free drawables use any-overlap, `(mask & pass) != 0`.

use rustc_hash::FxHashMap;
use super::passes::RenderPasses;

/// Predicate for one pass value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassFilter {
    pass: RenderPasses,
}

impl PassFilter {
    pub fn new(pass: RenderPasses) -> Self {
        Self { pass }
    }

    pub fn pass(&self) -> RenderPasses {
        self.pass
    }

    /// Exact match, used for cullable drawables
    pub fn matches(&self, mask: RenderPasses) -> bool {
        mask.contains(self.pass)
    }

    /// Any overlap, used for free drawables
    pub fn matches_any(&self, mask: RenderPasses) -> bool {
        mask.intersects(self.pass)
    }
}

/// Filters derived once per distinct pass value
#[derive(Debug, Default)]
pub struct FilterCache {
    filters: FxHashMap<RenderPasses, PassFilter>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, pass: RenderPasses) -> PassFilter {
        *self.filters.entry(pass).or_insert_with(|| PassFilter::new(pass))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
