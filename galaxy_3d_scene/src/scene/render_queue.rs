/// Render queue: per-pass draw order.
///
/// Rebuilt for every pass of every frame: `clear`, `add_range` for the
/// visible cullable items and then the free items, `sort`, iterate.
///
/// The key of each item is supplied by the item itself (usually its
/// squared distance to the viewpoint). The queue only defines the
/// comparison: ascending for front-to-back passes, descending for
/// back-to-front ones, ties broken by insertion order.
///
/// `sort` packs (key, insertion index) into one u64 and radix-sorts it,
/// so equal keys keep their insertion order even though the sort itself
/// is unstable.

use std::cmp::Ordering;
use glam::Vec3;
use rdst::{RadixKey, RadixSort};

/// Per-item ordering key (squared distance; smaller = closer)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct RenderOrderKey(pub f32);

impl RenderOrderKey {
    /// Neutral key used by drawables without a meaningful anchor
    pub const NEUTRAL: RenderOrderKey = RenderOrderKey(0.0);

    /// Squared distance from `viewpoint` to `anchor`
    pub fn from_distance(viewpoint: Vec3, anchor: Vec3) -> Self {
        Self(viewpoint.distance_squared(anchor))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Bits whose unsigned order matches the float order
    fn ordered_bits(self) -> u32 {
        let bits = self.0.to_bits();
        if bits & 0x8000_0000 != 0 { !bits } else { bits | 0x8000_0000 }
    }
}

/// One queued item
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<T> {
    pub item: T,
    pub key: RenderOrderKey,
    /// Position in insertion order
    pub index: u32,
    sort_key: u64,
}

impl<T> RadixKey for RenderItem<T> {
    const LEVELS: usize = 8;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.sort_key >> (level * 8)) as u8
    }
}

pub struct RenderQueue<T> {
    items: Vec<RenderItem<T>>,
}

impl<T: Copy + Send + Sync> RenderQueue<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append one item with its key
    pub fn push(&mut self, item: T, key: RenderOrderKey) {
        let index = self.items.len() as u32;
        self.items.push(RenderItem { item, key, index, sort_key: 0 });
    }

    /// Append `items`, asking `key_of` for each item's key at `viewpoint`
    pub fn add_range<I, F>(&mut self, items: I, viewpoint: Vec3, mut key_of: F)
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T, Vec3) -> RenderOrderKey,
    {
        for item in items {
            let key = key_of(&item, viewpoint);
            self.push(item, key);
        }
    }

    /// Default ordering: ascending key, or descending when `back_to_front`.
    /// Ties keep insertion order either way.
    pub fn sort(&mut self, back_to_front: bool) {
        for entry in &mut self.items {
            let bits = entry.key.ordered_bits();
            let bits = if back_to_front { !bits } else { bits };
            entry.sort_key = ((bits as u64) << 32) | entry.index as u64;
        }
        self.items.radix_sort_unstable();
    }

    /// Custom ordering (stable)
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&RenderItem<T>, &RenderItem<T>) -> Ordering,
    {
        self.items.sort_by(|a, b| compare(a, b));
    }

    /// Items in their current order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.items.iter().map(|entry| entry.item)
    }

    pub fn entries(&self) -> &[RenderItem<T>] {
        &self.items
    }
}

impl<T: Copy + Send + Sync> Default for RenderQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "render_queue_tests.rs"]
mod tests;
