//! Bounded LRU cache of decoded resources

use alloc::vec::Vec;

use super::{LoadError, ResourceHandle, ResourceKind, ResourceSource};
use crate::config::{CacheConfig, Name};
use crate::traits::ResourceDecoder;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CacheKey {
    Named(Name),
    Inline { digest: u32, len: usize },
}

impl CacheKey {
    fn of(source: &ResourceSource) -> Self {
        match source {
            ResourceSource::Named(name) => CacheKey::Named(name.clone()),
            ResourceSource::Inline(bitmap) => CacheKey::Inline {
                digest: bitmap.digest(),
                len: bitmap.bytes().len(),
            },
        }
    }
}

#[derive(Debug)]
struct Entry {
    key: CacheKey,
    handle: ResourceHandle,
    pins: u16,
}

/// Entries of one kind, least recently used first
#[derive(Debug)]
struct Slots {
    entries: Vec<Entry>,
    capacity: usize,
}

impl Slots {
    fn new(capacity: u8) -> Self {
        let capacity = capacity.max(1) as usize;
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn position(&self, key: &CacheKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == *key)
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Mark `key` most recently used and return its handle
    fn touch(&mut self, key: &CacheKey) -> Option<ResourceHandle> {
        let index = self.position(key)?;
        let entry = self.entries.remove(index);
        let handle = entry.handle;
        self.entries.push(entry);
        Some(handle)
    }

    /// Index of the least recently used unpinned entry
    fn victim(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.pins == 0)
    }

    fn entry_mut(&mut self, handle: &ResourceHandle) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.handle.asset == handle.asset)
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub evictions: u32,
    pub load_failures: u32,
}

/// Font, icon and background cache
///
/// Each kind has its own slot budget. Inserting into a full kind evicts its
/// least recently used unpinned entry and releases the asset back to the
/// decoder. Pins are reference counts: a resource pinned twice needs two
/// unpins before it becomes evictable.
pub struct ResourceCache<D: ResourceDecoder> {
    decoder: D,
    fonts: Slots,
    icons: Slots,
    backgrounds: Slots,
    stats: CacheStats,
}

impl<D: ResourceDecoder> ResourceCache<D> {
    pub fn new(decoder: D, config: &CacheConfig) -> Self {
        Self {
            decoder,
            fonts: Slots::new(config.font_slots),
            icons: Slots::new(config.icon_slots),
            backgrounds: Slots::new(config.background_slots),
            stats: CacheStats::default(),
        }
    }

    fn slots(&self, kind: ResourceKind) -> &Slots {
        match kind {
            ResourceKind::Font => &self.fonts,
            ResourceKind::Icon => &self.icons,
            ResourceKind::Background => &self.backgrounds,
        }
    }

    fn slots_mut(&mut self, kind: ResourceKind) -> &mut Slots {
        match kind {
            ResourceKind::Font => &mut self.fonts,
            ResourceKind::Icon => &mut self.icons,
            ResourceKind::Background => &mut self.backgrounds,
        }
    }

    /// Return the cached handle for `source`, decoding it on a miss
    pub fn get_or_load(
        &mut self,
        kind: ResourceKind,
        source: &ResourceSource,
    ) -> Result<ResourceHandle, LoadError> {
        let key = CacheKey::of(source);

        if let Some(handle) = self.slots_mut(kind).touch(&key) {
            self.stats.hits += 1;
            return Ok(handle);
        }
        self.stats.misses += 1;

        let full = self.slots(kind).is_full();
        if full && self.slots(kind).victim().is_none() {
            warn!("{} cache: every slot pinned, cannot load '{}'", kind, source.label());
            self.stats.load_failures += 1;
            return Err(LoadError::Exhausted);
        }

        // Cached entries stay put until the replacement has decoded
        let decoded = match self.decoder.decode(kind, source) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.load_failures += 1;
                warn!("{} '{}' failed to load: {}", kind, source.label(), e);
                return Err(e);
            }
        };

        if full {
            if let Some(index) = self.slots(kind).victim() {
                let evicted = self.slots_mut(kind).entries.remove(index);
                debug!("{} cache: evicting asset {}", kind, evicted.handle.asset);
                self.decoder.release(evicted.handle.asset);
                self.stats.evictions += 1;
            }
        }
        let handle = ResourceHandle {
            kind,
            asset: decoded.asset,
            width: decoded.width,
            height: decoded.height,
        };
        trace!("{} '{}' loaded as asset {}", kind, source.label(), handle.asset);
        self.slots_mut(kind).entries.push(Entry {
            key,
            handle,
            pins: 0,
        });
        Ok(handle)
    }

    /// Protect a handle from eviction
    pub fn pin(&mut self, handle: &ResourceHandle) {
        if let Some(entry) = self.slots_mut(handle.kind).entry_mut(handle) {
            entry.pins = entry.pins.saturating_add(1);
        }
    }

    /// Drop one pin from a handle
    pub fn unpin(&mut self, handle: &ResourceHandle) {
        if let Some(entry) = self.slots_mut(handle.kind).entry_mut(handle) {
            entry.pins = entry.pins.saturating_sub(1);
        }
    }

    /// Current pin count; 0 for handles no longer cached
    pub fn pin_count(&self, handle: &ResourceHandle) -> u16 {
        self.slots(handle.kind)
            .entries
            .iter()
            .find(|e| e.handle.asset == handle.asset)
            .map_or(0, |e| e.pins)
    }

    /// Whether `source` is currently cached
    pub fn contains(&self, kind: ResourceKind, source: &ResourceSource) -> bool {
        self.slots(kind).position(&CacheKey::of(source)).is_some()
    }

    /// Whether a handle is still cached
    pub fn holds(&self, handle: &ResourceHandle) -> bool {
        self.slots(handle.kind)
            .entries
            .iter()
            .any(|e| e.handle.asset == handle.asset)
    }

    /// Number of cached entries of `kind`
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.slots(kind).entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }
}
