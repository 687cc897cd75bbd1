//! Lookup index over the parsed model.
//!
//! Address indices hold positions into the owning collection, stable-sorted
//! by address, plus a max-tree over entry end addresses in that order. A
//! containment query is the last sorted position starting at or below the
//! address whose end still lies above it, found by one descent of the tree.
//! Overlapping and nested entries cost the same `O(log n)` as disjoint ones.

use crate::model::{ElfModel, Section, Symbol};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// An entry with an address range and a name.
pub trait Addressed {
    fn address(&self) -> u64;
    fn size(&self) -> u64;
    fn name(&self) -> &str;

    /// One past the last covered address, saturating at `u64::MAX`.
    fn end(&self) -> u64 {
        self.address().saturating_add(self.size())
    }

    /// `address <= addr < address + size`. Zero-size entries cover nothing.
    fn contains(&self, addr: u64) -> bool {
        self.address() <= addr && addr < self.end()
    }
}

impl Addressed for Symbol {
    fn address(&self) -> u64 {
        self.address
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Addressed for Section {
    fn address(&self) -> u64 {
        self.address
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Positions into a `[T]`, ascending by address, ties in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressIndex<T> {
    order: Vec<usize>,
    starts: Vec<u64>,
    /// Implicit binary tree, root at 1, leaf for sorted position `p` at
    /// `leaves + p`. Each node holds the greatest end below it.
    ends: Vec<u64>,
    leaves: usize,
    _entry: PhantomData<fn() -> T>,
}

impl<T> Default for AddressIndex<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            starts: Vec::new(),
            ends: vec![0; 2],
            leaves: 1,
            _entry: PhantomData,
        }
    }
}

impl<T: Addressed> AddressIndex<T> {
    pub fn build(items: &[T]) -> Self {
        Self::build_filtered(items, |_| true)
    }

    /// Index only the entries accepted by `keep`.
    pub fn build_filtered(items: &[T], keep: impl Fn(&T) -> bool) -> Self {
        let mut order: Vec<usize> = (0..items.len()).filter(|&i| keep(&items[i])).collect();
        // sort_by_key is stable
        order.sort_by_key(|&i| items[i].address());

        let starts = order.iter().map(|&i| items[i].address()).collect();

        // Padding leaves hold 0, which never lies above a queried address.
        let leaves = order.len().next_power_of_two();
        let mut ends = vec![0u64; 2 * leaves];
        for (pos, &i) in order.iter().enumerate() {
            ends[leaves + pos] = items[i].end();
        }
        for node in (1..leaves).rev() {
            ends[node] = ends[2 * node].max(ends[2 * node + 1]);
        }

        Self {
            order,
            starts,
            ends,
            leaves,
            _entry: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of sorted entries whose address is `<= addr`.
    fn upper_bound(&self, addr: u64) -> usize {
        self.starts.partition_point(|&start| start <= addr)
    }

    /// The entry covering `addr`.
    ///
    /// When several entries cover it, the one with the greatest start
    /// address wins; equal starts resolve to the last in original order.
    pub fn containing<'a>(&self, items: &'a [T], addr: u64) -> Option<&'a T> {
        let upper = self.upper_bound(addr);
        self.last_reaching(1, 0, self.leaves, upper, addr)
            .map(|pos| &items[self.order[pos]])
    }

    /// Greatest sorted position below `upper` whose end is above `addr`,
    /// searching the subtree `node` that spans positions `[lo, hi)`.
    ///
    /// Every position below `upper` starts at or below `addr`, so the entry
    /// found covers `addr`. Zero-size entries end at their start and are
    /// never found.
    fn last_reaching(
        &self,
        node: usize,
        lo: usize,
        hi: usize,
        upper: usize,
        addr: u64,
    ) -> Option<usize> {
        if lo >= upper || self.ends[node] <= addr {
            return None;
        }
        if hi - lo == 1 {
            return Some(lo);
        }
        let mid = lo + (hi - lo) / 2;
        self.last_reaching(2 * node + 1, mid, hi, upper, addr)
            .or_else(|| self.last_reaching(2 * node, lo, mid, upper, addr))
    }

    /// The entry with the greatest address `<= addr`.
    pub fn nearest_at_or_below<'a>(&self, items: &'a [T], addr: u64) -> Option<&'a T> {
        let upper = self.upper_bound(addr);
        if upper == 0 {
            return None;
        }
        Some(&items[self.order[upper - 1]])
    }

    /// Entries whose address lies in `[start, end)`, ascending.
    pub fn in_range<'a>(
        &'a self,
        items: &'a [T],
        start: u64,
        end: u64,
    ) -> impl Iterator<Item = &'a T> + 'a {
        let lo = self.starts.partition_point(|&a| a < start);
        let hi = self.starts.partition_point(|&a| a < end).max(lo);
        self.order[lo..hi].iter().map(move |&i| &items[i])
    }

    /// Entries in address order.
    pub fn iter<'a>(&'a self, items: &'a [T]) -> impl Iterator<Item = &'a T> + 'a {
        self.order.iter().map(move |&i| &items[i])
    }
}

/// Exact-name map. Later duplicates replace earlier ones; empty names are
/// never indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    map: HashMap<String, usize>,
}

impl NameIndex {
    pub fn build<T: Addressed>(items: &[T]) -> Self {
        let mut map = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if !item.name().is_empty() {
                map.insert(item.name().to_string(), i);
            }
        }
        Self { map }
    }

    pub fn get<'a, T>(&self, items: &'a [T], name: &str) -> Option<&'a T> {
        self.map.get(name).and_then(|&i| items.get(i))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// All lookup structures for one model, built together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupIndex {
    pub symbols_by_address: AddressIndex<Symbol>,
    pub functions_by_address: AddressIndex<Symbol>,
    pub symbols_by_name: NameIndex,
    pub sections_by_address: AddressIndex<Section>,
    pub sections_by_name: NameIndex,
}

impl LookupIndex {
    pub fn build(model: &ElfModel) -> Self {
        let index = Self {
            symbols_by_address: AddressIndex::build(&model.symbols),
            functions_by_address: AddressIndex::build_filtered(&model.symbols, Symbol::is_function),
            symbols_by_name: NameIndex::build(&model.symbols),
            sections_by_address: AddressIndex::build(&model.sections),
            sections_by_name: NameIndex::build(&model.sections),
        };
        debug!(
            symbols = index.symbols_by_address.len(),
            functions = index.functions_by_address.len(),
            named_symbols = index.symbols_by_name.len(),
            sections = index.sections_by_address.len(),
            "Built lookup index"
        );
        index
    }
}
