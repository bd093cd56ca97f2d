//! String-keyed hash table with chained buckets.
//!
//! Every resource collection in the store is a [`HashTable`]: the namespaces of a
//! cluster, the four per-kind tables of a namespace, and the small maps carried by
//! entities (annotations, labels, ports, secret data).
//!
//! The bucket count is fixed at construction. Each bucket is a singly linked chain
//! with the most recently inserted key at its head, so iteration order is derived
//! from the hash and the bucket count, not from global insertion order.
//!
//! Ownership follows two distinct paths:
//!
//! - overwriting a key, and dropping the table, hand the outgoing value to the
//!   table's destructor (or simply drop it when none is registered);
//! - [`HashTable::remove`] detaches the value and returns it to the caller without
//!   running the destructor.

use std::fmt;
use std::mem;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Receives the key and the outgoing value when an entry is overwritten or when
/// the table is dropped.
pub type Destructor<V> = Arc<dyn Fn(&str, V) + Send + Sync>;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for b in bytes {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

type Link<V> = Option<Box<Entry<V>>>;

struct Entry<V> {
    key: Box<str>,
    value: V,
    next: Link<V>,
}

pub struct HashTable<V> {
    buckets: Box<[Link<V>]>,
    len: usize,
    destructor: Option<Destructor<V>>,
}

/// Resumable position inside a [`HashTable`], owned by the caller.
///
/// A cursor records a bucket index and an offset into that bucket's chain. The
/// table may be mutated between calls to [`HashTable::iterate`] as long as no key
/// is inserted into or removed from the bucket the cursor currently occupies or
/// any bucket it has not reached yet; otherwise entries may be skipped or visited
/// twice. Changes to buckets the cursor has already left are always safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    bucket: usize,
    position: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

// === impl HashTable ===

impl<V> HashTable<V> {
    /// Creates a table with `capacity` buckets. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Creates a table whose overwritten and remaining values are passed to `destructor`.
    pub fn with_destructor(capacity: usize, destructor: Destructor<V>) -> Self {
        Self::build(capacity, Some(destructor))
    }

    fn build(capacity: usize, destructor: Option<Destructor<V>>) -> Self {
        let buckets = (0..capacity.max(1)).map(|_| None).collect();
        Self {
            buckets,
            len: 0,
            destructor,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, key: &str) -> usize {
        fnv1a(key.as_bytes()) as usize % self.buckets.len()
    }

    fn chain(&self, bucket: usize) -> Chain<'_, V> {
        Chain {
            next: self.buckets[bucket].as_deref(),
        }
    }

    /// Inserts `value` under `key`. An existing value for the key is replaced in
    /// place and handed to the destructor.
    pub fn insert(&mut self, key: &str, value: V) {
        let bucket = self.bucket_of(key);
        if let Some(entry) = find_mut(self.buckets[bucket].as_deref_mut(), key) {
            let old = mem::replace(&mut entry.value, value);
            if let Some(destroy) = &self.destructor {
                destroy(key, old);
            }
            return;
        }

        let next = self.buckets[bucket].take();
        self.buckets[bucket] = Some(Box::new(Entry {
            key: key.into(),
            value,
            next,
        }));
        self.len += 1;
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.chain(self.bucket_of(key))
            .find(|e| &*e.key == key)
            .map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let bucket = self.bucket_of(key);
        find_mut(self.buckets[bucket].as_deref_mut(), key).map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value for `key`, inserting `make()` at the head of its chain
    /// first if the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: &str, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let bucket = self.bucket_of(key);
        if !self.chain(bucket).any(|e| &*e.key == key) {
            let next = self.buckets[bucket].take();
            self.len += 1;
            let head = self.buckets[bucket].insert(Box::new(Entry {
                key: key.into(),
                value: make(),
                next,
            }));
            return &mut head.value;
        }
        match find_mut(self.buckets[bucket].as_deref_mut(), key) {
            Some(entry) => &mut entry.value,
            None => unreachable!("key {key:?} vanished from bucket {bucket}"),
        }
    }

    /// Detaches the entry for `key` and returns its value. The destructor is not
    /// run; the caller owns the value from here on. Removing an absent key returns
    /// `None` and changes nothing.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let bucket = self.bucket_of(key);
        let position = self.chain(bucket).position(|e| &*e.key == key)?;

        let mut link = &mut self.buckets[bucket];
        for _ in 0..position {
            link = &mut link.as_mut()?.next;
        }
        let mut entry = link.take()?;
        *link = entry.next.take();
        self.len -= 1;

        let Entry { value, .. } = *entry;
        Some(value)
    }

    /// Returns the entry at `cursor` and advances it, or `None` once every bucket
    /// has been visited. See [`Cursor`] for what may change between calls.
    pub fn iterate(&self, cursor: &mut Cursor) -> Option<(&str, &V)> {
        while cursor.bucket < self.buckets.len() {
            if let Some(entry) = self.chain(cursor.bucket).nth(cursor.position) {
                cursor.position += 1;
                return Some((&entry.key, &entry.value));
            }
            cursor.bucket += 1;
            cursor.position = 0;
        }
        None
    }

    /// Visits every entry once, in bucket order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: Chain { next: None },
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

fn find_mut<'a, V>(mut cur: Option<&'a mut Entry<V>>, key: &str) -> Option<&'a mut Entry<V>> {
    while let Some(entry) = cur {
        if &*entry.key == key {
            return Some(entry);
        }
        cur = entry.next.as_deref_mut();
    }
    None
}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        let destructor = self.destructor.take();
        // Unlink chains iteratively rather than through recursive `Box` drops.
        for slot in self.buckets.iter_mut() {
            let mut link = slot.take();
            while let Some(mut entry) = link {
                link = entry.next.take();
                let Entry { key, value, .. } = *entry;
                if let Some(destroy) = &destructor {
                    destroy(&key, value);
                }
            }
        }
        self.len = 0;
    }
}

impl<V: Clone> Clone for HashTable<V> {
    fn clone(&self) -> Self {
        let buckets = self
            .buckets
            .iter()
            .map(|slot| {
                let entries: Vec<&Entry<V>> = Chain { next: slot.as_deref() }.collect();
                entries.into_iter().rev().fold(None, |next: Link<V>, e| {
                    Some(Box::new(Entry {
                        key: e.key.clone(),
                        value: e.value.clone(),
                        next,
                    }))
                })
            })
            .collect();
        Self {
            buckets,
            len: self.len,
            destructor: self.destructor.clone(),
        }
    }
}

impl<V: PartialEq> PartialEq for HashTable<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<V: fmt::Debug> fmt::Debug for HashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: Serialize> Serialize for HashTable<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for HashTable<V> {
    /// Sizes the table to the iterator's lower size bound.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut table = Self::new(iter.size_hint().0);
        for (k, v) in iter {
            table.insert(k.as_ref(), v);
        }
        table
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// === impl Chain ===

struct Chain<'a, V> {
    next: Option<&'a Entry<V>>,
}

impl<'a, V> Iterator for Chain<'a, V> {
    type Item = &'a Entry<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.next?;
        self.next = entry.next.as_deref();
        Some(entry)
    }
}

// === impl Iter ===

pub struct Iter<'a, V> {
    buckets: std::slice::Iter<'a, Link<V>>,
    chain: Chain<'a, V>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.chain.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some((&entry.key, &entry.value));
            }
            self.chain = Chain {
                next: self.buckets.next()?.as_deref(),
            };
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
