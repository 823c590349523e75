//! A low-level open-addressing hash table with linear probing.
//!
//! [`HashTable<V>`] stores values of type `V` and leaves hashing and equality
//! to the caller: every operation takes the 64-bit hash of the key it is
//! looking for and a predicate that recognizes the matching value.
//! [`HashMap`](crate::HashMap) layers a conventional key/value API on top.
//!
//! Erased slots become tombstones that probes skip over. Tombstones are only
//! reclaimed when the table is rebuilt, which happens when live values plus
//! tombstones would exceed `1 / LOAD_LIMIT` of the slots.
//!
//! Iteration yields values in insertion order, independent of their slot
//! positions and unaffected by rehashes.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::error::Error;
use crate::error::infallible;
use crate::order::NIL;
use crate::order::OrderIndex;
use crate::slot_store::EMPTY;
use crate::slot_store::OCCUPIED;
use crate::slot_store::SlotStore;
use crate::slot_store::TOMBSTONE;

/// Smallest number of slots a table ever has.
pub const MIN_CAPACITY: usize = 8;

cfg_if::cfg_if! {
    if #[cfg(feature = "load-quarter")] {
        /// The table grows once `(live + tombstones) * LOAD_LIMIT` would
        /// exceed the slot count.
        pub const LOAD_LIMIT: usize = 4;
        /// A rebuilt table has `live * GROWTH_FACTOR` slots.
        pub const GROWTH_FACTOR: usize = 8;
    } else if #[cfg(feature = "load-half")] {
        /// The table grows once `(live + tombstones) * LOAD_LIMIT` would
        /// exceed the slot count.
        pub const LOAD_LIMIT: usize = 2;
        /// A rebuilt table has `live * GROWTH_FACTOR` slots.
        pub const GROWTH_FACTOR: usize = 4;
    } else {
        /// The table grows once `(live + tombstones) * LOAD_LIMIT` would
        /// exceed the slot count.
        pub const LOAD_LIMIT: usize = 4;
        /// A rebuilt table has `live * GROWTH_FACTOR` slots.
        pub const GROWTH_FACTOR: usize = 8;
    }
}

// A rebuilt table must satisfy its own load limit, and the limit must leave at
// least one empty slot so that every probe terminates.
const _: () = assert!(GROWTH_FACTOR >= LOAD_LIMIT && LOAD_LIMIT >= 2);

#[inline(always)]
fn home_slot(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

/// Slot count for a table that must hold `len` values right after a rebuild.
#[inline]
fn slots_for(len: usize) -> Result<usize, Error> {
    len.checked_mul(GROWTH_FACTOR)
        .map(|slots| slots.max(MIN_CAPACITY))
        .ok_or(Error::CapacityOverflow)
}

/// First empty slot on the probe sequence of `hash`.
///
/// Only valid when the key is known to be absent from `store`.
#[inline]
fn vacant_slot<V>(store: &SlotStore<V>, hash: u64) -> usize {
    let capacity = store.capacity();
    let mut index = home_slot(hash, capacity);
    while store.tag(index) != EMPTY {
        index += 1;
        if index == capacity {
            index = 0;
        }
    }
    index
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

/// Debug statistics for hash table analysis.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live values
    pub populated: usize,
    /// Number of erased slots not yet reclaimed
    pub tombstones: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Live values over slots
    pub load_factor: f64,
    /// (Live values + tombstones) over slots
    pub occupancy: f64,
    /// Longest distance between a value and its home slot
    pub max_probe: usize,
    /// Mean distance between a value and its home slot
    pub mean_probe: f64,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Tombstones: {} ({:.2}% occupancy with live values)",
            self.tombstones,
            self.occupancy * 100.0
        );
        println!(
            "Probe length: max {}, mean {:.3}",
            self.max_probe, self.mean_probe
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// An open-addressing hash table using linear probing.
///
/// `HashTable<V>` stores values of type `V` and provides insertion, lookup,
/// and removal in amortized constant time. Like other low-level tables, it
/// requires you to provide both the hash value and an equality predicate for
/// each operation. The hash of every value is cached, so the table never
/// needs to rehash keys itself.
///
/// Values are iterated in the order they were first inserted.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use lin_hash::hash_table::Entry;
/// # use lin_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// assert_eq!(table.len(), 1);
/// ```
pub struct HashTable<V> {
    store: SlotStore<V>,
    order: OrderIndex,

    populated: usize,
    tombstones: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity())
            .field(
                "slots",
                &self
                    .store
                    .tags()
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|tag| match *tag {
                                EMPTY => "..",
                                OCCUPIED => "##",
                                _ => "xx",
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<String>>(),
            )
            .finish()
    }
}

impl<V> Clone for HashTable<V>
where
    V: Clone,
{
    /// Copies the table into a fresh, right-sized allocation.
    ///
    /// Values are re-inserted in iteration order, so the clone iterates in
    /// the same order. Tombstones are not carried over.
    fn clone(&self) -> Self {
        let mut table = Self::with_capacity(self.populated);

        let mut cursor = self.order.head();
        while cursor != NIL {
            let hash = self.store.hashes()[cursor];
            // SAFETY: Every slot reachable through the order index is occupied.
            let value = unsafe { self.store.get_unchecked(cursor) }.clone();

            let index = vacant_slot(&table.store, hash);
            table.insert_new(index, hash, value);

            cursor = self.store.links()[cursor].next;
        }

        debug_assert_eq!(table.populated, self.populated);
        table
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with `MIN_CAPACITY` slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// # use lin_hash::hash_table::MIN_CAPACITY;
    /// #
    /// let table: HashTable<u32> = HashTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), MIN_CAPACITY);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a table sized for `len` values.
    ///
    /// The slot count is `max(MIN_CAPACITY, len * GROWTH_FACTOR)`, so inserting
    /// `len` values does not trigger a rehash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::GROWTH_FACTOR;
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 100 * GROWTH_FACTOR);
    /// ```
    pub fn with_capacity(len: usize) -> Self {
        infallible(Self::try_with_capacity(len))
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(len: usize) -> Result<Self, Error> {
        Ok(Self {
            store: SlotStore::try_with_capacity(slots_for(len)?)?,
            order: OrderIndex::new(),
            populated: 0,
            tombstones: 0,
        })
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots in the backing array.
    ///
    /// This is not the number of values the table can hold without growing;
    /// the table grows once live values plus tombstones exceed
    /// `capacity() / LOAD_LIMIT`.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Returns an iterator over all values in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for n in [30u64, 10, 20] {
    ///     table.entry(n, |&v: &u64| v == n).or_insert(n);
    /// }
    ///
    /// let values: Vec<u64> = table.iter().copied().collect();
    /// assert_eq!(values, [30, 10, 20]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            front: self.order.head(),
            back: self.order.tail(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over mutable references to all values in
    /// insertion order.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            front: self.order.head(),
            back: self.order.tail(),
            remaining: self.populated,
            store: &self.store,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields all values in insertion
    /// order.
    ///
    /// When the iterator is dropped the table is left as after
    /// [`clear`](Self::clear), whether or not it was fully consumed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |&v: &u64| v == 1).or_insert(1);
    /// table.entry(2, |&v: &u64| v == 2).or_insert(2);
    ///
    /// let values: Vec<u64> = table.drain().collect();
    /// assert_eq!(values, [1, 2]);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain { table: self }
    }

    /// Removes all values and shrinks the table back to `MIN_CAPACITY` slots,
    /// discarding every tombstone.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// # use lin_hash::hash_table::MIN_CAPACITY;
    /// #
    /// let mut table = HashTable::with_capacity(100);
    /// table.entry(7, |&v: &u64| v == 7).or_insert(7);
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), MIN_CAPACITY);
    /// ```
    pub fn clear(&mut self) {
        log::trace!(
            "clearing table with {} values, {} tombstones",
            self.populated,
            self.tombstones
        );

        match SlotStore::try_with_capacity(MIN_CAPACITY) {
            Ok(store) => {
                let old = core::mem::replace(&mut self.store, store);
                self.order = OrderIndex::new();
                self.populated = 0;
                self.tombstones = 0;
                drop(old);
            }
            Err(err) => {
                log::warn!("clear could not shrink the table ({err}), resetting in place");
                self.order = OrderIndex::new();
                self.populated = 0;
                self.tombstones = 0;
                self.store.reset();
            }
        }
    }

    /// Rebuilds the table with `max(MIN_CAPACITY, len * GROWTH_FACTOR)` slots
    /// if that is smaller than now, and reclaims all tombstones.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// # use lin_hash::hash_table::MIN_CAPACITY;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// table.entry(42, |&v| v == 5).or_insert(5);
    ///
    /// table.shrink_to_fit();
    /// assert!(table.capacity() < 1000);
    /// assert!(table.capacity() >= MIN_CAPACITY);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        let Ok(target) = slots_for(self.populated) else {
            return;
        };
        let target = target.min(self.capacity());

        if target < self.capacity() || self.tombstones > 0 {
            if let Err(err) = self.try_rehash(target) {
                log::warn!("shrink_to_fit skipped: {err}");
            }
        }
    }

    /// Reserves room for at least `additional` more values.
    ///
    /// After this call, inserting `additional` new values does not rehash.
    /// Does nothing if the table already has room.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(50);
    ///
    /// let capacity = table.capacity();
    /// for n in 0..50u64 {
    ///     table.entry(n, |&v| v == n).or_insert(n);
    /// }
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.try_reserve(additional));
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        if self.needs_growth(additional) {
            let required = self
                .populated
                .checked_add(additional)
                .ok_or(Error::CapacityOverflow)?;
            let capacity = slots_for(required)?.max(self.capacity());
            self.try_rehash(capacity)?;
        }
        Ok(())
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// The slot becomes a tombstone; removal never rehashes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use lin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        match self.locate(hash, eq) {
            // SAFETY: `locate` only reports occupied slots as found.
            Probe::Found(index) => Some(unsafe { self.remove_at(index) }),
            Probe::Vacant(_) => None,
        }
    }

    /// Keeps only the values for which `keep` returns `true`, preserving the
    /// order of the survivors.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut V) -> bool) {
        let mut cursor = self.order.head();
        while cursor != NIL {
            let next = self.store.links()[cursor].next;

            // SAFETY: Every slot reachable through the order index is occupied.
            if !keep(unsafe { self.store.get_unchecked_mut(cursor) }) {
                // SAFETY: As above; `keep` cannot reach the table.
                drop(unsafe { self.remove_at(cursor) });
            }

            cursor = next;
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If the entry is vacant and inserting one more value would cross the
    /// load limit, the table is rebuilt first so that
    /// [`VacantEntry::insert`] cannot fail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use lin_hash::hash_table::Entry;
    /// # use lin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().push('!');
    ///     }
    /// }
    ///
    /// // The first value inserted for a key is kept.
    /// table
    ///     .entry(hash, |s: &String| s == "hello")
    ///     .or_insert("ignored".to_string());
    /// assert_eq!(table.len(), 1);
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        infallible(self.try_entry(hash, eq))
    }

    /// Fallible version of [`entry`](Self::entry). Fails only if growing the
    /// table fails, in which case the table is unchanged.
    pub fn try_entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Result<Entry<'_, V>, Error> {
        match self.locate(hash, eq) {
            Probe::Found(index) => Ok(Entry::Occupied(OccupiedEntry { table: self, index })),
            Probe::Vacant(mut index) => {
                if self.needs_growth(1) {
                    self.try_rehash(slots_for(self.populated + 1)?)?;
                    index = vacant_slot(&self.store, hash);
                }
                Ok(Entry::Vacant(VacantEntry {
                    table: self,
                    index,
                    hash,
                }))
            }
        }
    }

    /// Inserts `value` unless a value matching `eq` is already present.
    ///
    /// Returns `true` if the value was inserted. Otherwise the existing value
    /// is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert!(table.insert(1, (1, "first"), |&(k, _)| k == 1));
    /// assert!(!table.insert(1, (1, "second"), |&(k, _)| k == 1));
    /// assert_eq!(table.find(1, |&(k, _)| k == 1), Some(&(1, "first")));
    /// ```
    pub fn insert(&mut self, hash: u64, value: V, eq: impl Fn(&V) -> bool) -> bool {
        match self.entry(hash, eq) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }

        match self.locate(hash, eq) {
            // SAFETY: `locate` only reports occupied slots as found.
            Probe::Found(index) => Some(unsafe { self.store.get_unchecked(index) }),
            Probe::Vacant(_) => None,
        }
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }

        match self.locate(hash, eq) {
            // SAFETY: `locate` only reports occupied slots as found.
            Probe::Found(index) => Some(unsafe { self.store.get_unchecked_mut(index) }),
            Probe::Vacant(_) => None,
        }
    }

    /// The single probing routine behind every lookup.
    ///
    /// Starting at the home slot, walks forward (wrapping) past tombstones and
    /// non-matching values until it reaches either the matching value or the
    /// first empty slot, which is where the value would be inserted.
    #[inline]
    fn locate(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        let capacity = self.store.capacity();
        let hashes = self.store.hashes();

        let mut index = home_slot(hash, capacity);
        loop {
            match self.store.tag(index) {
                EMPTY => return Probe::Vacant(index),
                OCCUPIED if hashes[index] == hash => {
                    if self.store.get(index).is_some_and(&eq) {
                        return Probe::Found(index);
                    }
                }
                _ => {}
            }

            index += 1;
            if index == capacity {
                index = 0;
            }
        }
    }

    #[inline(always)]
    fn needs_growth(&self, additional: usize) -> bool {
        (self.populated + self.tombstones)
            .saturating_add(additional)
            .saturating_mul(LOAD_LIMIT)
            > self.store.capacity()
    }

    /// Constructs a value in the empty slot `index` and appends it to the
    /// order index.
    #[inline]
    fn insert_new(&mut self, index: usize, hash: u64, value: V) -> &mut V {
        self.populated += 1;
        self.order.push_back(self.store.links_mut(), index);
        self.store.write(index, hash, value)
    }

    /// Moves the value out of `index`, leaving a tombstone.
    ///
    /// # Safety
    ///
    /// The slot at `index` must be occupied.
    #[inline]
    unsafe fn remove_at(&mut self, index: usize) -> V {
        self.order.unlink(self.store.links_mut(), index);
        self.populated -= 1;
        self.tombstones += 1;
        // SAFETY: Caller guarantees the slot is occupied.
        unsafe { self.store.take_unchecked(index, TOMBSTONE) }
    }

    fn pop_front(&mut self) -> Option<V> {
        let head = self.order.head();
        if head == NIL {
            return None;
        }
        // SAFETY: The head of the order index is occupied.
        Some(unsafe { self.remove_at(head) })
    }

    fn pop_back(&mut self) -> Option<V> {
        let tail = self.order.tail();
        if tail == NIL {
            return None;
        }
        // SAFETY: The tail of the order index is occupied.
        Some(unsafe { self.remove_at(tail) })
    }

    /// Rebuilds the table into a fresh store of `capacity` slots.
    ///
    /// The new store is allocated before anything is touched, so a failure
    /// leaves the table as it was. Values move across in insertion order using
    /// their cached hashes, which runs no user code and cannot panic.
    #[cold]
    #[inline(never)]
    fn try_rehash(&mut self, capacity: usize) -> Result<(), Error> {
        debug_assert!(capacity >= MIN_CAPACITY);
        debug_assert!(self.populated * LOAD_LIMIT <= capacity);

        let mut store = SlotStore::try_with_capacity(capacity)?;
        log::debug!(
            "rehash: {} -> {} slots ({} live, {} tombstones)",
            self.store.capacity(),
            capacity,
            self.populated,
            self.tombstones
        );

        let mut order = OrderIndex::new();
        let mut cursor = self.order.head();
        while cursor != NIL {
            let next = self.store.links()[cursor].next;
            let hash = self.store.hashes()[cursor];
            // SAFETY: Every slot reachable through the order index is occupied.
            // Marking it empty hands ownership of the value to the new store.
            let value = unsafe { self.store.take_unchecked(cursor, EMPTY) };

            let index = vacant_slot(&store, hash);
            store.write(index, hash, value);
            order.push_back(store.links_mut(), index);

            cursor = next;
        }

        self.store = store;
        self.order = order;
        self.tombstones = 0;

        Ok(())
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// Entry `d` counts the live values stored `d` slots past their home slot
    /// (wrapping). The histogram is as long as the longest probe plus one.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let capacity = self.capacity();
        let mut hist = Vec::new();

        for (index, &tag) in self.store.tags().iter().enumerate() {
            if tag != OCCUPIED {
                continue;
            }

            let home = home_slot(self.store.hashes()[index], capacity);
            let distance = (index + capacity - home) % capacity;
            if hist.len() <= distance {
                hist.resize(distance + 1, 0);
            }
            hist[distance] += 1;
        }

        hist
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        let total_probe: usize = hist
            .iter()
            .enumerate()
            .map(|(distance, count)| distance * count)
            .sum();
        let capacity = self.capacity();

        DebugStats {
            populated: self.populated,
            tombstones: self.tombstones,
            capacity,
            load_factor: self.populated as f64 / capacity as f64,
            occupancy: (self.populated + self.tombstones) as f64 / capacity as f64,
            max_probe: hist.len().saturating_sub(1),
            mean_probe: if self.populated == 0 {
                0.0
            } else {
                total_probe as f64 / self.populated as f64
            },
            total_bytes: self.store.allocated_bytes(),
        }
    }

    /// Pretty-prints the probe-length histogram horizontally using stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} entries):", self.populated);
        for (distance, &count) in hist.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no matching value is present in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// An occupied entry keeps its value and `default` is dropped.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Runs `f` on the value if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, V> Entry<'a, V>
where
    V: Default,
{
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// The slot has already been located and the table has room for one more
/// value, so inserting cannot fail or rehash.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it. The value becomes the last one in iteration order.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { table, index, hash } = self;
        table.insert_new(index, hash, value)
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: An occupied entry always points at an occupied slot.
        unsafe { self.table.store.get_unchecked(self.index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: An occupied entry always points at an occupied slot.
        unsafe { self.table.store.get_unchecked_mut(self.index) }
    }

    /// Converts the entry into a mutable reference to its value with the
    /// lifetime of the table borrow.
    pub fn into_mut(self) -> &'a mut V {
        let OccupiedEntry { table, index } = self;
        // SAFETY: An occupied entry always points at an occupied slot.
        unsafe { table.store.get_unchecked_mut(index) }
    }

    /// Removes the value from the table, leaving a tombstone, and returns it.
    pub fn remove(self) -> V {
        // SAFETY: An occupied entry always points at an occupied slot.
        unsafe { self.table.remove_at(self.index) }
    }
}

/// An iterator over the values of a [`HashTable`] in insertion order.
///
/// Created by [`HashTable::iter`]. Advancing from either end is O(1).
pub struct Iter<'a, V> {
    table: &'a HashTable<V>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            table: self.table,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self.front;
        self.front = self.table.store.links()[index].next;
        self.remaining -= 1;
        // SAFETY: Every slot reachable through the order index is occupied, and
        // `remaining` stops us before walking off either end.
        Some(unsafe { self.table.store.get_unchecked(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self.back;
        self.back = self.table.store.links()[index].prev;
        self.remaining -= 1;
        // SAFETY: As in `next`.
        Some(unsafe { self.table.store.get_unchecked(index) })
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`] in insertion order.
///
/// Created by [`HashTable::iter_mut`].
pub struct IterMut<'a, V> {
    store: &'a SlotStore<V>,
    front: usize,
    back: usize,
    remaining: usize,

    _marker: PhantomData<&'a mut V>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self.front;
        self.front = self.store.links()[index].next;
        self.remaining -= 1;
        // SAFETY: The slot is occupied (it is on the order index), each slot is
        // yielded at most once, and the iterator was created from `&mut
        // HashTable`, so the returned borrows are unique.
        Some(unsafe { &mut *self.store.value_ptr(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for IterMut<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self.back;
        self.back = self.store.links()[index].prev;
        self.remaining -= 1;
        // SAFETY: As in `next`.
        Some(unsafe { &mut *self.store.value_ptr(index) })
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// A draining iterator over the values of a [`HashTable`] in insertion
/// order.
///
/// Created by [`HashTable::drain`].
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        self.table.clear();
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> DoubleEndedIterator for Drain<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.table.pop_back()
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
impl<V> FusedIterator for Drain<'_, V> {}

/// An owning iterator over the values of a [`HashTable`] in insertion order.
pub struct IntoIter<V> {
    table: HashTable<V>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.table.pop_back()
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}
impl<V> FusedIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { table: self }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a mut HashTable<V> {
    type Item = &'a mut V;
    type IntoIter = IterMut<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
