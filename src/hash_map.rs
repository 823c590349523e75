use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::error::Error;
use crate::error::infallible;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        compile_error!("enable the `foldhash` or `std` feature to get a default hasher");
    }
}

/// A hash map that iterates in insertion order, backed by the linear-probing
/// [`HashTable`].
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. Inserting a key
/// that is already present keeps the existing value.
///
/// # Performance Characteristics
///
/// - **Memory**: per slot, 1 tag byte, two `usize` order links and a `u64`
///   hash, plus the size of `(K, V)`
/// - **Load**: at most `1 / LOAD_LIMIT` of the slots are in use, counting
///   tombstones
///
/// # Examples
///
/// ```rust
/// use lin_hash::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert("b", 2);
/// map.insert("a", 1);
/// map.insert("c", 3);
/// map.remove("a");
/// map.insert("a", 10);
///
/// let keys: Vec<_> = map.keys().copied().collect();
/// assert_eq!(keys, ["b", "c", "a"]);
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> HashMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty map sized for `len` entries using the default hasher
    /// builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(len: usize) -> Self {
        Self::with_capacity_and_hasher(len, DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use lin_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates an empty map sized for `len` entries with the given hasher
    /// builder.
    pub fn with_capacity_and_hasher(len: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(len),
            hash_builder,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all entries and shrinks the map back to its minimum capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Shrinks the map to fit its current entries and discards tombstones.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves room for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.table.try_reserve(additional)
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32> = (0..8).map(|n| (n, n * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [0, 2, 4, 6]);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|pair| f(&pair.0, &mut pair.1));
    }

    /// Returns an iterator over key-value pairs in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(2, "b");
    /// map.insert(1, "a");
    ///
    /// let pairs: Vec<_> = map.iter().collect();
    /// assert_eq!(pairs, [(&2, &"b"), (&1, &"a")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over key-value pairs in insertion order, with
    /// mutable references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over keys in insertion order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over values in insertion order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over mutable references to values in insertion
    /// order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// for value in map.values_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(map.values().copied().collect::<Vec<_>>(), [10, 20]);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Removes all entries, yielding them in insertion order.
    ///
    /// The map is left as after [`clear`](Self::clear) even if the iterator is
    /// dropped early.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Builds a map from `iter` with the given hasher builder.
    ///
    /// The input is buffered first so the table is allocated once with room
    /// for every pair. When a key repeats, its first value is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::DefaultHashBuilder;
    /// # use lin_hash::HashMap;
    /// #
    /// let map = HashMap::from_iter_with_hasher(
    ///     [(1, "one"), (2, "two"), (1, "uno")],
    ///     DefaultHashBuilder::default(),
    /// );
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// ```
    pub fn from_iter_with_hasher<I>(iter: I, hash_builder: S) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs: Vec<(K, V)> = iter.into_iter().collect();
        let mut map = Self::with_capacity_and_hasher(pairs.len(), hash_builder);
        for (key, value) in pairs {
            map.insert(key, value);
        }
        map
    }

    /// Inserts a key-value pair if the key is not already present.
    ///
    /// Returns `true` if the pair was inserted. If the key was present, the map
    /// is unchanged and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert!(map.insert(37, "a"));
    /// assert!(!map.insert(37, "b"));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> bool {
        infallible(self.try_insert(key, value))
    }

    /// Fallible version of [`insert`](Self::insert). On error the map is
    /// unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<bool, Error> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.try_entry(hash, |(k, _)| *k == key)? {
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                Ok(true)
            }
            TableEntry::Occupied(_) => Ok(false),
        }
    }

    /// Returns the stored key and value for `key`, if present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(String::from("k"), 1);
    /// assert_eq!(map.find("k"), Some((&String::from("k"), &1)));
    /// assert_eq!(map.find("missing"), None);
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, |(k, _)| key.eq(k.borrow()))
            .map(|(k, v)| (k, v))
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, |(k, _)| key.eq(k.borrow()))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns the value for `key`, or [`Error::KeyNotFound`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::Error;
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.at(&1), Ok(&"a"));
    /// assert_eq!(map.at(&2), Err(Error::KeyNotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value for `key`, or
    /// [`Error::KeyNotFound`].
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Removes `key` and returns its value, if present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` and returns the stored key and value, if present.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |(k, _)| key.eq(k.borrow()))
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut counts = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.entry(word).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts.get("a"), Some(&2));
    /// assert_eq!(counts.get("b"), Some(&1));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            TableEntry::Vacant(inner) => Entry::Vacant(VacantEntry { inner, key }),
            TableEntry::Occupied(inner) => Entry::Occupied(OccupiedEntry { inner }),
        }
    }

    /// Returns the value for `key`, inserting `V::default()` first if the key
    /// is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let mut map: HashMap<&str, Vec<i32>> = HashMap::new();
    /// map.get_or_default("xs").push(1);
    /// map.get_or_default("xs").push(2);
    /// assert_eq!(map.get("xs"), Some(&vec![1, 2]));
    /// ```
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    /// Maps are equal when they hold the same keys with equal values,
    /// regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_with_hasher(iter, S::default())
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts every pair, keeping existing values for keys already present.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(lower);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S, const N: usize> From<[(K, V); N]> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::HashMap;
    /// #
    /// let map: HashMap<_, _> = HashMap::from([(1, 2), (3, 4)]);
    /// assert_eq!(map.len(), 2);
    /// ```
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_iter_with_hasher(pairs, S::default())
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Runs `f` on the value if the entry is occupied.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashMap`].
pub struct VacantEntry<'a, K, V> {
    inner: hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Returns the key that would be used when inserting.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes back ownership of the key without inserting.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the entry as the newest in iteration order and returns a
    /// mutable reference to its value.
    pub fn insert(self, value: V) -> &'a mut V {
        let (_, value) = self.inner.insert((self.key, value));
        value
    }
}

/// A view into an occupied entry in a [`HashMap`].
pub struct OccupiedEntry<'a, K, V> {
    inner: hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Returns the stored key.
    pub fn key(&self) -> &K {
        &self.inner.get().0
    }

    /// Returns a reference to the value.
    pub fn get(&self) -> &V {
        &self.inner.get().1
    }

    /// Returns a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.inner.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value with the
    /// lifetime of the map borrow.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.inner.into_mut().1
    }

    /// Replaces the value, returning the old one. The entry keeps its place
    /// in iteration order.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry and returns its value.
    pub fn remove(self) -> V {
        self.inner.remove().1
    }

    /// Removes the entry and returns the stored key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.inner.remove()
    }
}

/// An iterator over the entries of a [`HashMap`] in insertion order.
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a [`HashMap`] in insertion order.
pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (&*k, v))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a [`HashMap`] in insertion order.
pub struct Keys<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`HashMap`] in insertion order.
pub struct Values<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a [`HashMap`] in insertion order.
pub struct ValuesMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the entries of a [`HashMap`] in insertion order.
pub struct Drain<'a, K, V> {
    inner: hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Drain<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}

/// An owning iterator over the entries of a [`HashMap`] in insertion order.
pub struct IntoIter<K, V> {
    inner: hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::BuildHasher;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::hash_table::MIN_CAPACITY;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Sends every key to the same home slot.
    #[derive(Clone, Default)]
    struct ConstantHashBuilder;

    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    impl BuildHasher for ConstantHashBuilder {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    type SipMap<K, V> = HashMap<K, V, SipHashBuilder>;

    fn sip_map<K, V>() -> SipMap<K, V> {
        HashMap::with_hasher(SipHashBuilder::default())
    }

    fn keys_of<K: Copy, V, S>(map: &HashMap<K, V, S>) -> Vec<K> {
        map.keys().copied().collect()
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<i32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), MIN_CAPACITY);

        let map2: SipMap<i32, String> = HashMap::default();
        assert!(map2.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.is_empty());

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(map2.capacity() >= 200);
    }

    #[test]
    fn test_insert_first_wins() {
        let mut map = sip_map();

        assert!(map.insert(1, "hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.insert(1, "world".to_string()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.at(&1), Ok(&"hello".to_string()));
        assert_eq!(map.get(&2), None);
    }

    #[test]
    fn test_try_insert() {
        let mut map = sip_map();
        assert_eq!(map.try_insert(1, 10), Ok(true));
        assert_eq!(map.try_insert(1, 20), Ok(false));
        assert_eq!(map.at(&1), Ok(&10));
    }

    #[test]
    fn test_get_mut_and_at_mut() {
        let mut map = sip_map();
        map.insert(1, 10);

        *map.get_mut(&1).unwrap() += 5;
        assert_eq!(map.get(&1), Some(&15));

        *map.at_mut(&1).unwrap() *= 2;
        assert_eq!(map.at(&1), Ok(&30));

        assert!(map.get_mut(&2).is_none());
        assert_eq!(map.at_mut(&2), Err(Error::KeyNotFound));
    }

    #[test]
    fn test_at_missing() {
        let map: SipMap<i32, i32> = sip_map();
        assert_eq!(map.at(&7), Err(Error::KeyNotFound));
        assert!(map.is_empty());
    }

    #[test]
    fn test_contains_key_and_find() {
        let mut map = sip_map();
        map.insert("a".to_string(), 1);

        assert!(map.contains_key("a"));
        assert!(!map.contains_key("b"));
        assert_eq!(map.find("a"), Some((&"a".to_string(), &1)));
        assert_eq!(map.find("b"), None);
    }

    #[test]
    fn test_remove() {
        let mut map = sip_map();
        map.insert(1, "a");
        map.insert(2, "b");

        assert_eq!(map.remove(&1), Some("a"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), None);
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove_entry(&2), Some((2, "b")));
        assert!(map.is_empty());
    }

    #[test]
    fn test_order_stability() {
        let mut map = sip_map();
        for key in [3, 1, 2] {
            map.insert(key, key * 100);
        }
        map.remove(&1);
        map.insert(4, 400);

        assert_eq!(keys_of(&map), vec![3, 2, 4]);
        assert_eq!(
            map.values().copied().collect::<Vec<_>>(),
            vec![300, 200, 400]
        );
    }

    #[test]
    fn test_reinsert_moves_to_end() {
        let mut map = sip_map();
        for key in 0..5 {
            map.insert(key, ());
        }
        map.remove(&0);
        map.insert(0, ());
        assert_eq!(keys_of(&map), vec![1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_resize_transparency() {
        let mut map = sip_map();
        let mut rng = OsRng;
        let mut inserted = Vec::new();

        while inserted.len() < 1000 {
            let key = rng.try_next_u64().unwrap_or(0);
            if map.insert(key, key.wrapping_mul(3)) {
                inserted.push(key);
            }
        }

        assert_eq!(map.len(), 1000);
        for key in &inserted {
            assert_eq!(map.get(key), Some(&key.wrapping_mul(3)));
        }
        assert_eq!(keys_of(&map), inserted);
    }

    #[test]
    fn test_size_accounting() {
        let mut map = sip_map();
        for key in 0..100 {
            map.insert(key, ());
            map.insert(key, ());
        }
        assert_eq!(map.len(), 100);

        for key in (0..100).step_by(3) {
            map.remove(&key);
            map.remove(&key);
        }
        assert_eq!(map.len(), 66);
    }

    #[test]
    fn test_get_or_default() {
        let mut map: SipMap<&str, i32> = sip_map();

        assert_eq!(*map.get_or_default("x"), 0);
        assert_eq!(map.len(), 1);

        *map.get_or_default("x") += 5;
        *map.get_or_default("x") += 5;
        assert_eq!(map.at("x"), Ok(&10));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_clear_resets_schedule() {
        let mut map = sip_map();
        let mut first = Vec::new();
        for key in 0..300 {
            map.insert(key, key);
            first.push(map.capacity());
        }

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), MIN_CAPACITY);
        assert!(map.get(&1).is_none());

        let mut second = Vec::new();
        for key in 0..300 {
            map.insert(key, key);
            second.push(map.capacity());
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_clone_independence() {
        let mut original = sip_map();
        for key in 0..50 {
            original.insert(key, key.to_string());
        }
        original.remove(&10);

        let mut copy = original.clone();
        assert_eq!(copy.len(), original.len());
        assert_eq!(keys_of(&copy), keys_of(&original));
        assert_eq!(copy, original);

        copy.get_mut(&1).unwrap().push('!');
        copy.remove(&2);
        copy.insert(10, "ten".to_string());

        assert_eq!(original.get(&1), Some(&"1".to_string()));
        assert!(original.contains_key(&2));
        assert!(!original.contains_key(&10));
        assert_ne!(copy, original);

        let mut target = sip_map();
        target.insert(999, "gone".to_string());
        target.clone_from(&original);
        assert_eq!(target, original);
        assert!(!target.contains_key(&999));
    }

    #[test]
    fn test_from_iter_first_wins() {
        let map: HashMap<i32, &str> = [(1, "a"), (2, "b"), (1, "c")].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.at(&1), Ok(&"a"));
        assert_eq!(keys_of(&map), vec![1, 2]);

        let sized =
            HashMap::from_iter_with_hasher((0..10).map(|n| (n, n)), SipHashBuilder::default());
        assert_eq!(sized.capacity(), 10 * crate::hash_table::GROWTH_FACTOR);
    }

    #[test]
    fn test_from_array() {
        let map: SipMap<_, _> = HashMap::from([("one", 1), ("two", 2), ("three", 3)]);
        assert_eq!(map.len(), 3);
        assert_eq!(keys_of(&map), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_extend() {
        let mut map = sip_map();
        map.insert(1, "first");
        map.extend([(2, "second"), (1, "ignored"), (3, "third")]);

        assert_eq!(map.len(), 3);
        assert_eq!(map.at(&1), Ok(&"first"));
        assert_eq!(keys_of(&map), vec![1, 2, 3]);
    }

    #[test]
    fn test_eq_ignores_order() {
        let mut a = sip_map();
        let mut b = sip_map();
        for key in 0..20 {
            a.insert(key, key * 2);
        }
        for key in (0..20).rev() {
            b.insert(key, key * 2);
        }
        assert_eq!(a, b);

        *b.get_mut(&5).unwrap() = 0;
        assert_ne!(a, b);

        b.remove(&5);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_in_order() {
        let mut map = sip_map();
        map.insert(2, "b");
        map.insert(1, "a");
        assert_eq!(format!("{map:?}"), r#"{2: "b", 1: "a"}"#);
    }

    #[test]
    fn test_entry_api() {
        let mut map = sip_map();

        match map.entry("key") {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &"key");
                entry.insert(1);
            }
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }

        match map.entry("key") {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &"key");
                assert_eq!(entry.get(), &1);
                assert_eq!(entry.insert(2), 1);
                *entry.get_mut() += 1;
            }
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert_eq!(map.get("key"), Some(&3));

        map.entry("key").and_modify(|v| *v *= 10).or_insert(0);
        map.entry("other").and_modify(|v| *v *= 10).or_insert(7);
        assert_eq!(map.get("key"), Some(&30));
        assert_eq!(map.get("other"), Some(&7));

        match map.entry("key") {
            Entry::Occupied(entry) => assert_eq!(entry.remove_entry(), ("key", 30)),
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }

        match map.entry("gone") {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), "gone"),
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }
        assert_eq!(keys_of(&map), vec!["other"]);
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: SipMap<String, Vec<i32>> = sip_map();
        map.entry("xs".to_string()).or_default().push(1);
        map.entry("xs".to_string()).or_default().push(2);
        assert_eq!(map.get("xs"), Some(&vec![1, 2]));
        assert_eq!(map.entry("xs".to_string()).key(), "xs");
    }

    #[test]
    fn test_iterators() {
        let mut map = sip_map();
        for key in 1..=5 {
            map.insert(key, key * 10);
        }

        let pairs: Vec<(i32, i32)> = map.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(pairs, vec![(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)]);
        assert_eq!(map.iter().len(), 5);

        let rev: Vec<i32> = map.keys().rev().copied().collect();
        assert_eq!(rev, vec![5, 4, 3, 2, 1]);
        assert_eq!(map.values().next_back(), Some(&50));

        for (k, v) in map.iter_mut() {
            *v += *k;
        }
        for v in map.values_mut() {
            *v += 1;
        }
        for (_, v) in &mut map {
            *v *= 2;
        }
        assert_eq!(
            (&map).into_iter().map(|(_, &v)| v).collect::<Vec<_>>(),
            vec![24, 46, 68, 90, 112]
        );

        let owned: Vec<(i32, i32)> = map.into_iter().rev().collect();
        assert_eq!(owned[0], (5, 112));
        assert_eq!(owned.len(), 5);
    }

    #[test]
    fn test_drain() {
        let mut map = sip_map();
        for key in 0..10 {
            map.insert(key, key.to_string());
        }

        let drained: Vec<(i32, String)> = map.drain().collect();
        assert_eq!(drained.len(), 10);
        assert_eq!(drained[3], (3, "3".to_string()));
        assert!(map.is_empty());
        assert_eq!(map.capacity(), MIN_CAPACITY);

        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        {
            let mut drain = map.drain();
            assert_eq!(drain.next(), Some((1, "one".to_string())));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_retain() {
        let mut map = sip_map();
        for key in 0..10 {
            map.insert(key, key);
        }
        map.retain(|&k, v| {
            *v *= 2;
            k % 3 == 0
        });

        assert_eq!(keys_of(&map), vec![0, 3, 6, 9]);
        assert_eq!(map.at(&9), Ok(&18));
    }

    #[test]
    fn test_collision_handling() {
        let mut map = HashMap::with_hasher(ConstantHashBuilder);
        for key in 0..40 {
            assert!(map.insert(key, key * 2));
        }
        for key in (0..40).step_by(2) {
            assert_eq!(map.remove(&key), Some(key * 2));
        }

        for key in 0..40 {
            let expected = if key % 2 == 1 { Some(&(key * 2)) } else { None };
            assert_eq!(map.get(&key), expected);
        }

        assert!(map.insert(0, 1));
        assert_eq!(map.get(&0), Some(&1));
        assert_eq!(map.keys().last(), Some(&0));
    }

    #[test]
    fn test_string_keys() {
        let mut map = sip_map();
        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);

        assert_eq!(map.get("hello"), Some(&1));
        assert_eq!(map.get("world"), Some(&2));
        assert_eq!(map.get("rust"), None);
        assert_eq!(map.remove("hello"), Some(1));
    }

    #[test]
    fn test_hasher_accessor() {
        let builder = SipHashBuilder::default();
        let map: SipMap<u8, u8> = HashMap::with_hasher(builder.clone());
        assert_eq!(map.hasher().k1, builder.k1);
        assert_eq!(map.hasher().k2, builder.k2);
    }

    #[test]
    fn test_complex_values() {
        #[derive(Debug, Clone, PartialEq)]
        struct Record {
            name: String,
            tags: Vec<String>,
        }

        let mut map = sip_map();
        for id in 0..20u32 {
            map.insert(
                id,
                Record {
                    name: format!("record-{id}"),
                    tags: vec![id.to_string(); id as usize % 4],
                },
            );
        }

        map.get_mut(&3).unwrap().tags.push("extra".to_string());
        assert_eq!(map.get(&3).map(|r| r.tags.len()), Some(4));
        assert_eq!(map.get(&19).map(|r| r.name.as_str()), Some("record-19"));

        let copy = map.clone();
        assert_eq!(copy, map);
    }
}
