use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::hash_table::DetachedEntry;
use crate::hash_table::Destructor;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::hash_table::NoDestructor;
use crate::hash_table::OccupiedEntry as TableOccupiedEntry;
use crate::hash_table::VacantEntry as TableVacantEntry;
pub use crate::hash_table::Drain;
pub use crate::hash_table::Iter;
pub use crate::hash_table::IterMut;
pub use crate::hash_table::Keys;
pub use crate::hash_table::Values;
pub use crate::hash_table::ValuesMut;

/// Folds a 64-bit hasher output down to the 32-bit hash the table works on.
#[inline(always)]
fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// A hash map implemented using the chained [`HashTable`] as the underlying
/// storage.
///
/// `HashMap<K, V, S, KD, VD>` stores key-value pairs where keys implement
/// `Hash + Eq` and uses a configurable hasher builder `S` to hash keys. The
/// optional `KD` and `VD` [`Destructor`] hooks run on keys and values the map
/// discards for good: through [`remove`](Self::remove), when
/// [`put_entry`](Self::put_entry) replaces an existing entry, on
/// [`clear`](Self::clear), and when the map is dropped.
///
/// # Performance Characteristics
///
/// - **Memory**: one pointer per bucket, plus one allocation per entry holding
///   `K`, `V`, the cached 32-bit hash and the chain link
/// - **Lookups**: expected constant time; a lookup walks a single chain whose
///   mean length stays below the load factor
#[derive(Clone)]
pub struct HashMap<K, V, S, KD = NoDestructor, VD = NoDestructor>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    table: HashTable<K, V, KD, VD>,
    hash_builder: S,
}

impl<K, V, S, KD, VD> Debug for HashMap<K, V, S, KD, VD>
where
    K: Debug,
    V: Debug,
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use chain_hash::HashMap;
    ///
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(RandomState::new());
    /// assert!(map.is_empty());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash map with at least `capacity` buckets and the given
    /// hasher builder.
    ///
    /// The bucket count is rounded up to a power of two.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use chain_hash::HashMap;
    ///
    /// let map: HashMap<i32, String, _> =
    ///     HashMap::with_capacity_and_hasher(100, RandomState::new());
    /// assert_eq!(map.capacity(), 128);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    S: Default,
{
    /// Creates a new hash map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let map: HashMap<i32, String, DefaultHashBuilder> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 16);
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map with at least `capacity` buckets using the
    /// default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, KD, VD> HashMap<K, V, S, KD, VD>
where
    S: Default,
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Creates a new hash map with default parameters, the default hasher
    /// builder, and the given destructor hooks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut freed = Vec::new();
    /// {
    ///     let mut map: HashMap<u32, String, DefaultHashBuilder, _, _> =
    ///         HashMap::with_destructors(|_key: u32| {}, |value: String| freed.push(value));
    ///     map.insert(1, "one".to_string());
    ///     map.insert(2, "two".to_string());
    ///     assert!(map.remove(&1));
    /// }
    /// freed.sort();
    /// assert_eq!(freed, ["one", "two"]);
    /// # }
    /// ```
    pub fn with_destructors(key_destructor: KD, value_destructor: VD) -> Self {
        Self::with_destructors_and_hasher(key_destructor, value_destructor, S::default())
    }
}

impl<K, V, S, KD, VD> HashMap<K, V, S, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Creates a new hash map with default parameters, the given destructor
    /// hooks, and the given hasher builder.
    pub fn with_destructors_and_hasher(
        key_destructor: KD,
        value_destructor: VD,
        hash_builder: S,
    ) -> Self {
        Self {
            table: HashTable::with_destructors(key_destructor, value_destructor),
            hash_builder,
        }
    }

    /// Creates a new hash map from explicit construction parameters.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is not within `(0, 1]`.
    pub fn with_config_and_hasher(
        load_factor: f32,
        initial_capacity: usize,
        key_destructor: KD,
        value_destructor: VD,
        hash_builder: S,
    ) -> Self {
        Self {
            table: HashTable::with_config(
                load_factor,
                initial_capacity,
                key_destructor,
                value_destructor,
            ),
            hash_builder,
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the element count at which the next insertion grows the map.
    pub fn threshold(&self) -> usize {
        self.table.threshold()
    }

    /// Returns the load factor the map was created with.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements from the map, running the destructor hooks.
    ///
    /// This operation preserves the map's bucket array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut map: HashMap<_, _, DefaultHashBuilder> = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 16);
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Destroys the map, running the destructor hooks on every remaining key
    /// and value. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    /// An iterator visiting all key-value pairs in arbitrary order, with
    /// mutable references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.table.iter_mut()
    }

    /// An iterator visiting all keys in arbitrary order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        self.table.keys()
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn values(&self) -> Values<'_, K, V> {
        self.table.values()
    }

    /// An iterator visiting all values mutably in arbitrary order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        self.table.values_mut()
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    ///
    /// Ownership of every pair passes to the caller, so no destructor hook
    /// runs.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        self.table.drain()
    }

    /// Returns chain and memory statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    /// Computes how many buckets hold chains of each length.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> crate::hash_table::ChainHistogram {
        self.table.chain_histogram()
    }
}

impl<K, V, S, KD, VD> HashMap<K, V, S, KD, VD>
where
    K: Hash + Eq,
    S: BuildHasher,
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    #[inline(always)]
    fn hash(&self, key: &K) -> u32 {
        fold_hash(self.hash_builder.hash_one(key))
    }

    /// Returns the value slot for `key`, inserting `V::default()` if the key
    /// is absent.
    ///
    /// When the key is already present, the stored key is kept (the passed
    /// one is dropped) and the current value is returned untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut words: HashMap<&str, usize, DefaultHashBuilder> = HashMap::new();
    /// for word in "the cat saw the dog".split(' ') {
    ///     *words.put(word) += 1;
    /// }
    /// assert_eq!(words.get(&"the"), Some(&2));
    /// assert_eq!(words.len(), 4);
    /// # }
    /// ```
    pub fn put(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.put_with(key, V::default)
    }

    /// Like [`put`](Self::put), but a new entry's value comes from `default`.
    pub fn put_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let hash = self.hash(&key);
        match self.table.entry(hash, |k| k == &key) {
            TableEntry::Occupied(entry) => entry.into_mut(),
            TableEntry::Vacant(entry) => entry.insert(key, default()),
        }
    }

    /// Moves a detached entry into the map, hashing its current key.
    ///
    /// If an equal key is present, the stored entry is replaced and its key
    /// and value are handed to the destructor hooks. Otherwise the entry is
    /// added.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut map: HashMap<String, u32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("old".to_string(), 1);
    ///
    /// let mut entry = map.extract(&"old".to_string()).unwrap();
    /// *entry.key_mut() = "new".to_string();
    /// map.put_entry(entry);
    ///
    /// assert_eq!(map.get(&"new".to_string()), Some(&1));
    /// assert!(!map.contains_key(&"old".to_string()));
    /// # }
    /// ```
    pub fn put_entry(&mut self, entry: DetachedEntry<K, V>) {
        let hash = self.hash(entry.key());
        self.table.put_entry(hash, entry, |stored, key| stored == key);
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    /// If the map did have this key present, the value is updated, and the old
    /// value is returned. The stored key is kept, and no destructor hook runs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut map: HashMap<_, _, DefaultHashBuilder> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        match self.table.entry(hash, |k| k == &key) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(key, value);
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(self.hash(key), |k| k == key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash(key);
        self.table.get_mut(hash, |k| k == key)
    }

    /// Returns the stored key-value pair corresponding to the key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.get_key_value(self.hash(key), |k| k == key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(self.hash(key), |k| k == key)
    }

    /// Moves the entry for `key` out of the map without destroying it.
    ///
    /// See [`HashTable::extract`].
    pub fn extract(&mut self, key: &K) -> Option<DetachedEntry<K, V>> {
        let hash = self.hash(key);
        self.table.extract(hash, |k| k == key)
    }

    /// Removes `key` from the map and runs the destructor hooks on the stored
    /// key and value. Returns whether the key was present.
    ///
    /// Use [`remove_entry`](Self::remove_entry) to take the pair back
    /// instead.
    pub fn remove(&mut self, key: &K) -> bool {
        let hash = self.hash(key);
        self.table.remove(hash, |k| k == key)
    }

    /// Removes `key` from the map, returning the stored key and value. No
    /// destructor hook runs.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.extract(key).map(DetachedEntry::into_parts)
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use chain_hash::DefaultHashBuilder;
    /// use chain_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, u32, DefaultHashBuilder> = HashMap::new();
    /// map.entry("a").or_insert(1);
    /// map.entry("a").and_modify(|v| *v += 10).or_insert(0);
    /// assert_eq!(map.get(&"a"), Some(&11));
    /// # }
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, KD, VD> {
        let hash = self.hash(&key);
        match self.table.entry(hash, |k| k == &key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { inner: entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { inner: entry, key }),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S, KD, VD> IntoIterator for &'a HashMap<K, V, S, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, KD, VD> IntoIterator for &'a mut HashMap<K, V, S, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

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
pub enum Entry<'a, K, V, KD = NoDestructor, VD = NoDestructor>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, KD, VD>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, KD, VD>),
}

impl<'a, K, V, KD, VD> Entry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
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

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, KD, VD> Entry<'a, K, V, KD, VD>
where
    V: Default,
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Inserts the default value if the entry is vacant.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashMap`].
pub struct VacantEntry<'a, K, V, KD = NoDestructor, VD = NoDestructor>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    inner: TableVacantEntry<'a, K, V, KD, VD>,
    key: K,
}

impl<'a, K, V, KD, VD> VacantEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Gets a reference to the key that would be used when inserting.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        self.inner.insert(self.key, value)
    }
}

/// A view into an occupied entry in a [`HashMap`].
pub struct OccupiedEntry<'a, K, V, KD = NoDestructor, VD = NoDestructor>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    inner: TableOccupiedEntry<'a, K, V, KD, VD>,
}

impl<'a, K, V, KD, VD> OccupiedEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Gets a reference to the stored key.
    pub fn key(&self) -> &K {
        self.inner.key()
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.inner.get()
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.inner.get_mut()
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        self.inner.into_mut()
    }

    /// Sets the value of the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Takes the value out of the map. The stored key is dropped without
    /// running the key destructor.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Takes the key and value out of the map.
    pub fn remove_entry(self) -> (K, V) {
        self.inner.remove_entry()
    }

    /// Moves the entry out of the map without destroying it.
    pub fn extract(self) -> DetachedEntry<K, V> {
        self.inner.extract()
    }

    /// Removes the entry and runs the destructor hooks on its key and value.
    pub fn discard(self) {
        self.inner.discard()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

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

    /// Hashes every key to the same value, forcing a single chain.
    #[derive(Clone, Default)]
    struct ConstantHashBuilder;

    struct ConstantHasher;

    impl core::hash::Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0x5555_5555_5555_5555
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    impl BuildHasher for ConstantHashBuilder {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    #[test]
    fn fold_mixes_both_halves() {
        assert_eq!(fold_hash(0), 0);
        assert_eq!(fold_hash(0x0000_0001_0000_0000), 1);
        assert_eq!(fold_hash(0x0000_0001_0000_0001), 0);
        assert_eq!(fold_hash(0xFFFF_0000_0000_FFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.threshold(), 12);
        assert_eq!(map.load_factor(), 0.75);

        let map2 = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        assert!(map2.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::with_capacity(100);
        assert_eq!(map.capacity(), 128);
        assert!(map.is_empty());

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert_eq!(map2.capacity(), 256);
    }

    #[test]
    fn test_with_config() {
        let map: HashMap<i32, i32, _> = HashMap::with_config_and_hasher(
            0.5,
            10,
            NoDestructor,
            NoDestructor,
            SipHashBuilder::default(),
        );
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.threshold(), 8);
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        assert_eq!(map.insert(1, "hello".to_string()), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        assert_eq!(
            map.insert(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_key_value(&1), Some((&1, &"world".to_string())));
    }

    #[test]
    fn test_put_returns_existing_slot() {
        let mut map: HashMap<String, Vec<u32>, SipHashBuilder> = HashMap::new();
        map.put("a".to_string()).push(1);
        map.put("a".to_string()).push(2);
        map.put("b".to_string()).push(3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a".to_string()), Some(&vec![1, 2]));
        assert_eq!(map.get(&"b".to_string()), Some(&vec![3]));

        let value = map.put_with("c".to_string(), || vec![9]);
        assert_eq!(value, &vec![9]);
    }

    #[test]
    fn test_get_mut() {
        let mut map: HashMap<i32, i32, SipHashBuilder> = HashMap::new();
        map.insert(1, 10);
        if let Some(value) = map.get_mut(&1) {
            *value += 5;
        }
        assert_eq!(map.get(&1), Some(&15));
        assert!(map.get_mut(&2).is_none());
    }

    #[test]
    fn test_contains_key() {
        let mut map: HashMap<i32, (), SipHashBuilder> = HashMap::new();
        map.put(1);
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_remove_runs_destructors() {
        let keys = Rc::new(Cell::new(0));
        let values = Rc::new(Cell::new(0));
        let (k, v) = (keys.clone(), values.clone());
        let mut map: HashMap<i32, String, SipHashBuilder, _, _> = HashMap::with_destructors(
            move |_key: i32| k.set(k.get() + 1),
            move |_value: String| v.set(v.get() + 1),
        );
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());

        assert!(map.remove(&1));
        assert!(!map.remove(&1));
        assert_eq!(keys.get(), 1);
        assert_eq!(values.get(), 1);

        assert_eq!(map.remove_entry(&2), Some((2, "two".to_string())));
        assert_eq!(map.remove_entry(&2), None);
        assert_eq!(keys.get(), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn test_extract_rename_put_entry() {
        let mut map: HashMap<String, u32, SipHashBuilder> = HashMap::new();
        for i in 0..20u32 {
            map.insert(i.to_string(), i);
        }

        let mut entry = map.extract(&"7".to_string()).unwrap();
        assert_eq!(map.len(), 19);
        *entry.key_mut() = "seventy".to_string();
        map.put_entry(entry);

        assert_eq!(map.len(), 20);
        assert_eq!(map.get(&"seventy".to_string()), Some(&7));
        assert!(!map.contains_key(&"7".to_string()));
        assert!(map.extract(&"7".to_string()).is_none());
    }

    #[test]
    fn test_put_entry_replaces_and_destroys() {
        let freed = Rc::new(core::cell::RefCell::new(Vec::new()));
        let sink = freed.clone();
        let mut map: HashMap<u32, String, SipHashBuilder, _, _> =
            HashMap::with_destructors(NoDestructor, move |value: String| {
                sink.borrow_mut().push(value)
            });
        map.insert(1, "old".to_string());
        map.put_entry(DetachedEntry::new(1, "new".to_string()));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"new".to_string()));
        assert_eq!(*freed.borrow(), vec!["old".to_string()]);
    }

    #[test]
    fn test_entry_api() {
        let mut map: HashMap<&str, i32, SipHashBuilder> = HashMap::new();

        *map.entry("a").or_insert(0) += 1;
        *map.entry("a").or_insert(0) += 1;
        assert_eq!(map.get(&"a"), Some(&2));

        assert_eq!(*map.entry("b").or_insert_with(|| 7), 7);
        assert_eq!(*map.entry("c").or_default(), 0);
        map.entry("b").and_modify(|v| *v *= 2).or_insert(0);
        assert_eq!(map.get(&"b"), Some(&14));
        assert_eq!(map.entry("zzz").key(), &"zzz");

        match map.entry("a") {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &"a");
                assert_eq!(entry.insert(10), 2);
                assert_eq!(entry.get(), &10);
                assert_eq!(entry.remove(), 10);
            }
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        assert!(!map.contains_key(&"a"));

        match map.entry("new") {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &"new");
                *entry.insert(1) += 1;
            }
            Entry::Occupied(_) => panic!("expected vacant"),
        }
        assert_eq!(map.get(&"new"), Some(&2));

        match map.entry("gone") {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), "gone"),
            Entry::Occupied(_) => panic!("expected vacant"),
        }
        assert!(!map.contains_key(&"gone"));
    }

    #[test]
    fn test_occupied_entry_discard_and_extract() {
        let freed = Rc::new(Cell::new(0));
        let f = freed.clone();
        let mut map: HashMap<u8, u8, SipHashBuilder, _, _> =
            HashMap::with_destructors(NoDestructor, move |_value: u8| f.set(f.get() + 1));
        map.insert(1, 1);
        map.insert(2, 2);

        if let Entry::Occupied(entry) = map.entry(1) {
            entry.discard();
        }
        assert_eq!(freed.get(), 1);

        let detached = match map.entry(2) {
            Entry::Occupied(entry) => entry.extract(),
            Entry::Vacant(_) => panic!("expected occupied"),
        };
        assert_eq!(freed.get(), 1);
        assert!(map.is_empty());
        assert_eq!(detached.into_parts(), (2, 2));
    }

    #[test]
    fn test_colliding_keys() {
        let mut map: HashMap<u32, u32, ConstantHashBuilder> = HashMap::new();
        for i in 0..100u32 {
            map.insert(i, i * 2);
        }
        assert_eq!(map.len(), 100);
        assert_eq!(map.chain_histogram().counts.len(), 101);
        for i in 0..100u32 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
        for i in (0..100u32).filter(|i| i % 3 == 0) {
            assert!(map.remove(&i));
        }
        for i in 0..100u32 {
            assert_eq!(map.contains_key(&i), i % 3 != 0);
        }
    }

    #[test]
    fn test_iteration() {
        let mut map: HashMap<u32, u32, SipHashBuilder> = HashMap::new();
        for i in 0..50u32 {
            map.insert(i, i);
        }

        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
        assert_eq!(map.values().sum::<u32>(), (0..50).sum());
        assert_eq!(map.iter().len(), 50);

        for (_, value) in &mut map {
            *value += 1;
        }
        for value in map.values_mut() {
            *value *= 2;
        }
        for (key, value) in &map {
            assert_eq!(*value, (key + 1) * 2);
        }
    }

    #[test]
    fn test_drain_and_clear() {
        let freed = Rc::new(Cell::new(0));
        let f = freed.clone();
        let mut map: HashMap<u32, u32, SipHashBuilder, _, _> =
            HashMap::with_destructors(NoDestructor, move |_value: u32| f.set(f.get() + 1));
        for i in 0..20u32 {
            map.insert(i, i);
        }
        let capacity = map.capacity();

        let mut drained: Vec<(u32, u32)> = map.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..20).map(|i| (i, i)).collect::<Vec<_>>());
        assert!(map.is_empty());
        assert_eq!(freed.get(), 0);

        for i in 0..5u32 {
            map.insert(i, i);
        }
        map.clear();
        assert_eq!(freed.get(), 5);
        assert_eq!(map.capacity(), capacity);

        map.insert(9, 9);
        map.destroy();
        assert_eq!(freed.get(), 6);
    }

    #[test]
    fn test_extend_and_from_iter() {
        let map: HashMap<u32, String, SipHashBuilder> =
            (0..10u32).map(|i| (i, i.to_string())).collect();
        assert_eq!(map.len(), 10);
        assert_eq!(map.get(&3), Some(&"3".to_string()));

        let mut map = map;
        map.extend([(3, "three".to_string()), (42, "42".to_string())]);
        assert_eq!(map.len(), 11);
        assert_eq!(map.get(&3), Some(&"three".to_string()));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map: HashMap<u32, String, SipHashBuilder> = HashMap::new();
        for i in 0..30u32 {
            map.insert(i, i.to_string());
        }
        let mut cloned = map.clone();
        assert_eq!(cloned.len(), 30);
        assert!(cloned.remove(&0));
        cloned.insert(100, "x".to_string());

        assert!(map.contains_key(&0));
        assert!(!map.contains_key(&100));
        assert_eq!(map.len(), 30);
    }

    #[test]
    fn test_debug_format() {
        let mut map: HashMap<u32, &str, SipHashBuilder> = HashMap::new();
        map.insert(1, "one");
        assert_eq!(alloc::format!("{:?}", map), r#"{1: "one"}"#);
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut map: HashMap<u64, u64, SipHashBuilder> = HashMap::with_capacity(1);
        for i in 0..10_000u64 {
            map.insert(i, !i);
            assert!(map.len() <= map.threshold());
        }
        assert!(map.capacity().is_power_of_two());
        for i in 0..10_000u64 {
            assert_eq!(map.get(&i), Some(&!i));
        }

        let stats = map.debug_stats();
        assert_eq!(stats.len, 10_000);
        assert_eq!(stats.capacity, map.capacity());
    }

    #[test]
    #[cfg(feature = "std")]
    fn map_moves_into_worker_thread() {
        let mut map: HashMap<String, u32, SipHashBuilder> =
            HashMap::with_hasher(SipHashBuilder::default());
        map.insert("a".to_string(), 1);

        let map = std::thread::spawn(move || {
            map.insert("b".to_string(), 2);
            map
        })
        .join()
        .unwrap();

        assert_eq!(map.get(&"a".to_string()), Some(&1));
        assert_eq!(map.get(&"b".to_string()), Some(&2));
    }
}
