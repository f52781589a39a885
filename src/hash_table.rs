//! A separately chained hash table with caller-supplied hashing.
//!
//! [`HashTable`] stores key/value pairs in singly linked chains hanging off a
//! power-of-two bucket array. Callers provide the 32-bit hash of a key and an
//! equality predicate for every operation; the table applies a fixed
//! supplemental [`mix`] to the hash before selecting a bucket and caches the
//! mixed hash in each entry so that growing the table never calls back into
//! user hashing code.
//!
//! Entries can be moved out of the table without being destroyed through
//! [`HashTable::extract`], mutated (including their key), and moved back in
//! through [`HashTable::put_entry`] without reallocating their storage.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Load factor used by [`HashTable::new`] and [`HashTable::with_destructors`].
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Bucket count used by [`HashTable::new`] and [`HashTable::with_destructors`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

const DEBUG_CHAIN_LIMIT: usize = 64;

/// Supplemental hash mixing applied to every user hash.
///
/// Bucket selection only looks at the low bits of the hash, so hashes that
/// differ only in their upper bits would all collide in a power-of-two sized
/// bucket array. Mixing folds the upper bits down before masking.
///
/// # Examples
///
/// ```rust
/// use chain_hash::hash_table::mix;
///
/// // Without mixing both of these would select bucket 0 of a 16 bucket table.
/// assert_ne!(mix(0x1_0000) & 15, mix(0x2_0000) & 15);
/// assert_eq!(mix(0), 0);
/// ```
#[inline(always)]
pub fn mix(hash: u32) -> u32 {
    let h = hash ^ (hash >> 20) ^ (hash >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}

#[inline(always)]
fn bucket_count(requested: usize) -> usize {
    requested
        .max(1)
        .checked_next_power_of_two()
        .expect("capacity overflow")
}

#[inline(always)]
fn threshold(load_factor: f32, capacity: usize) -> usize {
    (load_factor as f64 * capacity as f64) as usize
}

fn empty_buckets<K, V>(capacity: usize) -> Box<[Link<K, V>]> {
    debug_assert!(capacity.is_power_of_two());
    (0..capacity).map(|_| None).collect()
}

/// A cleanup hook run on keys or values the table discards for good.
///
/// The table hands an item to its hook exactly once, when the entry owning
/// it is destroyed by [`HashTable::remove`], replaced by
/// [`HashTable::put_entry`], or dropped together with the table. Hooks never
/// run for entries moved out with [`HashTable::extract`], nor when a value is
/// overwritten in place through a reference returned by [`HashTable::put`].
///
/// Every `FnMut(T)` closure is a destructor; [`NoDestructor`] is the absent
/// hook.
pub trait Destructor<T> {
    /// Consumes an item the table is discarding.
    fn destroy(&mut self, item: T);
}

/// The absent destructor hook: discarded items are simply dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDestructor;

impl<T> Destructor<T> for NoDestructor {
    #[inline(always)]
    fn destroy(&mut self, _item: T) {}
}

impl<T, F> Destructor<T> for F
where
    F: FnMut(T),
{
    #[inline(always)]
    fn destroy(&mut self, item: T) {
        self(item)
    }
}

struct Node<K, V> {
    hash: u32,
    key: K,
    value: V,
    next: Link<K, V>,
}

type Link<K, V> = Option<NonNull<Node<K, V>>>;

/// An entry that has been moved out of a [`HashTable`].
///
/// Produced by [`HashTable::extract`] (or built directly with
/// [`DetachedEntry::new`]) and consumed by [`HashTable::put_entry`]. While
/// detached, the caller owns the key and value; dropping a detached entry
/// drops them without running the table's destructor hooks.
pub struct DetachedEntry<K, V> {
    node: Box<Node<K, V>>,
}

impl<K, V> DetachedEntry<K, V> {
    /// Allocates a detached entry, ready to be handed to
    /// [`HashTable::put_entry`].
    pub fn new(key: K, value: V) -> Self {
        Self {
            node: Box::new(Node {
                hash: 0,
                key,
                value,
                next: None,
            }),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        &self.node.key
    }

    /// Returns the entry's key mutably.
    ///
    /// Changing the key is the point of detaching an entry: the table
    /// recomputes the entry's bucket when it is put back.
    pub fn key_mut(&mut self) -> &mut K {
        &mut self.node.key
    }

    /// Returns the entry's value.
    pub fn value(&self) -> &V {
        &self.node.value
    }

    /// Returns the entry's value mutably.
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.node.value
    }

    /// Releases the entry's storage, handing back its key and value.
    pub fn into_parts(self) -> (K, V) {
        let Node { key, value, .. } = *self.node;
        (key, value)
    }
}

impl<K: Debug, V: Debug> Debug for DetachedEntry<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DetachedEntry")
            .field("key", &self.node.key)
            .field("value", &self.node.value)
            .finish()
    }
}

/// Debug statistics for chain analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries currently in the table
    pub len: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Entry count at which the next insertion grows the table
    pub threshold: usize,
    /// Configured load factor
    pub load_factor: f32,
    /// Buckets with no chain
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Mean length over non-empty chains
    pub mean_chain: f64,
    /// Bytes held by the bucket array and all entries
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} buckets ({:.2}% fill, threshold {} at load factor {:.2})",
            self.len,
            self.capacity,
            if self.capacity == 0 {
                0.0
            } else {
                self.len as f64 / self.capacity as f64 * 100.0
            },
            self.threshold,
            self.load_factor
        );
        println!(
            "Chains: {} empty buckets, longest chain {}, mean chain {:.2}",
            self.empty_buckets, self.longest_chain, self.mean_chain
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Number of buckets per chain length.
///
/// `counts[n]` is the number of buckets whose chain holds exactly `n`
/// entries.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHistogram {
    /// Bucket count per chain length.
    pub counts: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ChainHistogram {
    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "chain histogram ({} buckets):",
            self.counts.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let ch = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            if let Some(ch) = ch {
                bar.push(ch);
            }
            bar
        };

        for (length, &count) in self.counts.iter().enumerate() {
            println!("{:>3} | {} ({})", length, make_bar(count), count);
        }
    }
}

/// A hash table using separate chaining with caller-supplied hashing.
///
/// `HashTable<K, V, KD, VD>` maps keys of type `K` to values of type `V`.
/// Every operation takes the key's 32-bit hash and an equality predicate; the
/// table mixes the hash (see [`mix`]) and walks the matching chain. `KD` and
/// `VD` are the [`Destructor`] hooks run on keys and values of discarded
/// entries.
///
/// The bucket count is always a power of two. Before an insertion, the table
/// doubles its bucket array once the entry count has reached
/// `load_factor × capacity`; it never shrinks.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use chain_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_str(s: &str) -> u32 {
/// #     let mut hasher = SipHasher::new();
/// #     s.hash(&mut hasher);
/// #     hasher.finish() as u32
/// # }
/// #
/// let mut table: HashTable<String, u32> = HashTable::new();
///
/// *table.put(hash_str("alice"), "alice".to_string(), |k| k == "alice") = 30;
/// assert_eq!(table.get(hash_str("alice"), |k| k == "alice"), Some(&30));
///
/// // Rename the entry in place: no reallocation, no destructors.
/// let mut entry = table.extract(hash_str("alice"), |k| k == "alice").unwrap();
/// *entry.key_mut() = "bob".to_string();
/// table.put_entry(hash_str("bob"), entry, |a, b| a == b);
///
/// assert_eq!(table.get(hash_str("bob"), |k| k == "bob"), Some(&30));
/// assert_eq!(table.get(hash_str("alice"), |k| k == "alice"), None);
/// ```
pub struct HashTable<K, V, KD = NoDestructor, VD = NoDestructor>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    buckets: Box<[Link<K, V>]>,

    len: usize,
    threshold: usize,
    load_factor: f32,

    key_destructor: KD,
    value_destructor: VD,

    _phantom: PhantomData<Box<Node<K, V>>>,
}

// SAFETY: the table uniquely owns every node reachable from `buckets`, the
// same way a `Box<Node>` would. Moving the table moves that ownership, and
// the hooks travel with it.
unsafe impl<K, V, KD, VD> Send for HashTable<K, V, KD, VD>
where
    K: Send,
    V: Send,
    KD: Destructor<K> + Send,
    VD: Destructor<V> + Send,
{
}

// SAFETY: every method reachable through `&HashTable` only reads nodes, so
// sharing the table shares `&K`, `&V` and the hooks by reference.
unsafe impl<K, V, KD, VD> Sync for HashTable<K, V, KD, VD>
where
    K: Sync,
    V: Sync,
    KD: Destructor<K> + Sync,
    VD: Destructor<V> + Sync,
{
}

impl<K, V, KD, VD> Debug for HashTable<K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut out = f.debug_struct("HashTable");
        out.field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("threshold", &self.threshold)
            .field("load_factor", &self.load_factor);

        // Past this many buckets only the count of buckets per chain length
        // is printed.
        if self.buckets.len() <= DEBUG_CHAIN_LIMIT {
            out.field(
                "chains",
                &self
                    .buckets
                    .iter()
                    .map(|&head| chain_len(head))
                    .collect::<Vec<_>>(),
            );
        } else {
            out.field("buckets_per_chain_length", &self.chain_length_counts());
        }
        out.finish()
    }
}

impl<K, V, KD, VD> Clone for HashTable<K, V, KD, VD>
where
    K: Clone,
    V: Clone,
    KD: Destructor<K> + Clone,
    VD: Destructor<V> + Clone,
{
    fn clone(&self) -> Self {
        let mut table = Self {
            buckets: empty_buckets(self.buckets.len()),
            len: 0,
            threshold: self.threshold,
            load_factor: self.load_factor,
            key_destructor: self.key_destructor.clone(),
            value_destructor: self.value_destructor.clone(),
            _phantom: PhantomData,
        };

        for (index, &head) in self.buckets.iter().enumerate() {
            let mut last: Link<K, V> = None;
            let mut cursor = head;
            while let Some(node) = cursor {
                // SAFETY: every link reachable from `buckets` points to a live
                // node owned by `self`.
                let node = unsafe { node.as_ref() };
                let copy = NonNull::from(Box::leak(Box::new(Node {
                    hash: node.hash,
                    key: node.key.clone(),
                    value: node.value.clone(),
                    next: None,
                })));

                match last {
                    // SAFETY: `last` was linked into `table` on the previous
                    // iteration and is still live.
                    Some(mut last) => unsafe { last.as_mut().next = Some(copy) },
                    None => table.buckets[index] = Some(copy),
                }
                last = Some(copy);
                table.len += 1;
                cursor = node.next;
            }
        }

        debug_assert_eq!(table.len, self.len);
        table
    }
}

impl<K, V, KD, VD> Drop for HashTable<K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashTable<K, V> {
    /// Creates an empty table with the default load factor (0.75) and 16
    /// buckets, without destructor hooks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u32, u32> = HashTable::new();
    /// assert_eq!(table.capacity(), 16);
    /// assert_eq!(table.threshold(), 12);
    /// ```
    pub fn new() -> Self {
        Self::with_destructors(NoDestructor, NoDestructor)
    }

    /// Creates an empty table with at least `capacity` buckets and the
    /// default load factor.
    ///
    /// The bucket count is rounded up to the next power of two.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u32, u32> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(DEFAULT_LOAD_FACTOR, capacity, NoDestructor, NoDestructor)
    }

    /// Creates an empty table with at least `capacity` buckets and the given
    /// load factor.
    ///
    /// See [`with_config`](Self::with_config) for how very small load
    /// factors behave.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is not within `(0, 1]`.
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Self {
        Self::with_config(load_factor, capacity, NoDestructor, NoDestructor)
    }
}

impl<K, V, KD, VD> HashTable<K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Creates an empty table with default parameters and the given
    /// destructor hooks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::cell::Cell;
    /// # use std::rc::Rc;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let freed = Rc::new(Cell::new(0));
    /// let counter = freed.clone();
    /// let mut table = HashTable::with_destructors(
    ///     |_key: u32| {},
    ///     move |_value: String| counter.set(counter.get() + 1),
    /// );
    ///
    /// *table.put(7, 7, |&k| k == 7) = "seven".to_string();
    /// assert!(table.remove(7, |&k| k == 7));
    /// assert_eq!(freed.get(), 1);
    /// ```
    pub fn with_destructors(key_destructor: KD, value_destructor: VD) -> Self {
        Self::with_config(
            DEFAULT_LOAD_FACTOR,
            DEFAULT_INITIAL_CAPACITY,
            key_destructor,
            value_destructor,
        )
    }

    /// Creates an empty table from explicit construction parameters.
    ///
    /// `initial_capacity` is rounded up to the next power of two (minimum
    /// one bucket).
    ///
    /// A load factor so small that `floor(load_factor * capacity)` is zero
    /// makes every insertion double the bucket array until the threshold
    /// catches up with `len`. Values much below `1 / capacity` can exhaust
    /// memory within a few dozen insertions.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is not within `(0, 1]`, which includes NaN.
    pub fn with_config(
        load_factor: f32,
        initial_capacity: usize,
        key_destructor: KD,
        value_destructor: VD,
    ) -> Self {
        assert!(
            load_factor > 0.0 && load_factor <= 1.0,
            "load factor must be within (0, 1], got {load_factor}"
        );

        let capacity = bucket_count(initial_capacity);
        Self {
            buckets: empty_buckets(capacity),
            len: 0,
            threshold: threshold(load_factor, capacity),
            load_factor,
            key_destructor,
            value_destructor,
            _phantom: PhantomData,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the entry count at which the next insertion grows the table.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the load factor the table was created with.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    #[inline(always)]
    fn bucket_index(&self, mixed: u32) -> usize {
        mixed as usize & (self.buckets.len() - 1)
    }

    /// Walks the chain for `mixed`, returning the first matching node and its
    /// predecessor (`None` when the node heads its chain).
    #[inline]
    fn find(
        &self,
        mixed: u32,
        eq: impl Fn(&K) -> bool,
    ) -> Option<(Link<K, V>, NonNull<Node<K, V>>)> {
        let mut prev = None;
        let mut cursor = self.buckets[self.bucket_index(mixed)];
        while let Some(node) = cursor {
            // SAFETY: every link reachable from `buckets` points to a live node
            // owned by the table.
            let node_ref = unsafe { node.as_ref() };
            if node_ref.hash == mixed && eq(&node_ref.key) {
                return Some((prev, node));
            }
            prev = cursor;
            cursor = node_ref.next;
        }
        None
    }

    /// Takes ownership of `node`, linking it at the head of its chain.
    fn link_front(&mut self, mut node: Box<Node<K, V>>) -> NonNull<Node<K, V>> {
        let index = self.bucket_index(node.hash);
        node.next = self.buckets[index];
        let node = NonNull::from(Box::leak(node));
        self.buckets[index] = Some(node);
        self.len += 1;
        node
    }

    /// Unlinks `node` from its chain and returns ownership of it.
    ///
    /// # Safety
    ///
    /// `node` must be reachable from the bucket array with `prev` as its
    /// predecessor, as returned by `find` with no mutation in between.
    unsafe fn unlink(&mut self, prev: Link<K, V>, node: NonNull<Node<K, V>>) -> Box<Node<K, V>> {
        // SAFETY: Caller guarantees `prev` and `node` are live nodes of this
        // table, so dereferencing them and reclaiming `node`'s box is sound.
        unsafe {
            let next = node.as_ref().next;
            match prev {
                Some(mut prev) => prev.as_mut().next = next,
                None => {
                    let index = self.bucket_index(node.as_ref().hash);
                    self.buckets[index] = next;
                }
            }
            self.len -= 1;

            let mut node = Box::from_raw(node.as_ptr());
            node.next = None;
            node
        }
    }

    /// Splices `new` into the position held by `old`, returning ownership of
    /// `old`.
    ///
    /// # Safety
    ///
    /// Same contract as `unlink`. `new` must belong in the same bucket as
    /// `old`.
    unsafe fn replace(
        &mut self,
        prev: Link<K, V>,
        old: NonNull<Node<K, V>>,
        mut new: Box<Node<K, V>>,
    ) -> Box<Node<K, V>> {
        // SAFETY: Caller guarantees `prev` and `old` are live nodes of this
        // table.
        unsafe {
            new.next = old.as_ref().next;
            let new = NonNull::from(Box::leak(new));
            match prev {
                Some(mut prev) => prev.as_mut().next = Some(new),
                None => {
                    let index = self.bucket_index(new.as_ref().hash);
                    self.buckets[index] = Some(new);
                }
            }

            let mut old = Box::from_raw(old.as_ptr());
            old.next = None;
            old
        }
    }

    /// Hands the key and value of a permanently discarded node to the hooks.
    fn discard(&mut self, node: Node<K, V>) {
        let Node { key, value, .. } = node;
        self.key_destructor.destroy(key);
        self.value_destructor.destroy(value);
    }

    #[inline(always)]
    fn reserve_for_insert(&mut self) {
        if self.len >= self.threshold {
            self.grow();
        }
    }

    /// Doubles the bucket array and relinks every node using its cached hash.
    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let new_capacity = self
            .buckets
            .len()
            .checked_mul(2)
            .expect("capacity overflow");
        let old = core::mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        self.threshold = threshold(self.load_factor, new_capacity);

        for &head in old.iter() {
            let mut cursor = head;
            while let Some(mut node) = cursor {
                // SAFETY: nodes of the old array are live and each one is
                // relinked exactly once; `next` is read before it is
                // overwritten.
                unsafe {
                    let node_mut = node.as_mut();
                    cursor = node_mut.next;
                    let index = self.bucket_index(node_mut.hash);
                    node_mut.next = self.buckets[index];
                    self.buckets[index] = Some(node);
                }
            }
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// Like every inserting operation, this first grows the table if the
    /// entry count has reached the threshold, whether or not the key turns
    /// out to be present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::Entry;
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, &str> = HashTable::new();
    ///
    /// match table.entry(1, |&k| k == 1) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert(1, "one");
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// match table.entry(1, |&k| k == 1) {
    ///     Entry::Occupied(mut entry) => *entry.get_mut() = "uno",
    ///     Entry::Vacant(_) => unreachable!(),
    /// }
    /// assert_eq!(table.get(1, |&k| k == 1), Some(&"uno"));
    /// ```
    pub fn entry(&mut self, hash: u32, eq: impl Fn(&K) -> bool) -> Entry<'_, K, V, KD, VD> {
        self.reserve_for_insert();

        let mixed = mix(hash);
        match self.find(mixed, eq) {
            Some((prev, node)) => Entry::Occupied(OccupiedEntry {
                table: self,
                prev,
                node,
            }),
            None => Entry::Vacant(VacantEntry { table: self, mixed }),
        }
    }

    /// Returns the value slot for `key`, inserting a default value if the
    /// key is absent.
    ///
    /// This is get-or-insert, not assignment: when an equal key is already
    /// present, its stored key is kept (the passed `key` is dropped) and no
    /// destructor hook runs. Write through the returned reference to set the
    /// value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// *table.put(1, 1, |&k| k == 1) = 2;
    /// assert_eq!(table.get(1, |&k| k == 1), Some(&2));
    ///
    /// // The existing slot is returned untouched.
    /// assert_eq!(*table.put(1, 1, |&k| k == 1), 2);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn put(&mut self, hash: u32, key: K, eq: impl Fn(&K) -> bool) -> &mut V
    where
        V: Default,
    {
        self.put_with(hash, key, eq, V::default)
    }

    /// Like [`put`](Self::put), but a new entry's value comes from `default`.
    pub fn put_with(
        &mut self,
        hash: u32,
        key: K,
        eq: impl Fn(&K) -> bool,
        default: impl FnOnce() -> V,
    ) -> &mut V {
        match self.entry(hash, eq) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(key, default()),
        }
    }

    /// Moves a detached entry back into the table.
    ///
    /// `hash` must be the user hash of the entry's current key; `eq` compares
    /// a stored key (first argument) with the entry's key (second argument).
    ///
    /// If an equal key is already stored, the old entry is replaced: it is
    /// unlinked, the new entry takes its place, and the old key and value are
    /// handed to the destructor hooks. The length is unchanged. Otherwise the
    /// entry is inserted and the length grows by one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::DetachedEntry;
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, &str> = HashTable::new();
    /// table.put_entry(5, DetachedEntry::new(5, "five"), |a, b| a == b);
    /// table.put_entry(5, DetachedEntry::new(5, "FIVE"), |a, b| a == b);
    ///
    /// assert_eq!(table.len(), 1);
    /// assert_eq!(table.get(5, |&k| k == 5), Some(&"FIVE"));
    /// ```
    pub fn put_entry(&mut self, hash: u32, entry: DetachedEntry<K, V>, eq: impl Fn(&K, &K) -> bool) {
        self.reserve_for_insert();

        let mut node = entry.node;
        node.hash = mix(hash);
        match self.find(node.hash, |stored| eq(stored, &node.key)) {
            Some((prev, old)) => {
                // SAFETY: `prev` and `old` come straight from `find`, and the
                // new node hashes to the same bucket as `old`.
                let old = unsafe { self.replace(prev, old, node) };
                self.discard(*old);
            }
            None => {
                self.link_front(node);
            }
        }
    }

    /// Returns a reference to the value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// *table.put(3, 3, |&k| k == 3) = 9;
    ///
    /// assert_eq!(table.get(3, |&k| k == 3), Some(&9));
    /// assert_eq!(table.get(4, |&k| k == 4), None);
    /// ```
    pub fn get(&self, hash: u32, eq: impl Fn(&K) -> bool) -> Option<&V> {
        self.find(mix(hash), eq)
            // SAFETY: the node is live and borrowed immutably with the table.
            .map(|(_, node)| unsafe { &node.as_ref().value })
    }

    /// Returns the stored key and value matching `hash` and `eq`.
    pub fn get_key_value(&self, hash: u32, eq: impl Fn(&K) -> bool) -> Option<(&K, &V)> {
        self.find(mix(hash), eq).map(|(_, node)| {
            // SAFETY: the node is live and borrowed immutably with the table.
            let node = unsafe { node.as_ref() };
            (&node.key, &node.value)
        })
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`.
    pub fn get_mut(&mut self, hash: u32, eq: impl Fn(&K) -> bool) -> Option<&mut V> {
        self.find(mix(hash), eq)
            // SAFETY: the node is live and the table is borrowed mutably for
            // the lifetime of the returned reference.
            .map(|(_, node)| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Returns `true` if an entry matches `hash` and `eq`.
    pub fn contains(&self, hash: u32, eq: impl Fn(&K) -> bool) -> bool {
        self.find(mix(hash), eq).is_some()
    }

    /// Moves the matching entry out of the table without destroying it.
    ///
    /// The caller owns the returned entry. No destructor hook runs; the
    /// entry can be modified and returned with [`put_entry`](Self::put_entry),
    /// or released with [`DetachedEntry::into_parts`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// *table.put(1, 1, |&k| k == 1) = 2;
    ///
    /// let mut entry = table.extract(1, |&k| k == 1).unwrap();
    /// assert!(table.is_empty());
    ///
    /// *entry.key_mut() = 2;
    /// table.put_entry(2, entry, |a, b| a == b);
    /// assert_eq!(table.get(2, |&k| k == 2), Some(&2));
    /// assert_eq!(table.get(1, |&k| k == 1), None);
    /// ```
    pub fn extract(&mut self, hash: u32, eq: impl Fn(&K) -> bool) -> Option<DetachedEntry<K, V>> {
        let (prev, node) = self.find(mix(hash), eq)?;
        // SAFETY: `prev` and `node` come straight from `find`.
        let node = unsafe { self.unlink(prev, node) };
        Some(DetachedEntry { node })
    }

    /// Removes and destroys the matching entry, running the destructor
    /// hooks on its key and value.
    ///
    /// Returns whether an entry was found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// table.put(2, 2, |&k| k == 2);
    ///
    /// assert!(table.remove(2, |&k| k == 2));
    /// assert!(!table.remove(2, |&k| k == 2));
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, hash: u32, eq: impl Fn(&K) -> bool) -> bool {
        match self.extract(hash, eq) {
            Some(entry) => {
                self.discard(*entry.node);
                true
            }
            None => false,
        }
    }

    /// Destroys every entry, running the destructor hooks, while keeping the
    /// current bucket array.
    pub fn clear(&mut self) {
        for index in 0..self.buckets.len() {
            while let Some(head) = self.buckets[index] {
                // SAFETY: `head` is reachable from the bucket array and is
                // unlinked before its box is reclaimed.
                let node = unsafe { Box::from_raw(head.as_ptr()) };
                self.buckets[index] = node.next;
                self.len -= 1;
                self.discard(*node);
            }
        }

        debug_assert_eq!(self.len, 0);
    }

    /// Destroys the table, running the destructor hooks on every remaining
    /// key and value.
    ///
    /// Equivalent to dropping the table.
    pub fn destroy(self) {
        drop(self);
    }

    /// Returns an iterator over all entries, in bucket order and then chain
    /// order.
    ///
    /// The order is unspecified and changes when the table grows.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            cursor: None,
            remaining: self.len,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator allowing in-place mutation of values.
    ///
    /// Keys stay read-only and the table cannot be modified structurally
    /// while the iterator is alive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// for k in 0..4 {
    ///     *table.put(k, k, |&s| s == k) = k;
    /// }
    ///
    /// for (_, value) in table.iter_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(table.get(3, |&k| k == 3), Some(&30));
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            buckets: self.buckets.iter(),
            cursor: None,
            remaining: self.len,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Returns an iterator that moves every entry out of the table.
    ///
    /// Ownership of each key and value passes to the caller, so no
    /// destructor hook runs. Dropping the iterator early finishes the drain.
    /// The bucket array is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            buckets: &mut self.buckets,
            len: &mut self.len,
            bucket_index: 0,
        }
    }

    /// Computes how many buckets hold chains of each length.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> ChainHistogram {
        ChainHistogram {
            counts: self.chain_length_counts(),
        }
    }

    fn chain_length_counts(&self) -> Vec<usize> {
        let mut counts = alloc::vec![0usize; 1];
        for &head in self.buckets.iter() {
            let length = chain_len(head);
            if length >= counts.len() {
                counts.resize(length + 1, 0);
            }
            counts[length] += 1;
        }
        counts
    }

    /// Returns chain and memory statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let histogram = self.chain_histogram();
        let empty_buckets = histogram.counts[0];
        let occupied_buckets = self.buckets.len() - empty_buckets;

        DebugStats {
            len: self.len,
            capacity: self.buckets.len(),
            threshold: self.threshold,
            load_factor: self.load_factor,
            empty_buckets,
            longest_chain: histogram.counts.len() - 1,
            mean_chain: if occupied_buckets == 0 {
                0.0
            } else {
                self.len as f64 / occupied_buckets as f64
            },
            total_bytes: self.buckets.len() * core::mem::size_of::<Link<K, V>>()
                + self.len * core::mem::size_of::<Node<K, V>>(),
        }
    }
}

fn chain_len<K, V>(head: Link<K, V>) -> usize {
    let mut length = 0;
    let mut cursor = head;
    while let Some(node) = cursor {
        length += 1;
        // SAFETY: `head` is a chain head of a live table.
        cursor = unsafe { node.as_ref().next };
    }
    length
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// A vacant entry - the key is not present in the table
    Vacant(VacantEntry<'a, K, V, KD, VD>),
    /// An occupied entry - the key is present in the table
    Occupied(OccupiedEntry<'a, K, V, KD, VD>),
}

impl<'a, K, V, KD, VD> Entry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Inserts `key` and `value` if the entry is vacant and returns a mutable
    /// reference to the stored value.
    pub fn or_insert(self, key: K, value: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(key, value),
        }
    }

    /// Inserts a key and value computed from a closure if the entry is
    /// vacant.
    pub fn or_insert_with(self, default: impl FnOnce() -> (K, V)) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (key, value) = default();
                entry.insert(key, value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
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

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    table: &'a mut HashTable<K, V, KD, VD>,
    mixed: u32,
}

impl<'a, K, V, KD, VD> VacantEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Inserts the key and value at the head of the chain and returns a
    /// mutable reference to the value.
    ///
    /// `key` must hash to the hash this entry was looked up with.
    pub fn insert(self, key: K, value: V) -> &'a mut V {
        let node = self.table.link_front(Box::new(Node {
            hash: self.mixed,
            key,
            value,
            next: None,
        }));
        // SAFETY: the node was just linked and the table stays mutably
        // borrowed for 'a.
        unsafe { &mut (*node.as_ptr()).value }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    table: &'a mut HashTable<K, V, KD, VD>,
    prev: Link<K, V>,
    node: NonNull<Node<K, V>>,
}

impl<'a, K, V, KD, VD> OccupiedEntry<'a, K, V, KD, VD>
where
    KD: Destructor<K>,
    VD: Destructor<V>,
{
    /// Gets a reference to the stored key.
    pub fn key(&self) -> &K {
        // SAFETY: the node was found by lookup and the table is borrowed.
        unsafe { &self.node.as_ref().key }
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: the node was found by lookup and the table is borrowed.
        unsafe { &self.node.as_ref().value }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: the node was found by lookup and the table is borrowed
        // mutably.
        unsafe { &mut self.node.as_mut().value }
    }

    /// Converts the entry into a mutable reference to the value with the
    /// lifetime of the table borrow.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: the node was found by lookup and the table stays mutably
        // borrowed for 'a.
        unsafe { &mut (*self.node.as_ptr()).value }
    }

    /// Moves the entry out of the table without destroying it.
    pub fn extract(self) -> DetachedEntry<K, V> {
        // SAFETY: `prev` and `node` were produced by `find` and the table has
        // been exclusively borrowed since.
        let node = unsafe { self.table.unlink(self.prev, self.node) };
        DetachedEntry { node }
    }

    /// Removes the entry, handing its key and value back to the caller. No
    /// destructor hook runs.
    pub fn remove_entry(self) -> (K, V) {
        self.extract().into_parts()
    }

    /// Removes the entry and runs the destructor hooks on its key and value.
    pub fn discard(self) {
        // SAFETY: see `extract`.
        let node = unsafe { self.table.unlink(self.prev, self.node) };
        self.table.discard(*node);
    }
}

/// An iterator over the entries of a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Link<K, V>>,
    cursor: Link<K, V>,
    remaining: usize,
    _phantom: PhantomData<&'a Node<K, V>>,
}

// SAFETY: `Iter` behaves like a `&'a HashTable` and only hands out shared
// references.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
// SAFETY: as above.
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            buckets: self.buckets.clone(),
            cursor: self.cursor,
            remaining: self.remaining,
            _phantom: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.cursor {
                // SAFETY: the table is borrowed immutably for 'a, so every
                // reachable node stays live and unaliased by writers.
                let node = unsafe { node.as_ref() };
                self.cursor = node.next;
                self.remaining -= 1;
                return Some((&node.key, &node.value));
            }
            self.cursor = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`]. Only
/// values are handed out mutably.
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, K, V> {
    buckets: core::slice::Iter<'a, Link<K, V>>,
    cursor: Link<K, V>,
    remaining: usize,
    _phantom: PhantomData<&'a mut Node<K, V>>,
}

// SAFETY: `IterMut` hands out `&K` and `&mut V` for distinct nodes, like
// `&'a mut HashTable` would.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: `&IterMut` gives no access to the nodes.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.cursor {
                // SAFETY: the table is borrowed mutably for 'a and each node is
                // yielded exactly once, so the value reference is unique.
                let node = unsafe { &mut *node.as_ptr() };
                self.cursor = node.next;
                self.remaining -= 1;
                return Some((&node.key, &mut node.value));
            }
            self.cursor = *self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a [`HashTable`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
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

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`HashTable`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
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

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a [`HashTable`].
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
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

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the entries of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`]. It yields
/// owned `(K, V)` pairs and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, K, V> {
    buckets: &'a mut [Link<K, V>],
    len: &'a mut usize,
    bucket_index: usize,
}

// SAFETY: `Drain` moves owned nodes out of a mutably borrowed table.
unsafe impl<K: Send, V: Send> Send for Drain<'_, K, V> {}
// SAFETY: `&Drain` gives no access to the nodes.
unsafe impl<K: Sync, V: Sync> Sync for Drain<'_, K, V> {}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.bucket_index < self.buckets.len() {
            if let Some(node) = self.buckets[self.bucket_index] {
                // SAFETY: `node` heads a chain of the drained table; it is
                // unlinked before its box is reclaimed.
                let node = unsafe { Box::from_raw(node.as_ptr()) };
                self.buckets[self.bucket_index] = node.next;
                *self.len -= 1;

                let Node { key, value, .. } = *node;
                return Some((key, value));
            }
            self.bucket_index += 1;
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (*self.len, Some(*self.len))
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}

impl<K, V> Drop for Drain<'_, K, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}
