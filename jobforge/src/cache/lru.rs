//! Thread-safe bounded LRU cache.
//!
//! A mapping of at most `capacity` entries. Each `get` or `put` promotes the
//! touched key to most-recently-used; inserting a new key at capacity evicts
//! the least-recently-used key in the same critical section. `contains` is a
//! pure membership test and does not count as an access.
//!
//! Recency is tracked with an index-linked list over a slab of nodes, so all
//! operations are O(1) expected. Everything is serialized under one internal
//! mutex; clones of values are returned so the lock is never held by callers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Sentinel index for "no node".
const NIL: usize = usize::MAX;

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

struct LruInner<K, V> {
    /// Key to slab index.
    map: HashMap<K, usize>,
    /// Slab of nodes; freed slots are recycled via `free`.
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    /// Most-recently-used end.
    head: usize,
    /// Least-recently-used end (evicted next).
    tail: usize,
}

impl<K: Eq + Hash + Clone, V> LruInner<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.nodes[idx].as_ref().expect("node slot is occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.nodes[idx].as_mut().expect("node slot is occupied")
    }

    /// Unlink a node from the recency list without freeing its slot.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    /// Link a detached node at the most-recently-used end.
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn promote(&mut self, idx: usize) {
        if self.head != idx {
            self.detach(idx);
            self.attach_front(idx);
        }
    }

    /// Remove the least-recently-used entry and recycle its slot.
    fn evict_tail(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }
        self.detach(idx);
        let node = self.nodes[idx].take().expect("tail slot is occupied");
        self.map.remove(&node.key);
        self.free.push(idx);
    }

    fn insert_front(&mut self, key: K, value: V) {
        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.attach_front(idx);
    }
}

/// Thread-safe bounded LRU cache.
///
/// # Example
///
/// ```ignore
/// use jobforge::cache::LruCache;
///
/// let cache: LruCache<String, u64> = LruCache::new(128);
/// cache.put("answer".to_string(), 42);
/// assert_eq!(cache.get(&"answer".to_string()), Some(42));
/// ```
pub struct LruCache<K, V> {
    inner: Mutex<LruInner<K, V>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LruInner::new(capacity)),
            capacity,
        }
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let idx = *inner.map.get(key)?;
        inner.promote(idx);
        Some(inner.node(idx).value.clone())
    }

    /// Insert or overwrite `key`, promoting it to most-recently-used.
    ///
    /// Inserting a new key at capacity evicts the least-recently-used key
    /// atomically with the insertion.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&idx) = inner.map.get(&key) {
            inner.node_mut(idx).value = value;
            inner.promote(idx);
            return;
        }
        if inner.map.len() == self.capacity {
            inner.evict_tail();
        }
        inner.insert_front(key, value);
    }

    /// Membership test. Does not promote the key.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().unwrap().map.contains_key(key)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
