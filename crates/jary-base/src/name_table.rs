//! Open-addressed name table shared by the compiler's scopes and the
//! runtime's `EVENT`/`MODULE` values.
//!
//! Linear probing, power-of-two capacity, doubling past a 0.75 load
//! factor. Three parallel arrays — `keys`, `values`, `kinds` — indexed
//! by the same slot, so a lookup that finds `keys[i]` also has its
//! associated value and kind in hand without a second probe.
//!
//! ```
//! use jary_base::NameTable;
//!
//! let mut table = NameTable::new();
//! let id = table.insert("age", 0, 1);
//! assert_eq!(table.get("age"), Some((id, 0, 1)));
//! assert_eq!(table.get("missing"), None);
//! ```

use std::hash::Hasher;

use fnv::FnvHasher;

fn hash_key(key: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// An associative container keyed by string, with a caller-defined
/// `value` (typically a constant-pool or name-table id) and `kind`
/// (a caller-defined small tag, e.g. a field type or declarator kind)
/// stored alongside each key.
#[derive(Debug, Clone)]
pub struct NameTable {
    keys: Vec<Option<Box<str>>>,
    values: Vec<u32>,
    kinds: Vec<u32>,
    occupied: usize,
}

impl NameTable {
    const MIN_CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self::with_capacity(Self::MIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(Self::MIN_CAPACITY);
        Self {
            keys: vec![None; capacity],
            values: vec![0; capacity],
            kinds: vec![0; capacity],
            occupied: 0,
        }
    }

    /// Inserts or overwrites `key`, returning its slot id. Existing
    /// entries keep their id; this is what makes ids stable enough to
    /// intern elsewhere as a constant.
    pub fn insert(&mut self, key: &str, value: u32, kind: u32) -> u32 {
        if (self.occupied + 1) * 4 >= self.keys.len() * 3 {
            self.grow();
        }
        let idx = self.slot_for(key);
        if self.keys[idx].is_none() {
            self.keys[idx] = Some(key.into());
            self.occupied += 1;
        }
        self.values[idx] = value;
        self.kinds[idx] = kind;
        idx as u32
    }

    pub fn get(&self, key: &str) -> Option<(u32, u32, u32)> {
        let mask = self.keys.len() - 1;
        let start = (hash_key(key) as usize) & mask;
        let mut idx = start;
        loop {
            match &self.keys[idx] {
                None => return None,
                Some(k) if k.as_ref() == key => {
                    return Some((idx as u32, self.values[idx], self.kinds[idx]))
                }
                Some(_) => {
                    idx = (idx + 1) & mask;
                    if idx == start {
                        return None;
                    }
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn key(&self, id: u32) -> &str {
        self.keys[id as usize].as_deref().unwrap_or("")
    }

    pub fn value(&self, id: u32) -> u32 {
        self.values[id as usize]
    }

    pub fn set_value(&mut self, id: u32, value: u32) {
        self.values[id as usize] = value;
    }

    pub fn kind(&self, id: u32) -> u32 {
        self.kinds[id as usize]
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    fn slot_for(&self, key: &str) -> usize {
        let mask = self.keys.len() - 1;
        let mut idx = (hash_key(key) as usize) & mask;
        loop {
            match &self.keys[idx] {
                None => return idx,
                Some(k) if k.as_ref() == key => return idx,
                Some(_) => idx = (idx + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let mut grown = NameTable::with_capacity(self.keys.len() * 2);
        for idx in 0..self.keys.len() {
            if let Some(key) = self.keys[idx].take() {
                grown.insert(&key, self.values[idx], self.kinds[idx]);
            }
        }
        *self = grown;
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
