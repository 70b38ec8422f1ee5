use ahash::AHashMap;

const BITS: u64 = 32;
const MASK: u64 = (1 << BITS) - 1;

// every i32 pair fits, no bound check needed
pub fn column_key(column: [i32; 2]) -> u64 {
    let pack_axis = |v: i32| -> u64 { v as u32 as u64 };
    (pack_axis(column[0]) << BITS) | pack_axis(column[1])
}

pub fn column_from_key(key: u64) -> [i32; 2] {
    let unpack_axis = |v: u64| -> i32 { v as u32 as i32 };
    [unpack_axis(key >> BITS), unpack_axis(key & MASK)]
}

/// Sparse height map over canonical columns.
///
/// Stores the number of boxes stacked on each column's floor. A missing entry
/// is an empty column; an entry of 1 is a single box sitting on the floor.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct BoxMap {
    data: AHashMap<u64, i32>,
}

impl BoxMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self, column: [i32; 2]) -> i32 {
        self.data.get(&column_key(column)).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, column: [i32; 2]) {
        *self.data.entry(column_key(column)).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, column: [i32; 2]) {
        let key = column_key(column);
        match self.data.get_mut(&key) {
            Some(height) => {
                *height -= 1;
                if *height == 0 {
                    self.data.remove(&key);
                }
            }
            None => {
                debug_assert!(false, "decrement of empty column {:?}", column);
            }
        }
    }

    /// Total number of boxes, i.e. boxes in one fundamental domain.
    pub fn box_count(&self) -> usize {
        self.data.values().map(|h| *h as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = ([i32; 2], i32)> + '_ {
        self.data.iter().map(|(k, h)| (column_from_key(*k), *h))
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}
