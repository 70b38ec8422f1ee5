use super::VoxelIdx;
use indexmap::IndexSet;
use rand::Rng;

type VoxelIndexSet = IndexSet<VoxelIdx, ahash::RandomState>;

/// Set of canonical lattice positions with O(1) insert, remove and uniform
/// pick.
///
/// Removal swaps the last element into the hole, so iteration order depends on
/// the history of operations only, never on hashing.
#[derive(Debug, Clone, Default)]
pub struct BoxSet {
    data: VoxelIndexSet,
}

impl BoxSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, v: VoxelIdx) -> bool {
        self.data.insert(v)
    }

    pub fn remove(&mut self, v: &VoxelIdx) -> bool {
        self.data.swap_remove(v)
    }

    pub fn contains(&self, v: &VoxelIdx) -> bool {
        self.data.contains(v)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelIdx> + '_ {
        self.data.iter()
    }

    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<VoxelIdx> {
        if self.data.is_empty() {
            return None;
        }
        let i = rng.gen_range(0..self.data.len());
        self.data.get_index(i).copied()
    }
}

impl PartialEq for BoxSet {
    // same members, regardless of order
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl Eq for BoxSet {}

impl FromIterator<VoxelIdx> for BoxSet {
    fn from_iter<I: IntoIterator<Item = VoxelIdx>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
