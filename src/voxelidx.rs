/// Integer lattice coordinate, `[x, y, z]`.
///
///    z
///    |
///    +-- y
///   /
///  x
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelIdx {
    pub idx: [i32; 3],
}

impl VoxelIdx {
    pub const fn new(idx: [i32; 3]) -> Self {
        Self { idx }
    }

    pub const fn unit_x() -> Self {
        Self::new([1, 0, 0])
    }
    pub const fn unit_y() -> Self {
        Self::new([0, 1, 0])
    }
    pub const fn unit_z() -> Self {
        Self::new([0, 0, 1])
    }

    /// `+x`, `+y`, `+z`: the faces a box exposes, and the cells it supports.
    pub fn outward(&self) -> [VoxelIdx; 3] {
        [
            *self + Self::unit_x(),
            *self + Self::unit_y(),
            *self + Self::unit_z(),
        ]
    }

    /// `-x`, `-y`, `-z`: the cells a box rests on.
    pub fn inward(&self) -> [VoxelIdx; 3] {
        [
            *self - Self::unit_x(),
            *self - Self::unit_y(),
            *self - Self::unit_z(),
        ]
    }

    /// column coordinate
    pub fn xy(&self) -> [i32; 2] {
        [self.idx[0], self.idx[1]]
    }
}

impl From<[i32; 3]> for VoxelIdx {
    fn from(idx: [i32; 3]) -> Self {
        Self { idx }
    }
}

impl From<VoxelIdx> for [i32; 3] {
    fn from(v: VoxelIdx) -> Self {
        v.idx
    }
}

impl std::ops::Index<usize> for VoxelIdx {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.idx[index]
    }
}

impl std::ops::Add for VoxelIdx {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let [x0, y0, z0] = self.idx;
        let [x1, y1, z1] = other.idx;
        Self::new([x0 + x1, y0 + y1, z0 + z1])
    }
}

impl std::ops::Sub for VoxelIdx {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        let [x0, y0, z0] = self.idx;
        let [x1, y1, z1] = other.idx;
        Self::new([x0 - x1, y0 - y1, z0 - z1])
    }
}

impl std::fmt::Display for VoxelIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.idx;
        write!(f, "({}, {}, {})", x, y, z)
    }
}
