use super::{Periods, VoxelIdx};

/// Periodic geometry of the lattice: canonical coordinates and the wall.
///
/// With period vector `T = (-x_shift, -y_shift, z_height)` the admissible
/// region is the union of the corner orthant `x, y, z >= 0` translated by every
/// multiple of `T`. Everything outside is wall.
///
/// The larger shift picks the dominant axis (`y` on ties). Canonical
/// coordinates keep the dominant coordinate in `[0, shift)`, so a canonical
/// column is indexed by the free non-dominant coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    periods: Periods,
}

impl Lattice {
    pub fn new(periods: Periods) -> Self {
        Self { periods }
    }

    pub fn periods(&self) -> Periods {
        self.periods
    }

    fn y_dominant(&self) -> bool {
        self.periods.y_shift >= self.periods.x_shift
    }

    // normalize(x,y,z): (x,y,z) - (y div y_shift) * (x_shift, y_shift, -z_height)
    pub fn normalize(&self, v: VoxelIdx) -> VoxelIdx {
        let Periods {
            x_shift,
            y_shift,
            z_height,
        } = self.periods;

        if !self.periods.is_periodic() {
            return v;
        }

        let [x, y, z] = v.idx;
        let shift = if self.y_dominant() {
            y.div_euclid(y_shift)
        } else {
            x.div_euclid(x_shift)
        };

        // saturates only far outside any reachable stack
        VoxelIdx::new([
            x.saturating_sub(shift.saturating_mul(x_shift)),
            y - shift * y_shift,
            z.saturating_add(shift.saturating_mul(z_height)),
        ])
    }

    /// Lowest non-wall z of a canonical column, `None` if the column is wall
    /// all the way up.
    pub fn floor(&self, column: [i32; 2]) -> Option<i32> {
        let Periods {
            x_shift,
            y_shift,
            z_height,
        } = self.periods;
        let [x, y] = column;

        if !self.periods.is_periodic() {
            return if x < 0 || y < 0 { None } else { Some(0) };
        }

        let (free, free_shift) = if self.y_dominant() {
            (x, x_shift)
        } else {
            (y, y_shift)
        };

        if free >= 0 {
            return Some(0);
        }
        if free_shift == 0 {
            return None;
        }
        // columns behind the boundary plane sit on a staircase, one period
        // height per started shift; a floor past i32::MAX is wall everywhere
        let steps = ((-(free + 1)) / free_shift).checked_add(1)?;
        steps.checked_mul(z_height)
    }

    pub fn is_wall(&self, v: VoxelIdx) -> bool {
        let n = self.normalize(v);
        match self.floor(n.xy()) {
            Some(floor) => n[2] < floor,
            None => true,
        }
    }

    /// Height cap of the non-periodic corner, see [`Periods`].
    pub fn above_cap(&self, v: VoxelIdx) -> bool {
        let Periods { z_height, .. } = self.periods;
        !self.periods.is_periodic() && z_height > 0 && v[2] > z_height - 1
    }
}
