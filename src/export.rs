use super::*;
use anyhow::Result;
use rayon::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Axis-aligned block of lattice cells, `min` inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelWindow {
    pub min: VoxelIdx,
    pub max: VoxelIdx,
}

impl VoxelWindow {
    pub fn new(min: VoxelIdx, max: VoxelIdx) -> Self {
        Self { min, max }
    }

    /// A periodic axis spans `draw_distance` periods on both sides of the
    /// origin. A non-periodic axis starts one layer into the wall and runs
    /// `draw_distance` cells out. z only counts in periods when the shifts make
    /// it periodic; the capped corner treats it as a plain axis.
    pub fn from_draw_distance(
        periods: Periods,
        draw_distance: DrawDistance,
    ) -> std::result::Result<Self, ConfigError> {
        let axis = |period: i32, distance: i32| -> Option<(i32, i32)> {
            if period > 0 {
                let extent = distance.checked_mul(period)?;
                Some((-extent, extent))
            } else {
                Some((-1, distance))
            }
        };
        let z_period = if periods.is_periodic() { periods.z_height } else { 0 };
        let overflow = || ConfigError::DrawDistanceTooLarge(draw_distance);
        let (x_min, x_max) = axis(periods.x_shift, draw_distance.x).ok_or_else(overflow)?;
        let (y_min, y_max) = axis(periods.y_shift, draw_distance.y).ok_or_else(overflow)?;
        let (z_min, z_max) = axis(z_period, draw_distance.z).ok_or_else(overflow)?;

        Ok(Self::new([x_min, y_min, z_min].into(), [x_max, y_max, z_max].into()))
    }

    pub fn contains(&self, v: VoxelIdx) -> bool {
        (0..3).all(|i| self.min[i] <= v[i] && v[i] < self.max[i])
    }

    pub fn len(&self) -> usize {
        (0..3)
            .map(|i| (self.max[i] - self.min[i]).max(0) as usize)
            .product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// x-major, z fastest
    pub fn iter(&self) -> impl Iterator<Item = VoxelIdx> {
        let VoxelWindow { min, max } = *self;
        (min[0]..max[0]).flat_map(move |x| {
            (min[1]..max[1]).flat_map(move |y| (min[2]..max[2]).map(move |z| VoxelIdx::new([x, y, z])))
        })
    }

    fn on_boundary(&self, v: VoxelIdx) -> bool {
        (0..3).any(|i| v[i] == self.min[i] || v[i] == self.max[i] - 1)
    }
}

/// Every cell of `window` matching `f`, in [`VoxelWindow::iter`] order.
pub fn collect_voxels<F>(window: &VoxelWindow, f: F) -> Vec<VoxelIdx>
where
    F: Fn(VoxelIdx) -> bool + Sync,
{
    if window.is_empty() {
        return vec![];
    }
    let VoxelWindow { min, max } = *window;
    (min[0]..max[0])
        .into_par_iter()
        .flat_map_iter(|x| {
            let mut out = vec![];
            for y in min[1]..max[1] {
                for z in min[2]..max[2] {
                    let v = VoxelIdx::new([x, y, z]);
                    if f(v) {
                        out.push(v);
                    }
                }
            }
            out
        })
        .collect()
}

/// Cells of `window` matching `f` that show at least one `+x`, `+y` or `+z`
/// face. With `include_edges` every matching cell on the window boundary is
/// kept as well, so cut-open stacks stay closed.
///
/// Each column is scanned upward and abandoned at its first exposed top,
/// which assumes `f` is down-closed along z.
pub fn collect_surface_voxels<F>(window: &VoxelWindow, f: F, include_edges: bool) -> Vec<VoxelIdx>
where
    F: Fn(VoxelIdx) -> bool + Sync,
{
    if window.is_empty() {
        return vec![];
    }
    let VoxelWindow { min, max } = *window;
    (min[0]..max[0])
        .into_par_iter()
        .flat_map_iter(|x| {
            let mut out = vec![];
            for y in min[1]..max[1] {
                for z in min[2]..max[2] {
                    let v = VoxelIdx::new([x, y, z]);
                    if !f(v) {
                        continue;
                    }
                    let [right, front, above] = v.outward().map(&f);
                    if (include_edges && window.on_boundary(v)) || !right || !front || !above {
                        out.push(v);
                    }
                    if !above {
                        break;
                    }
                }
            }
            out
        })
        .collect()
}

impl<R: rand::Rng> PeriodicLozengeTiling<R> {
    pub fn wall_voxels(&self) -> Vec<VoxelIdx> {
        let lattice = *self.lattice();
        collect_voxels(&self.voxel_window(), |v| lattice.is_wall(v))
    }

    pub fn box_voxels(&self) -> Vec<VoxelIdx> {
        let (lattice, data) = (self.lattice(), self.height_map());
        collect_voxels(&self.voxel_window(), |v| crate::tiling::occupied(lattice, data, v))
    }

    /// Wall cells a renderer can see.
    pub fn visible_wall_voxels(&self) -> Vec<VoxelIdx> {
        let lattice = *self.lattice();
        collect_surface_voxels(&self.voxel_window(), |v| lattice.is_wall(v), false)
    }

    /// Box cells a renderer can see, including those cut by the window.
    pub fn visible_box_voxels(&self) -> Vec<VoxelIdx> {
        let (lattice, data) = (self.lattice(), self.height_map());
        collect_surface_voxels(
            &self.voxel_window(),
            |v| crate::tiling::occupied(lattice, data, v),
            true,
        )
    }
}

/// Writes one `v x y z` line per voxel.
pub fn write_voxels<W: Write>(w: &mut W, voxels: &[VoxelIdx]) -> Result<()> {
    for v in voxels {
        let [x, y, z] = v.idx;
        writeln!(w, "v {} {} {}", x, y, z)?;
    }
    Ok(())
}

pub fn save_voxels<P: AsRef<Path>>(path: P, voxels: &[VoxelIdx]) -> Result<()> {
    let w = File::create(path)?;
    let mut w = std::io::BufWriter::new(w);
    write_voxels(&mut w, voxels)?;
    w.flush()?;
    Ok(())
}
