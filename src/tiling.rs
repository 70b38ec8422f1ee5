use super::*;
use log::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use simple_stopwatch::Stopwatch;

/// Whether `v` is a box of the stack described by `lattice` and `data`.
///
/// Takes the two pieces separately so exporters can share them across
/// threads without the random source.
pub(crate) fn occupied(lattice: &Lattice, data: &BoxMap, v: VoxelIdx) -> bool {
    let n = lattice.normalize(v);
    let column = n.xy();
    match lattice.floor(column) {
        Some(floor) => n[2] >= floor && n[2] < floor + data.height(column),
        None => false,
    }
}

/// A periodic stack of unit boxes in a corner, the 3D picture of a lozenge
/// tiling.
///
/// Holds the height map together with the two frontier sets:
/// - addable: empty cells whose `-x`, `-y`, `-z` neighbors are wall or box
/// - removable: boxes whose `+x`, `+y`, `+z` neighbors are empty
///
/// Both sets store canonical coordinates and are kept equal to the predicates
/// [`Self::can_add_box`] / [`Self::can_remove_box`] by local updates around
/// every added or removed box.
#[derive(Debug, Clone)]
pub struct PeriodicLozengeTiling<R = ChaCha12Rng> {
    lattice: Lattice,
    draw_distance: DrawDistance,
    window: VoxelWindow,
    data: BoxMap,
    addable_boxes: BoxSet,
    removable_boxes: BoxSet,
    rng: R,
}

impl PeriodicLozengeTiling<ChaCha12Rng> {
    pub fn new(periods: Periods, draw_distance: DrawDistance) -> Result<Self, ConfigError> {
        Self::with_rng(periods, draw_distance, ChaCha12Rng::from_entropy())
    }

    pub fn with_seed(
        periods: Periods,
        draw_distance: DrawDistance,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::with_rng(periods, draw_distance, ChaCha12Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> PeriodicLozengeTiling<R> {
    pub fn with_rng(
        periods: Periods,
        draw_distance: DrawDistance,
        rng: R,
    ) -> Result<Self, ConfigError> {
        periods.validate()?;
        draw_distance.validate()?;
        let window = VoxelWindow::from_draw_distance(periods, draw_distance)?;

        let mut tiling = Self {
            lattice: Lattice::new(periods),
            draw_distance,
            window,
            data: BoxMap::new(),
            addable_boxes: BoxSet::new(),
            removable_boxes: BoxSet::new(),
            rng,
        };
        tiling.reset();
        Ok(tiling)
    }

    /// Back to the empty stack. The corner cell is the only addable one.
    pub fn reset(&mut self) {
        self.data.clear();
        self.addable_boxes.clear();
        self.removable_boxes.clear();
        self.addable_boxes.insert(VoxelIdx::default());
        debug!("reset: periods={:?}", self.lattice.periods());
    }

    /// Cached canonical coordinates are meaningless under other periods, so
    /// this always resets.
    pub fn set_periods(&mut self, periods: Periods) -> Result<(), ConfigError> {
        periods.validate()?;
        self.window = VoxelWindow::from_draw_distance(periods, self.draw_distance)?;
        self.lattice = Lattice::new(periods);
        self.reset();
        Ok(())
    }

    pub fn set_draw_distance(&mut self, draw_distance: DrawDistance) -> Result<(), ConfigError> {
        draw_distance.validate()?;
        self.window = VoxelWindow::from_draw_distance(self.periods(), draw_distance)?;
        self.draw_distance = draw_distance;
        Ok(())
    }

    pub fn periods(&self) -> Periods {
        self.lattice.periods()
    }

    pub fn draw_distance(&self) -> DrawDistance {
        self.draw_distance
    }

    /// Export window of the current periods and draw distance.
    pub fn voxel_window(&self) -> VoxelWindow {
        self.window
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn height_map(&self) -> &BoxMap {
        &self.data
    }

    pub fn addable_boxes(&self) -> &BoxSet {
        &self.addable_boxes
    }

    pub fn removable_boxes(&self) -> &BoxSet {
        &self.removable_boxes
    }

    pub fn addable_box_count(&self) -> usize {
        self.addable_boxes.len()
    }

    pub fn removable_box_count(&self) -> usize {
        self.removable_boxes.len()
    }

    /// Boxes in one fundamental domain.
    pub fn period_box_count(&self) -> usize {
        self.data.box_count()
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn is_wall(&self, v: VoxelIdx) -> bool {
        self.lattice.is_wall(v)
    }

    pub fn is_box(&self, v: VoxelIdx) -> bool {
        occupied(&self.lattice, &self.data, v)
    }

    pub fn is_wall_or_box(&self, v: VoxelIdx) -> bool {
        self.is_wall(v) || self.is_box(v)
    }

    fn is_empty(&self, v: VoxelIdx) -> bool {
        !self.is_wall_or_box(v)
    }

    pub fn can_add_box(&self, v: VoxelIdx) -> bool {
        if self.lattice.above_cap(v) {
            return false;
        }
        // looking from +y: left, behind, below
        self.is_empty(v) && v.inward().iter().all(|w| self.is_wall_or_box(*w))
    }

    pub fn can_remove_box(&self, v: VoxelIdx) -> bool {
        // looking from +y: right, front, above
        self.is_box(v) && v.outward().iter().all(|w| !self.is_box(*w))
    }

    /// Puts a box at `v` if it is addable. Returns whether anything changed.
    pub fn add_box(&mut self, v: VoxelIdx) -> bool {
        if !self.can_add_box(v) {
            return false;
        }
        let n = self.lattice.normalize(v);

        self.data.increment(n.xy());
        self.addable_boxes.remove(&n);
        self.removable_boxes.insert(n);

        // the new box can only enable cells it supports, and only disable
        // removal of the cells it rests on
        for w in n.outward() {
            if self.can_add_box(w) {
                let w = self.lattice.normalize(w);
                self.addable_boxes.insert(w);
            }
        }
        for w in n.inward() {
            if !self.can_remove_box(w) {
                let w = self.lattice.normalize(w);
                self.removable_boxes.remove(&w);
            }
        }

        trace!("add_box: {}", n);
        self.debug_check_around(n);
        true
    }

    /// Takes the box at `v` away if it is removable. Returns whether anything
    /// changed.
    pub fn remove_box(&mut self, v: VoxelIdx) -> bool {
        if !self.can_remove_box(v) {
            return false;
        }
        let n = self.lattice.normalize(v);

        self.data.decrement(n.xy());
        self.removable_boxes.remove(&n);
        self.addable_boxes.insert(n);

        for w in n.outward() {
            if !self.can_add_box(w) {
                let w = self.lattice.normalize(w);
                self.addable_boxes.remove(&w);
            }
        }
        for w in n.inward() {
            if self.can_remove_box(w) {
                let w = self.lattice.normalize(w);
                self.removable_boxes.insert(w);
            }
        }

        trace!("remove_box: {}", n);
        self.debug_check_around(n);
        true
    }

    fn debug_check_around(&self, n: VoxelIdx) {
        if !cfg!(debug_assertions) {
            return;
        }
        for w in std::iter::once(n).chain(n.outward()).chain(n.inward()) {
            let c = self.lattice.normalize(w);
            debug_assert_eq!(
                self.addable_boxes.contains(&c),
                self.can_add_box(w),
                "addable set out of sync at {}",
                w
            );
            debug_assert_eq!(
                self.removable_boxes.contains(&c),
                self.can_remove_box(w),
                "removable set out of sync at {}",
                w
            );
        }
    }

    /// Cells where the frontier sets disagree with the predicates: every set
    /// member, plus every cell of `window`.
    pub fn boundary_mismatches(&self, window: &VoxelWindow) -> Vec<VoxelIdx> {
        let mut out = vec![];
        for v in self.addable_boxes.iter() {
            if !self.can_add_box(*v) || self.lattice.normalize(*v) != *v {
                out.push(*v);
            }
        }
        for v in self.removable_boxes.iter() {
            if !self.can_remove_box(*v) || self.lattice.normalize(*v) != *v {
                out.push(*v);
            }
        }
        for v in window.iter() {
            let c = self.lattice.normalize(v);
            if self.addable_boxes.contains(&c) != self.can_add_box(v)
                || self.removable_boxes.contains(&c) != self.can_remove_box(v)
            {
                out.push(v);
            }
        }
        out
    }

    pub fn add_random_box(&mut self) -> Option<VoxelIdx> {
        let v = self.addable_boxes.choose(&mut self.rng)?;
        self.add_box(v);
        Some(v)
    }

    pub fn remove_random_box(&mut self) -> Option<VoxelIdx> {
        let v = self.removable_boxes.choose(&mut self.rng)?;
        self.remove_box(v);
        Some(v)
    }

    /// Resets, then adds `iterations` uniformly chosen addable boxes.
    pub fn generate_by_adding_only(&mut self, iterations: usize) {
        let sw = Stopwatch::start_new();
        self.reset();

        for _ in 0..iterations {
            if self.add_random_box().is_none() {
                debug!("generate_by_adding_only: no addable box left");
            }
        }

        debug!(
            "generate_by_adding_only: took={:.2}ms, iterations={}, boxes={}, addable={}, removable={}",
            sw.ms(),
            iterations,
            self.period_box_count(),
            self.addable_box_count(),
            self.removable_box_count(),
        );
    }

    /// Resets, then runs `iterations` steps of the birth/death chain.
    ///
    /// Each step races two exponential clocks, one with rate `q * |addable|`
    /// and one with rate `|removable|`, and applies a uniformly random move of
    /// the winner. An empty set never wins.
    pub fn generate_with_markov_chain(&mut self, iterations: usize, q: f64) -> Result<(), ConfigError> {
        validate_q(q)?;

        let sw = Stopwatch::start_new();
        self.reset();

        for _ in 0..iterations {
            self.markov_step(q);
        }

        debug!(
            "generate_with_markov_chain: took={:.2}ms, iterations={}, q={}, boxes={}, addable={}, removable={}",
            sw.ms(),
            iterations,
            q,
            self.period_box_count(),
            self.addable_box_count(),
            self.removable_box_count(),
        );
        Ok(())
    }

    fn markov_step(&mut self, q: f64) {
        let u1: f64 = self.rng.gen();
        let u2: f64 = self.rng.gen();

        let race = |u: f64, rate: f64| {
            if rate > 0.0 {
                -(1.0 - u).ln() / rate
            } else {
                f64::INFINITY
            }
        };
        let t_add = race(u1, self.addable_box_count() as f64 * q);
        let t_remove = race(u2, self.removable_box_count() as f64);

        if t_add < t_remove {
            self.add_random_box();
        } else {
            self.remove_random_box();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiling(x_shift: i32, y_shift: i32, z_height: i32, seed: u64) -> PeriodicLozengeTiling {
        PeriodicLozengeTiling::with_seed(
            Periods::new(x_shift, y_shift, z_height),
            DrawDistance::new(3, 3, 3),
            seed,
        )
        .unwrap()
    }

    fn set_of(items: &[[i32; 3]]) -> BoxSet {
        items.iter().copied().map(VoxelIdx::from).collect()
    }

    fn test_window() -> VoxelWindow {
        VoxelWindow::new([-6, -6, -6].into(), [6, 6, 6].into())
    }

    const CONFIGS: [[i32; 3]; 6] = [[0, 0, 0], [0, 0, 2], [1, 2, 2], [3, 1, 2], [0, 2, 1], [2, 2, 3]];

    fn period_vector(t: &PeriodicLozengeTiling) -> VoxelIdx {
        let p = t.periods();
        VoxelIdx::new([-p.x_shift, -p.y_shift, p.z_height])
    }

    // counts canonical boxes column by column through `is_box`
    fn recount(t: &PeriodicLozengeTiling) -> usize {
        let total = t.period_box_count() as i32;
        let mut count = 0;
        for (column, _) in t.height_map().iter() {
            let floor = t.lattice().floor(column).unwrap();
            for z in (floor - 2)..(floor + total + 2) {
                if t.is_box([column[0], column[1], z].into()) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(PeriodicLozengeTiling::new(Periods::new(-1, 0, 0), DrawDistance::new(1, 1, 1)).is_err());
        assert!(PeriodicLozengeTiling::new(Periods::new(0, 0, 0), DrawDistance::new(0, 1, 1)).is_err());
        assert!(PeriodicLozengeTiling::new(Periods::new(2, 1, 0), DrawDistance::new(1, 1, 1)).is_err());
    }

    #[test]
    fn rejects_configurations_that_overflow() {
        let tall = Periods::new(1, 1, 1_500_000_000);
        assert_eq!(
            PeriodicLozengeTiling::with_seed(tall, DrawDistance::new(1, 1, 1), 1).err(),
            Some(ConfigError::PeriodTooLarge(tall))
        );

        let far = DrawDistance::new(1_500_000_000, 1, 1);
        assert_eq!(
            PeriodicLozengeTiling::with_seed(Periods::new(2, 2, 1), far, 1).err(),
            Some(ConfigError::DrawDistanceTooLarge(far))
        );
    }

    #[test]
    fn tallest_period_grows_without_overflow() {
        let mut t = tiling(1, 1, crate::MAX_PERIOD, 21);
        t.generate_by_adding_only(200);
        assert_eq!(t.period_box_count(), 200);
        assert_eq!(recount(&t), 200);
        assert!(t.boundary_mismatches(&test_window()).is_empty());
    }

    #[test]
    fn overflowing_draw_distance_keeps_state() {
        let mut t = tiling(2, 2, 1, 22);
        t.generate_by_adding_only(25);
        let window = t.voxel_window();

        let far = DrawDistance::new(1_500_000_000, 1, 1);
        assert!(t.set_draw_distance(far).is_err());
        assert_eq!(t.draw_distance(), DrawDistance::new(3, 3, 3));
        assert_eq!(t.voxel_window(), window);
        assert!(!t.box_voxels().is_empty());

        // fine while x is not periodic, overflows once it is
        t.set_periods(Periods::new(0, 2, 1)).unwrap();
        t.set_draw_distance(far).unwrap();
        t.generate_by_adding_only(10);
        assert_eq!(
            t.set_periods(Periods::new(2, 2, 1)),
            Err(ConfigError::DrawDistanceTooLarge(far))
        );
        assert_eq!(t.periods(), Periods::new(0, 2, 1));
        assert_eq!(t.period_box_count(), 10);
    }

    #[test]
    fn starts_with_the_corner_addable() {
        for [x, y, z] in CONFIGS {
            let t = tiling(x, y, z, 0);
            assert_eq!(t.addable_boxes(), &set_of(&[[0, 0, 0]]));
            assert!(t.removable_boxes().is_empty());
            assert_eq!(t.period_box_count(), 0);
            assert!(t.boundary_mismatches(&test_window()).is_empty(), "{:?}", t.periods());
        }
    }

    #[test]
    fn first_random_box_lands_in_the_corner() {
        let mut t = tiling(0, 0, 0, 1);
        assert_eq!(t.add_random_box(), Some(VoxelIdx::new([0, 0, 0])));
        assert!(t.is_box([0, 0, 0].into()));
        assert_eq!(t.period_box_count(), 1);
        assert_eq!(t.addable_boxes(), &set_of(&[[1, 0, 0], [0, 1, 0], [0, 0, 1]]));
        assert_eq!(t.removable_boxes(), &set_of(&[[0, 0, 0]]));
    }

    #[test]
    fn removing_the_only_box_restores_empty_state() {
        let mut t = tiling(0, 0, 0, 1);
        t.add_random_box();
        assert_eq!(t.remove_random_box(), Some(VoxelIdx::new([0, 0, 0])));
        assert_eq!(t.period_box_count(), 0);
        assert_eq!(t.addable_boxes(), &set_of(&[[0, 0, 0]]));
        assert!(t.removable_boxes().is_empty());
    }

    #[test]
    fn empty_frontier_is_a_no_op() {
        let mut t = tiling(0, 0, 0, 1);
        assert_eq!(t.remove_random_box(), None);
        assert_eq!(t.period_box_count(), 0);
        assert_eq!(t.addable_box_count(), 1);
    }

    #[test]
    fn illegal_moves_change_nothing() {
        let mut t = tiling(0, 0, 0, 1);
        assert!(!t.add_box([1, 0, 0].into()));
        assert!(!t.add_box([-1, 0, 0].into()));
        assert!(!t.remove_box([0, 0, 0].into()));
        assert!(t.add_box([0, 0, 0].into()));
        assert!(t.add_box([0, 0, 1].into()));
        assert!(!t.remove_box([0, 0, 0].into()));
        assert_eq!(t.period_box_count(), 2);
    }

    #[test]
    fn periodic_growth_counts_boxes_per_period() {
        let mut t = tiling(1, 2, 2, 7);
        t.generate_by_adding_only(5);
        assert_eq!(t.period_box_count(), 5);
        assert_eq!(recount(&t), 5);

        let period = period_vector(&t);
        let mut found = 0;
        for v in test_window().iter() {
            if !t.is_box(v) {
                continue;
            }
            found += 1;
            let mut w = v;
            for _ in 0..4 {
                w = w + period;
                assert!(t.is_box(w), "{} is a box but its translate {} is not", v, w);
            }
            let mut w = v;
            for _ in 0..4 {
                w = w - period;
                assert!(t.is_box(w), "{} is a box but its translate {} is not", v, w);
            }
        }
        assert!(found > 5);
    }

    #[test]
    fn generation_resets_first() {
        let mut t = tiling(1, 2, 2, 3);
        t.generate_by_adding_only(20);
        t.generate_by_adding_only(4);
        assert_eq!(t.period_box_count(), 4);
    }

    #[test]
    fn markov_chain_is_deterministic_for_a_seed() {
        let mut a = tiling(1, 2, 3, 42);
        let mut b = tiling(1, 2, 3, 42);
        a.generate_with_markov_chain(1000, 0.5).unwrap();
        b.generate_with_markov_chain(1000, 0.5).unwrap();
        assert_eq!(a.height_map(), b.height_map());
        assert_eq!(a.addable_boxes(), b.addable_boxes());
        assert_eq!(a.removable_boxes(), b.removable_boxes());
    }

    #[test]
    fn markov_chain_with_zero_q_never_grows() {
        let mut t = tiling(0, 0, 0, 5);
        t.generate_with_markov_chain(100, 0.0).unwrap();
        assert_eq!(t.period_box_count(), 0);
        assert_eq!(t.addable_box_count(), 1);
    }

    #[test]
    fn markov_chain_with_full_q_grows() {
        let mut t = tiling(0, 0, 0, 5);
        t.generate_with_markov_chain(200, 1.0).unwrap();
        assert!(t.period_box_count() > 0);
        assert!(t.boundary_mismatches(&test_window()).is_empty());
    }

    #[test]
    fn markov_chain_rejects_bad_q_without_touching_state() {
        let mut t = tiling(0, 0, 0, 5);
        t.generate_by_adding_only(10);
        let before = t.clone();
        assert_eq!(
            t.generate_with_markov_chain(10, 1.5),
            Err(ConfigError::InvalidQ(1.5))
        );
        assert_eq!(t.height_map(), before.height_map());
    }

    #[test]
    fn frontier_sets_agree_with_predicates_on_random_walks() {
        for (i, [x, y, z]) in CONFIGS.into_iter().enumerate() {
            let mut t = tiling(x, y, z, 100 + i as u64);
            for step in 0..120 {
                if t.rng_mut().gen_bool(0.65) {
                    t.add_random_box();
                } else {
                    t.remove_random_box();
                }
                let mismatches = t.boundary_mismatches(&test_window());
                assert!(
                    mismatches.is_empty(),
                    "periods={:?}, step={}, mismatches={:?}",
                    t.periods(),
                    step,
                    mismatches
                );
                assert_eq!(recount(&t), t.period_box_count());
            }
        }
    }

    #[test]
    fn no_floating_boxes() {
        for (i, [x, y, z]) in CONFIGS.into_iter().enumerate() {
            let mut t = tiling(x, y, z, 200 + i as u64);
            t.generate_with_markov_chain(300, 0.8).unwrap();
            for v in test_window().iter() {
                if t.is_box(v) {
                    assert!(!t.is_wall(v));
                    for w in v.inward() {
                        assert!(t.is_wall_or_box(w), "{} floats over {}", v, w);
                    }
                }
            }
        }
    }

    #[test]
    fn add_then_remove_is_identity() {
        for (i, [x, y, z]) in CONFIGS.into_iter().enumerate() {
            let mut t = tiling(x, y, z, 300 + i as u64);
            t.generate_by_adding_only(25);
            let candidates: Vec<VoxelIdx> = t.addable_boxes().iter().copied().collect();
            for b in candidates {
                let mut u = t.clone();
                assert!(u.add_box(b), "{} should be addable", b);
                assert!(u.remove_box(b), "{} should be removable", b);
                assert_eq!(u.height_map(), t.height_map());
                assert_eq!(u.addable_boxes(), t.addable_boxes());
                assert_eq!(u.removable_boxes(), t.removable_boxes());
            }
        }
    }

    #[test]
    fn equivalent_coordinates_are_interchangeable() {
        let mut t = tiling(1, 2, 2, 9);
        // (0, 2, 0) ~ (-1, 0, 2): needs (0, 0, 0) and (0, 1, 0) underneath
        assert!(!t.can_add_box([0, 2, 0].into()));
        assert!(t.add_box([0, 0, 0].into()));
        assert!(t.add_box([0, 1, 0].into()));
        assert!(t.can_add_box([-1, 0, 2].into()));
        assert!(t.add_box([0, 2, 0].into()));
        assert!(t.is_box([-1, 0, 2].into()));
        assert!(t.removable_boxes().contains(&[-1, 0, 2].into()));
        assert!(t.remove_box([-1, 0, 2].into()));
        assert!(!t.is_box([0, 2, 0].into()));
        assert_eq!(t.period_box_count(), 2);
    }

    #[test]
    fn corner_height_cap() {
        let mut t = tiling(0, 0, 2, 4);
        assert!(t.add_box([0, 0, 0].into()));
        assert!(t.add_box([0, 0, 1].into()));
        assert!(!t.can_add_box([0, 0, 2].into()));
        assert!(!t.add_box([0, 0, 2].into()));

        t.generate_by_adding_only(200);
        for v in test_window().iter() {
            if t.is_box(v) {
                assert!(v[2] <= 1);
            }
        }
    }

    #[test]
    fn set_periods_resets() {
        let mut t = tiling(0, 0, 0, 11);
        t.generate_by_adding_only(30);
        t.set_periods(Periods::new(1, 2, 2)).unwrap();
        assert_eq!(t.period_box_count(), 0);
        assert_eq!(t.addable_boxes(), &set_of(&[[0, 0, 0]]));
        assert!(t.removable_boxes().is_empty());
        assert_eq!(t.periods(), Periods::new(1, 2, 2));
    }

    #[test]
    fn invalid_periods_keep_state() {
        let mut t = tiling(0, 0, 0, 11);
        t.generate_by_adding_only(30);
        assert!(t.set_periods(Periods::new(1, 1, 0)).is_err());
        assert_eq!(t.period_box_count(), 30);
        assert_eq!(t.periods(), Periods::new(0, 0, 0));
    }

    #[test]
    fn draw_distance_does_not_touch_the_stack() {
        let mut t = tiling(1, 2, 2, 12);
        t.generate_by_adding_only(30);
        let before = t.clone();
        t.set_draw_distance(DrawDistance::new(7, 8, 9)).unwrap();
        assert!(t.set_draw_distance(DrawDistance::new(0, 8, 9)).is_err());
        assert_eq!(t.draw_distance(), DrawDistance::new(7, 8, 9));
        assert_eq!(t.height_map(), before.height_map());
        assert_eq!(t.addable_boxes(), before.addable_boxes());
        assert_eq!(t.removable_boxes(), before.removable_boxes());
    }

    #[test]
    fn injected_rng_drives_choices() {
        let periods = Periods::new(0, 0, 0);
        let dd = DrawDistance::new(2, 2, 2);
        let mut a = PeriodicLozengeTiling::with_rng(periods, dd, ChaCha12Rng::seed_from_u64(8)).unwrap();
        let mut b = PeriodicLozengeTiling::with_seed(periods, dd, 8).unwrap();
        a.generate_by_adding_only(50);
        b.generate_by_adding_only(50);
        assert_eq!(a.height_map(), b.height_map());
    }
}
