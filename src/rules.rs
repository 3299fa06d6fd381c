//! Weight and rule table generation, plus a CPU mirror of the update rule.
//!
//! A cell's next state is decided by summing the weights of its neighbors'
//! states and looking the (floored, normalized) sum up in a procedurally
//! generated rule table. The GPU compute shader consumes these tables; the
//! CPU functions at the bottom implement the identical rule for tests.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::RULE_CAPACITY;
use crate::error::RuleError;

/// Neighborhood shape: square radius or Manhattan-distance-bounded diamond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborShape {
    Moore,
    VonNeumann,
}

impl NeighborShape {
    pub fn toggled(self) -> Self {
        match self {
            NeighborShape::Moore => NeighborShape::VonNeumann,
            NeighborShape::VonNeumann => NeighborShape::Moore,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NeighborShape::Moore => "Moore",
            NeighborShape::VonNeumann => "von Neumann",
        }
    }

    /// Whether the offset (dx, dy) is part of a radius-`range` neighborhood
    /// of this shape. The origin is never a neighbor of itself.
    pub fn contains(self, dx: i32, dy: i32, range: i32) -> bool {
        if dx == 0 && dy == 0 {
            return false;
        }
        match self {
            NeighborShape::Moore => true,
            NeighborShape::VonNeumann => dx.abs() + dy.abs() <= range,
        }
    }
}

/// How the per-state weights are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightStrategy {
    /// 0, max, 0, max, ...
    Alternating,
    /// Successive values maximally distant from all previous ones:
    /// 0, 1, 1/2, 1/4, 3/4, 1/8, ...
    MaxSpread,
    /// The symmetric pattern [0, .5, 1, .5, 0] tiled across states.
    Ramp,
    /// Independent uniform values.
    Random,
}

const ALL_STRATEGIES: [WeightStrategy; 4] = [
    WeightStrategy::Alternating,
    WeightStrategy::MaxSpread,
    WeightStrategy::Ramp,
    WeightStrategy::Random,
];

impl WeightStrategy {
    /// Advance (+1) or retreat (-1) through the strategy list, wrapping.
    pub fn cycled(self, direction: i32) -> Self {
        let idx = ALL_STRATEGIES.iter().position(|s| *s == self).unwrap_or(0) as i32;
        let next = (idx + direction).rem_euclid(ALL_STRATEGIES.len() as i32);
        ALL_STRATEGIES[next as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightStrategy::Alternating => "alternating",
            WeightStrategy::MaxSpread => "max-spread",
            WeightStrategy::Ramp => "ramp",
            WeightStrategy::Random => "random",
        }
    }
}

/// Generate `n_states` weights in [0, max_weight] with the given strategy.
///
/// Recomputing weights invalidates any rule table generated from the old
/// ones; callers regenerate the table before the next update pass.
pub fn generate_weights<R: Rng>(
    strategy: WeightStrategy,
    n_states: usize,
    max_weight: f32,
    rng: &mut R,
) -> Vec<f32> {
    match strategy {
        WeightStrategy::Alternating => (0..n_states)
            .map(|i| if i % 2 == 0 { 0.0 } else { max_weight })
            .collect(),
        WeightStrategy::MaxSpread => max_spread_fractions(n_states)
            .into_iter()
            .map(|f| f * max_weight)
            .collect(),
        WeightStrategy::Ramp => {
            const RAMP: [f32; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];
            (0..n_states).map(|i| RAMP[i % RAMP.len()] * max_weight).collect()
        }
        WeightStrategy::Random => (0..n_states).map(|_| rng.gen_range(0.0..=max_weight)).collect(),
    }
}

/// The maximally-spread sequence in [0, 1]: each value is the midpoint of
/// the widest gap between all previously chosen values.
fn max_spread_fractions(n: usize) -> Vec<f32> {
    let mut out: Vec<f32> = Vec::with_capacity(n);
    for i in 0..n {
        let next = match i {
            0 => 0.0,
            1 => 1.0,
            _ => {
                let mut sorted = out.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).expect("weights are finite"));
                let (mut best_mid, mut best_gap) = (0.5, 0.0);
                for pair in sorted.windows(2) {
                    let gap = pair[1] - pair[0];
                    if gap > best_gap {
                        best_gap = gap;
                        best_mid = pair[0] + gap / 2.0;
                    }
                }
                best_mid
            }
        };
        out.push(next);
    }
    out
}

/// The generated transition table.
///
/// `entries[floor(sum) - min_sum]` is 0 for "no change" or `s + 1` for
/// "transition to state s".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    pub entries: Vec<u32>,
    /// Lowest reachable floored neighbor-weight sum.
    pub min_sum: i32,
    pub neighbor_count: u32,
}

impl RuleTable {
    /// Build a fresh table from the current weights and neighborhood.
    ///
    /// The neighbor-count bound uses the Moore formula for both shapes; von
    /// Neumann evaluation skips corner offsets without shrinking the bound,
    /// so the diamond never reaches the top of the sum range. The index
    /// clamp at lookup time keeps that safe.
    pub fn generate<R: Rng>(
        weights: &[f32],
        n_states: usize,
        range: i32,
        inertia: f32,
        rng: &mut R,
    ) -> Result<Self, RuleError> {
        let weights = &weights[..n_states.min(weights.len())];
        let side = 2 * range + 1;
        let neighbor_count = (side * side - 1) as u32;

        let min_weight = weights.iter().copied().fold(f32::INFINITY, f32::min);
        let max_weight = weights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min_sum = (min_weight * neighbor_count as f32).floor() as i32;
        let max_sum = (max_weight * neighbor_count as f32).floor() as i32;
        let required = (max_sum - min_sum + 1) as usize;
        if required > RULE_CAPACITY {
            return Err(RuleError::Capacity {
                required,
                capacity: RULE_CAPACITY,
            });
        }

        let mut entries: Vec<u32> = Vec::with_capacity(required);
        for i in 0..required {
            // Identity anchors for indices that coincide with a state index.
            // The shuffle below randomizes their positions away again; the
            // anchors survive only as a bias in the entry population.
            let entry = if i < n_states && inertia < 1.0 {
                i as u32 + 1
            } else if rng.gen::<f32>() < inertia {
                0
            } else {
                rng.gen_range(0..=n_states as u32)
            };
            entries.push(entry);
        }
        entries.shuffle(rng);

        Ok(Self {
            entries,
            min_sum,
            neighbor_count,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clamped lookup: floored sums that land outside the table (float
    /// rounding, or a stale table after a rejected regeneration) hit the
    /// nearest edge entry instead of faulting.
    pub fn next_state(&self, current: u8, sum: f32) -> u8 {
        let idx = (sum.floor() as i32 - self.min_sum).clamp(0, self.len() as i32 - 1);
        match self.entries[idx as usize] {
            0 => current,
            e => (e - 1) as u8,
        }
    }
}

// --- CPU mirror of the update shader, used by the property tests ---

fn wrapped(coord: i32, size: i32) -> usize {
    (((coord % size) + size) % size) as usize
}

/// Sum the weights of all neighbor states around (x, y), wrapping
/// toroidally on both axes.
pub fn neighbor_weight_sum(
    grid: &[u8],
    width: usize,
    height: usize,
    x: i32,
    y: i32,
    weights: &[f32],
    range: i32,
    shape: NeighborShape,
) -> f32 {
    let mut sum = 0.0;
    for dy in -range..=range {
        for dx in -range..=range {
            if !shape.contains(dx, dy, range) {
                continue;
            }
            let nx = wrapped(x + dx, width as i32);
            let ny = wrapped(y + dy, height as i32);
            sum += weights[grid[ny * width + nx] as usize];
        }
    }
    sum
}

/// Advance every cell of `src` one generation into `dst`.
pub fn step_grid(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    weights: &[f32],
    table: &RuleTable,
    range: i32,
    shape: NeighborShape,
) {
    assert!(src.len() >= width * height);
    assert!(dst.len() >= width * height);
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let sum =
                neighbor_weight_sum(src, width, height, x as i32, y as i32, weights, range, shape);
            dst[idx] = table.next_state(src[idx], sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn weights_stay_in_bounds_for_every_strategy() {
        let mut rng = thread_rng();
        for strategy in ALL_STRATEGIES {
            for n in [1, 2, 5, 24, 128] {
                let w = generate_weights(strategy, n, 3.0, &mut rng);
                assert_eq!(w.len(), n);
                assert!(
                    w.iter().all(|v| (0.0..=3.0).contains(v)),
                    "{:?} produced out-of-range weight",
                    strategy
                );
            }
        }
    }

    #[test]
    fn max_spread_opens_with_the_extremes() {
        let w = generate_weights(WeightStrategy::MaxSpread, 5, 1.0, &mut thread_rng());
        assert_eq!(w[0], 0.0);
        assert_eq!(w[1], 1.0);
        assert!((w[2] - 0.5).abs() < 1e-6);
        // Fourth and fifth split the remaining quarters.
        assert!((w[3] - 0.25).abs() < 1e-6 || (w[3] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn strategy_cycling_wraps_both_ways() {
        let s = WeightStrategy::Alternating;
        assert_eq!(s.cycled(-1), WeightStrategy::Random);
        assert_eq!(s.cycled(1), WeightStrategy::MaxSpread);
        let mut t = s;
        for _ in 0..ALL_STRATEGIES.len() {
            t = t.cycled(1);
        }
        assert_eq!(t, s);
    }

    #[test]
    fn table_length_matches_the_sum_range() {
        let mut rng = thread_rng();
        let weights = generate_weights(WeightStrategy::MaxSpread, 8, 1.0, &mut rng);
        let table = RuleTable::generate(&weights, 8, 2, 0.5, &mut rng).unwrap();
        // R=2 -> 24 neighbors; weights span [0, 1] -> sums span [0, 24].
        assert_eq!(table.neighbor_count, 24);
        assert_eq!(table.min_sum, 0);
        assert_eq!(table.len(), 25);
    }

    #[test]
    fn every_entry_is_a_valid_instruction() {
        let mut rng = thread_rng();
        let n = 16;
        let weights = generate_weights(WeightStrategy::Random, n, 1.0, &mut rng);
        let table = RuleTable::generate(&weights, n, 3, 0.3, &mut rng).unwrap();
        assert!(table.entries.iter().all(|&e| e <= n as u32));
    }

    #[test]
    fn oversized_table_is_a_recoverable_error() {
        let mut rng = thread_rng();
        let weights = generate_weights(WeightStrategy::Alternating, 4, 100.0, &mut rng);
        // 100 * 440 neighbors at R=10 is far past capacity.
        let err = RuleTable::generate(&weights, 4, 10, 0.5, &mut rng).unwrap_err();
        match err {
            RuleError::Capacity { required, capacity } => {
                assert!(required > capacity);
                assert_eq!(capacity, RULE_CAPACITY);
            }
        }
    }

    #[test]
    fn full_inertia_freezes_everything() {
        let mut rng = thread_rng();
        let weights = generate_weights(WeightStrategy::MaxSpread, 6, 1.0, &mut rng);
        let table = RuleTable::generate(&weights, 6, 1, 1.0, &mut rng).unwrap();
        assert!(table.entries.iter().all(|&e| e == 0));

        let src: Vec<u8> = vec![0, 1, 2, 3, 4, 5, 0, 1, 2];
        let mut dst = vec![0u8; 9];
        step_grid(&src, &mut dst, 3, 3, &weights, &table, 1, NeighborShape::Moore);
        assert_eq!(src, dst);
    }

    #[test]
    fn corner_neighbors_wrap_toroidally() {
        // 4x4 grid, one state-1 cell at (3,3); weight of state 1 is 1.0.
        // Cell (0,0) with R=1 must see it via the (-1,-1) offset.
        let weights = [0.0, 1.0];
        let mut grid = vec![0u8; 16];
        grid[3 * 4 + 3] = 1;
        let sum = neighbor_weight_sum(&grid, 4, 4, 0, 0, &weights, 1, NeighborShape::Moore);
        assert_eq!(sum, 1.0);
        // The diamond excludes the corner offset.
        let sum = neighbor_weight_sum(&grid, 4, 4, 0, 0, &weights, 1, NeighborShape::VonNeumann);
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn von_neumann_counts_edge_neighbors() {
        let weights = [0.0, 1.0];
        let mut grid = vec![0u8; 16];
        grid[3 * 4] = 1; // (0, 3), directly above (0,0) across the seam
        let sum = neighbor_weight_sum(&grid, 4, 4, 0, 0, &weights, 1, NeighborShape::VonNeumann);
        assert_eq!(sum, 1.0);
    }

    /// Classic Life expressed as a rule table: with weights [0, 1] and R=1
    /// the sum is the live-neighbor count; index 3 births, index 2 holds,
    /// everything else dies.
    fn life_table() -> RuleTable {
        RuleTable {
            entries: vec![1, 1, 0, 2, 1, 1, 1, 1, 1],
            min_sum: 0,
            neighbor_count: 8,
        }
    }

    #[test]
    fn crowded_center_cell_dies() {
        let weights = [0.0, 1.0];
        // 3x3 torus, live center with five live neighbors: sum = 5 -> death.
        let src: Vec<u8> = vec![
            1, 1, 1, //
            1, 1, 1, //
            0, 0, 0,
        ];
        let mut dst = vec![0u8; 9];
        step_grid(&src, &mut dst, 3, 3, &weights, &life_table(), 1, NeighborShape::Moore);
        assert_eq!(dst[4], 0);
    }

    #[test]
    fn lonely_cell_with_three_neighbors_is_born() {
        let weights = [0.0, 1.0];
        // Dead cell at (2,2) with exactly three live neighbors above it.
        let mut src = vec![0u8; 25];
        src[5 + 1] = 1;
        src[5 + 2] = 1;
        src[5 + 3] = 1;
        let mut dst = vec![0u8; 25];
        step_grid(&src, &mut dst, 5, 5, &weights, &life_table(), 1, NeighborShape::Moore);
        assert_eq!(dst[2 * 5 + 2], 1);
    }

    #[test]
    fn stepping_is_deterministic_for_a_fixed_table() {
        let mut rng = thread_rng();
        let n = 8u8;
        let weights = generate_weights(WeightStrategy::MaxSpread, n as usize, 1.0, &mut rng);
        let table = RuleTable::generate(&weights, n as usize, 1, 0.4, &mut rng).unwrap();
        let src: Vec<u8> = (0..64u8).map(|i| i % n).collect();
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        step_grid(&src, &mut a, 8, 8, &weights, &table, 1, NeighborShape::Moore);
        step_grid(&src, &mut b, 8, 8, &weights, &table, 1, NeighborShape::Moore);
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_sums_clamp_instead_of_panicking() {
        let table = life_table();
        // Sums far outside the table's domain hit the edge entries.
        assert_eq!(table.next_state(1, -100.0), 0);
        assert_eq!(table.next_state(1, 1e6), 0);
    }
}
