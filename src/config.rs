//! Simulation configuration.
//!
//! All tunable parameters live in [`SimConfig`], owned by the frame driver
//! and passed by reference into table generation and GPU uploads. Keyboard
//! commands mutate it between ticks only.

use crate::rules::{NeighborShape, WeightStrategy};

/// Upper bound on distinct cell states; also the capacity of the GPU-side
/// weight and color buffers.
pub const MAX_STATES: usize = 128;

/// Largest selectable neighbor radius.
pub const MAX_RANGE: i32 = 10;

/// Fixed capacity of the rule table. A configuration whose table would not
/// fit is rejected with `RuleError::Capacity` and the previous table stays
/// in use.
pub const RULE_CAPACITY: usize = 4096;

/// Smallest allowed resolution multiplier; doubling from here reaches the
/// 2.0 ceiling exactly.
pub const MIN_RESOLUTION_SCALE: f32 = 0.125;
pub const MAX_RESOLUTION_SCALE: f32 = 2.0;

const INERTIA_STEP: f32 = 0.05;

/// One stacked update pass: the sampling step applied to the read coordinate
/// and a fractional texture-space offset of the sampling origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDesc {
    pub step: f32,
    pub offset: [f32; 2],
}

impl PassDesc {
    pub const fn full() -> Self {
        Self {
            step: 1.0,
            offset: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of distinct cell states, at most [`MAX_STATES`].
    pub n_states: usize,
    /// Upper bound of the per-state weight range.
    pub max_weight: f32,
    /// Neighborhood radius.
    pub range: i32,
    pub shape: NeighborShape,
    pub strategy: WeightStrategy,
    /// Probability that a generated rule entry is "no change".
    pub inertia: f32,
    /// Index into the static palette list.
    pub palette: usize,
    /// Grid resolution as a fraction of the surface resolution, in
    /// (0, [`MAX_RESOLUTION_SCALE`]].
    pub resolution_scale: f32,
    /// Update passes run per tick, in order.
    pub passes: Vec<PassDesc>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_states: 24,
            max_weight: 1.0,
            range: 1,
            shape: NeighborShape::Moore,
            strategy: WeightStrategy::MaxSpread,
            inertia: 0.85,
            palette: 0,
            resolution_scale: 1.0,
            passes: vec![PassDesc::full()],
        }
    }
}

impl SimConfig {
    pub fn step_range(&mut self, delta: i32) {
        self.range = (self.range + delta).clamp(1, MAX_RANGE);
    }

    pub fn step_inertia(&mut self, direction: i32) {
        self.inertia = (self.inertia + direction as f32 * INERTIA_STEP).clamp(0.0, 1.0);
    }

    /// Halve or double the resolution multiplier, staying in range.
    pub fn step_resolution(&mut self, direction: i32) {
        let next = if direction > 0 {
            self.resolution_scale * 2.0
        } else {
            self.resolution_scale / 2.0
        };
        self.resolution_scale = next.clamp(MIN_RESOLUTION_SCALE, MAX_RESOLUTION_SCALE);
    }

    /// Grid dimensions for a given surface size, never zero.
    pub fn grid_size(&self, surface_width: u32, surface_height: u32) -> (u32, u32) {
        let w = (surface_width as f32 * self.resolution_scale).floor().max(1.0) as u32;
        let h = (surface_height as f32 * self.resolution_scale).floor().max(1.0) as u32;
        (w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_bounds() {
        let cfg = SimConfig::default();
        assert!(cfg.n_states <= MAX_STATES);
        assert!(cfg.range >= 1 && cfg.range <= MAX_RANGE);
        assert!((0.0..=1.0).contains(&cfg.inertia));
        assert!(cfg.resolution_scale > 0.0 && cfg.resolution_scale <= MAX_RESOLUTION_SCALE);
        assert!(!cfg.passes.is_empty());
    }

    #[test]
    fn range_clamps_at_both_ends() {
        let mut cfg = SimConfig::default();
        for _ in 0..100 {
            cfg.step_range(1);
        }
        assert_eq!(cfg.range, MAX_RANGE);
        for _ in 0..100 {
            cfg.step_range(-1);
        }
        assert_eq!(cfg.range, 1);
    }

    #[test]
    fn resolution_never_leaves_its_interval() {
        let mut cfg = SimConfig::default();
        for _ in 0..10 {
            cfg.step_resolution(1);
        }
        assert_eq!(cfg.resolution_scale, MAX_RESOLUTION_SCALE);
        for _ in 0..10 {
            cfg.step_resolution(-1);
        }
        assert_eq!(cfg.resolution_scale, MIN_RESOLUTION_SCALE);
    }

    #[test]
    fn grid_size_is_never_zero() {
        let mut cfg = SimConfig::default();
        cfg.resolution_scale = MIN_RESOLUTION_SCALE;
        assert_eq!(cfg.grid_size(1, 1), (1, 1));
    }

    #[test]
    fn inertia_stays_normalized() {
        let mut cfg = SimConfig::default();
        for _ in 0..100 {
            cfg.step_inertia(1);
        }
        assert_eq!(cfg.inertia, 1.0);
        for _ in 0..100 {
            cfg.step_inertia(-1);
        }
        assert_eq!(cfg.inertia, 0.0);
    }
}
