use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper bound for every period component. Keeps the staircase and
/// normalization products well inside `i32` for any stack that fits in memory.
pub const MAX_PERIOD: i32 = 1 << 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("period shifts must be non-negative, got x_shift={x_shift}, y_shift={y_shift}")]
    NegativeShift { x_shift: i32, y_shift: i32 },
    #[error("z_height must be non-negative, and at least 1 with period shifts, got {0}")]
    MissingPeriodHeight(i32),
    #[error("periods must not exceed {}, got {:?}", MAX_PERIOD, .0)]
    PeriodTooLarge(Periods),
    #[error("draw distance must be at least 1 on every axis, got {0:?}")]
    NonPositiveDrawDistance(DrawDistance),
    #[error("draw distance {0:?} overflows the lattice window")]
    DrawDistanceTooLarge(DrawDistance),
    #[error("q must lie in [0, 1], got {0}")]
    InvalidQ(f64),
}

/// Periodicity lattice: `(x, y, z) ~ (x - x_shift, y - y_shift, z + z_height)`.
///
/// `x_shift == y_shift == 0` is the plain corner. There `z_height > 0` caps
/// every column at `z_height` boxes instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periods {
    pub x_shift: i32,
    pub y_shift: i32,
    pub z_height: i32,
}

impl Periods {
    pub const fn new(x_shift: i32, y_shift: i32, z_height: i32) -> Self {
        Self {
            x_shift,
            y_shift,
            z_height,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.x_shift != 0 || self.y_shift != 0
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.x_shift < 0 || self.y_shift < 0 {
            return Err(ConfigError::NegativeShift {
                x_shift: self.x_shift,
                y_shift: self.y_shift,
            });
        }
        // also rejects a negative height cap
        if (self.is_periodic() && self.z_height < 1) || self.z_height < 0 {
            return Err(ConfigError::MissingPeriodHeight(self.z_height));
        }
        if self.x_shift > MAX_PERIOD || self.y_shift > MAX_PERIOD || self.z_height > MAX_PERIOD {
            return Err(ConfigError::PeriodTooLarge(*self));
        }
        Ok(())
    }
}

impl Default for Periods {
    fn default() -> Self {
        Self::new(1, 2, 3)
    }
}

/// Export window radius. Counted in periods on periodic axes, in cells
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawDistance {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl DrawDistance {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.x < 1 || self.y < 1 || self.z < 1 {
            return Err(ConfigError::NonPositiveDrawDistance(*self));
        }
        Ok(())
    }
}

impl Default for DrawDistance {
    fn default() -> Self {
        Self::new(10, 10, 10)
    }
}

pub fn validate_q(q: f64) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&q) {
        Ok(())
    } else {
        Err(ConfigError::InvalidQ(q))
    }
}

/// Settings of a generation run, as read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    pub periods: Periods,
    pub draw_distance: DrawDistance,
    pub iterations: usize,
    pub q: f64,
    pub seed: Option<u64>,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            periods: Periods::default(),
            draw_distance: DrawDistance::default(),
            iterations: 10000,
            q: 0.9,
            seed: None,
        }
    }
}

impl TilingConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.periods.validate()?;
        self.draw_distance.validate()?;
        crate::VoxelWindow::from_draw_distance(self.periods, self.draw_distance)?;
        validate_q(self.q)
    }
}
