use serde::{Deserialize, Serialize};

use crate::math::MAX_LATITUDE;

/// Geographic bounding box in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// The full Web Mercator world, trimmed to [`MAX_LATITUDE`].
    pub const WORLD: Self = Self {
        west: -180.0,
        south: -MAX_LATITUDE,
        east: 180.0,
        north: MAX_LATITUDE,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// `[west, south, east, north]`.
    pub fn to_array(self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Clamps each edge independently to `limits`.
    pub fn clamp_to(self, limits: &GeoBounds) -> GeoBounds {
        GeoBounds {
            west: self.west.max(limits.west),
            south: self.south.max(limits.south),
            east: self.east.min(limits.east),
            north: self.north.min(limits.north),
        }
    }

    /// True when any edge sits exactly on the matching edge of `limits`.
    ///
    /// Only meaningful for bounds produced by [`GeoBounds::clamp_to`] with the
    /// same limits, where reaching a limit yields the limit value bit-for-bit.
    pub fn touches(&self, limits: &GeoBounds) -> bool {
        self.west == limits.west
            || self.south == limits.south
            || self.east == limits.east
            || self.north == limits.north
    }

    pub fn is_valid(&self) -> bool {
        self.west < self.east && self.south < self.north
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::WORLD
    }
}
