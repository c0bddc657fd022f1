//! Named formations mapping a drone count to target positions.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

use crate::geometry::Waypoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formation {
    Line,
    Circle,
    Grid,
    VShape,
}

impl FromStr for Formation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(Formation::Line),
            "circle" => Ok(Formation::Circle),
            "grid" => Ok(Formation::Grid),
            "vshape" | "v_shape" | "v" => Ok(Formation::VShape),
            _ => Err(()),
        }
    }
}

/// Formation parameters; every field falls back to its default when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationParams {
    pub spacing: f64,
    pub radius: f64,
    pub height: f64,
}

impl Default for FormationParams {
    fn default() -> Self {
        Self {
            spacing: 0.5,
            radius: 1.0,
            height: 0.6,
        }
    }
}

/// Target positions for `count` drones in the named formation.
///
/// An unknown formation name yields no positions.
pub fn compute_positions(name: &str, count: usize, params: &FormationParams) -> Vec<Waypoint> {
    match name.parse::<Formation>() {
        Ok(formation) => formation.positions(count, params),
        Err(()) => Vec::new(),
    }
}

impl Formation {
    pub fn positions(&self, count: usize, params: &FormationParams) -> Vec<Waypoint> {
        match self {
            Formation::Line => line(count, params),
            Formation::Circle => circle(count, params),
            Formation::Grid => grid(count, params),
            Formation::VShape => vshape(count, params),
        }
    }
}

fn line(count: usize, params: &FormationParams) -> Vec<Waypoint> {
    let center = (count as f64 - 1.0) / 2.0;
    (0..count)
        .map(|i| Waypoint::new((i as f64 - center) * params.spacing, 0.0, params.height))
        .collect()
}

fn circle(count: usize, params: &FormationParams) -> Vec<Waypoint> {
    (0..count)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / count as f64;
            Waypoint::new(
                params.radius * angle.cos(),
                params.radius * angle.sin(),
                params.height,
            )
        })
        .collect()
}

fn grid(count: usize, params: &FormationParams) -> Vec<Waypoint> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    // A partial last row counts toward centering, unlike a floor division
    let rows = count.div_ceil(cols);
    let col_center = (cols as f64 - 1.0) / 2.0;
    let row_center = (rows as f64 - 1.0) / 2.0;

    (0..count)
        .map(|i| {
            let row = (i / cols) as f64;
            let col = (i % cols) as f64;
            Waypoint::new(
                (col - col_center) * params.spacing,
                (row - row_center) * params.spacing,
                params.height,
            )
        })
        .collect()
}

fn vshape(count: usize, params: &FormationParams) -> Vec<Waypoint> {
    (0..count)
        .map(|i| {
            if i == 0 {
                return Waypoint::new(0.0, 0.0, params.height);
            }
            let side = if i % 2 == 1 { 1.0 } else { -1.0 };
            let row = i.div_ceil(2) as f64;
            Waypoint::new(
                row * params.spacing,
                side * row * params.spacing * 0.5,
                params.height,
            )
        })
        .collect()
}
