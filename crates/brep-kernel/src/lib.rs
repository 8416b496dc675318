//! Boundary-representation kernel: geometry, arena topology, meshing,
//! healing and the solid modelling backends used for booleans.

pub mod fillet;
pub mod geometry;
pub mod mesh;
pub mod mock_kernel;
pub mod primitives;
pub mod topology;
pub mod traits;
pub mod truck_convert;
pub mod truck_kernel;
pub mod types;

use serde::{Deserialize, Serialize};

pub use mock_kernel::MockKernel;
pub use traits::*;
pub use truck_kernel::TruckKernel;
pub use types::*;

/// Distances and angles below which geometry is considered coincident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Two points closer than this are the same point.
    pub confusion: f64,
    pub angular: f64,
    /// Gap bridged when sewing faces together.
    pub sewing: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            confusion: 1e-7,
            angular: 1e-12,
            sewing: 1e-6,
        }
    }
}
