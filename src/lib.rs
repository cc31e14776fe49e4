mod boundary;
mod density;
mod forces;
mod grid;
mod impulse;
mod integrate;
pub mod kernel;
mod parallel;
mod params;
mod particle;
mod sim;
mod stats;
mod vec2;

pub use boundary::{
    BoundaryConfig, BoundaryKind, Domain, ParseBoundaryKindError, BOUNDARY_EPSILON,
    DEFAULT_WALL_RESTITUTION,
};
pub use forces::ForceParams;
pub use grid::{normalize_cell_size, CellKey, SpatialGrid, MIN_CELL_SIZE};
pub use parallel::{AtomicF64, ParallelConfig, ParallelExecutor, DEFAULT_MIN_BATCH_SIZE};
pub use params::{ConfigError, SimParameters};
pub use particle::{Particle, NEIGHBOR_CAPACITY};
pub use sim::{FluidSim, InitialCondition};
pub use stats::PressureStats;
pub use vec2::Vec2;
