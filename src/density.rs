use crate::kernel::density_at;
use crate::parallel::ParallelExecutor;
use crate::{Particle, SpatialGrid, Vec2};

pub fn find_neighbors(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    positions: &[Vec2],
    grid: &SpatialGrid,
    h: f64,
) {
    let h_sq = h * h;
    exec.for_each_mut(particles, |i, p| {
        p.neighbors.clear();
        let (cx, cy) = p.cell;
        let pi = positions[i];
        for list in grid.block(cx, cy) {
            for &j in list {
                if j == i {
                    continue;
                }
                if (positions[j] - pi).length_squared() < h_sq {
                    p.neighbors.push(j);
                }
            }
        }
    });
}

pub fn compute_densities(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    positions: &[Vec2],
    h: f64,
) {
    exec.for_each_mut(particles, |i, p| {
        let neighbors = p.neighbors.iter().map(|&j| positions[j]);
        p.density = density_at(positions[i], neighbors, h);
    });
}

pub fn compute_pressures(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    pressure_multiplier: f64,
    rest_density: f64,
) {
    exec.for_each_mut(particles, |_, p| {
        p.pressure = pressure_multiplier * (p.density - rest_density);
    });
}
