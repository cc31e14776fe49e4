use crate::grid::{CellKey, SpatialGrid};
use crate::kernel::{kernel_derivative, smoothed_distance, KERNEL_EPSILON};
use crate::parallel::{AtomicF64, ParallelExecutor};
use crate::{Particle, Vec2};
use rustc_hash::FxHashMap;

pub const ATTRACTION_THRESHOLD: f64 = 1e-6;
pub const DRAG_MIN_SPEED_SQ: f64 = 1e-6;
const DRAG_FRAME_RATE: f64 = 60.0;
const REPULSION_SCALE: f64 = 0.1;
const REPULSION_EXPONENT: f64 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub h: f64,
    pub smoothing_factor: f64,
    pub pressure_multiplier: f64,
    pub viscosity: f64,
    pub attraction_factor: f64,
}

pub fn pressure_force(pi: &Particle, pj: &Particle, params: &ForceParams) -> Vec2 {
    let delta = pj.position - pi.position;
    let dist_sq = delta.length_squared();
    if dist_sq < KERNEL_EPSILON || dist_sq >= params.h * params.h {
        return Vec2::zero();
    }
    let smoothed = smoothed_distance(dist_sq.sqrt(), params.h, params.smoothing_factor);
    let direction = delta * (1.0 / smoothed);
    let shared_pressure = 0.5 * (pi.pressure + pj.pressure);
    let magnitude =
        shared_pressure * kernel_derivative(smoothed, params.h) * params.pressure_multiplier;
    direction * magnitude
}

pub fn viscosity_force(pi: &Particle, pj: &Particle, params: &ForceParams) -> Vec2 {
    let dist_sq = (pj.position - pi.position).length_squared();
    if dist_sq < KERNEL_EPSILON || dist_sq >= params.h * params.h {
        return Vec2::zero();
    }
    let smoothed = smoothed_distance(dist_sq.sqrt(), params.h, params.smoothing_factor);
    (pj.velocity - pi.velocity) * (kernel_derivative(smoothed, params.h) * params.viscosity)
}

pub fn repulsion_force(pi: &Particle, pj: &Particle, params: &ForceParams) -> Vec2 {
    let excess = pj.density - pi.density;
    if excess <= 0.0 {
        return Vec2::zero();
    }
    let delta = pi.position - pj.position;
    let dist_sq = delta.length_squared();
    if dist_sq < KERNEL_EPSILON || dist_sq >= params.h * params.h {
        return Vec2::zero();
    }
    let dist = dist_sq.sqrt();
    let strength = excess.powf(REPULSION_EXPONENT) * REPULSION_SCALE * params.pressure_multiplier;
    delta * (strength / dist)
}

pub fn accumulate(target: &mut Vec2, delta: Vec2) {
    let next = *target + delta;
    if next.is_finite() {
        *target = next;
    }
}

pub fn neighbor_force(particles: &[Particle], i: usize, params: &ForceParams) -> Vec2 {
    let pi = &particles[i];
    let mut total = Vec2::zero();
    for &j in &pi.neighbors {
        let pj = &particles[j];
        let contribution = pressure_force(pi, pj, params)
            + viscosity_force(pi, pj, params)
            + repulsion_force(pi, pj, params);
        accumulate(&mut total, contribution);
    }
    total
}

pub fn apply_neighbor_forces(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    scratch: &mut Vec<Vec2>,
    params: &ForceParams,
) {
    scratch.resize(particles.len(), Vec2::zero());
    {
        let shared: &[Particle] = particles;
        exec.fill(scratch, |i| neighbor_force(shared, i, params));
    }
    let scratch: &[Vec2] = scratch;
    exec.for_each_mut(particles, |i, p| accumulate(&mut p.force, scratch[i]));
}

pub fn apply_gravity(exec: &ParallelExecutor, particles: &mut [Particle], gravity: f64) {
    if gravity == 0.0 {
        return;
    }
    exec.for_each_mut(particles, |_, p| {
        accumulate(&mut p.force, Vec2::new(0.0, gravity * p.mass))
    });
}

#[derive(Debug, Default)]
pub struct AtomicForces {
    x: Vec<AtomicF64>,
    y: Vec<AtomicF64>,
}

impl AtomicForces {
    pub fn resize(&mut self, len: usize) {
        self.x.resize_with(len, AtomicF64::default);
        self.y.resize_with(len, AtomicF64::default);
    }

    pub fn add(&self, index: usize, force: Vec2) {
        self.x[index].fetch_add(force.x);
        self.y[index].fetch_add(force.y);
    }

    pub fn take(&self, index: usize) -> Vec2 {
        Vec2::new(self.x[index].take(), self.y[index].take())
    }
}

/// Pairs are owned by the cell of their lower index, so each is visited once.
pub fn cell_attraction(
    particles: &[Particle],
    grid: &SpatialGrid,
    key: CellKey,
    params: &ForceParams,
) -> FxHashMap<usize, Vec2> {
    let mut local: FxHashMap<usize, Vec2> = FxHashMap::default();
    let (cx, cy) = key.coords();
    let h_sq = params.h * params.h;
    let cell = grid.cell(key);
    for list in grid.block(cx, cy) {
        for &a in cell {
            let pa = &particles[a];
            for &b in list {
                if a >= b {
                    continue;
                }
                let pb = &particles[b];
                let delta = pb.position - pa.position;
                let dist_sq = delta.length_squared();
                if dist_sq < KERNEL_EPSILON || dist_sq >= h_sq {
                    continue;
                }
                let dist = dist_sq.sqrt();
                let smoothed = smoothed_distance(dist, params.h, params.smoothing_factor);
                let magnitude =
                    params.attraction_factor * pa.mass * pb.mass / (smoothed * smoothed);
                let force = delta * (magnitude / dist);
                if !force.is_finite() {
                    continue;
                }
                *local.entry(a).or_default() += force;
                *local.entry(b).or_default() -= force;
            }
        }
    }
    local
}

pub fn apply_attraction(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    grid: &SpatialGrid,
    accumulator: &mut AtomicForces,
    params: &ForceParams,
) {
    if params.attraction_factor.abs() < ATTRACTION_THRESHOLD {
        return;
    }
    accumulator.resize(particles.len());
    let keys = grid.occupied();
    let partials = {
        let shared: &[Particle] = particles;
        exec.map_range(0..keys.len(), |t| cell_attraction(shared, grid, keys[t], params))
    };
    let n = particles.len();
    for partial in &partials {
        for (&index, &force) in partial {
            if index < n {
                accumulator.add(index, force);
            }
        }
    }
    let accumulator: &AtomicForces = accumulator;
    exec.for_each_mut(particles, |i, p| accumulate(&mut p.force, accumulator.take(i)));
}

pub fn apply_drag(exec: &ParallelExecutor, particles: &mut [Particle], dampening: f64, dt: f64) {
    let factor = 1.0 - dampening * dt * DRAG_FRAME_RATE;
    exec.for_each_mut(particles, |_, p| {
        if p.speed_squared() >= DRAG_MIN_SPEED_SQ {
            p.velocity = p.velocity * factor;
        }
    });
}
