use crate::boundary::{BoundaryConfig, Domain};
use crate::density::{compute_densities, compute_pressures, find_neighbors};
use crate::forces::{
    apply_attraction, apply_drag, apply_gravity, apply_neighbor_forces, AtomicForces, ForceParams,
};
use crate::grid::{normalize_cell_size, SpatialGrid};
use crate::impulse;
use crate::integrate::{integrate, predict_positions};
use crate::kernel::{gradient_at, laplacian_at};
use crate::parallel::{ParallelConfig, ParallelExecutor};
use crate::params::SimParameters;
use crate::stats::{pressure_stats, PressureStats, StatsScratch};
use crate::{Particle, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitialCondition {
    #[default]
    RandomStill,
    RandomMotion,
}

impl InitialCondition {
    fn velocity_range(self) -> f64 {
        match self {
            InitialCondition::RandomStill => 0.1,
            InitialCondition::RandomMotion => 1.0,
        }
    }
}

#[derive(Debug, Default)]
struct Scratch {
    positions: Vec<Vec2>,
    neighbor_forces: Vec<Vec2>,
    pair_forces: AtomicForces,
    stats: StatsScratch,
}

impl Scratch {
    fn for_particles(particles: &[Particle]) -> Self {
        let len = particles.len();
        let mut pair_forces = AtomicForces::default();
        pair_forces.resize(len);
        Self {
            positions: particles.iter().map(|p| p.position).collect(),
            neighbor_forces: vec![Vec2::zero(); len],
            pair_forces,
            stats: StatsScratch::default(),
        }
    }
}

#[derive(Debug)]
pub struct FluidSim {
    pub interaction_radius: f64,
    pub smoothing_factor: f64,
    pub dampening_factor: f64,
    pub drag_enabled: bool,
    pub attraction_factor: f64,
    pub rest_density: f64,
    pub viscosity: f64,
    pub boundary: BoundaryConfig,

    particles: Vec<Particle>,
    grid: SpatialGrid,
    domain: Domain,
    executor: ParallelExecutor,
    scratch: Scratch,
    params: SimParameters,
    condition: InitialCondition,
    seed: u64,
    step_count: u64,
}

impl FluidSim {
    pub fn initialize(particle_count: usize, domain: Domain, params: SimParameters, seed: u64) -> Self {
        Self::with_condition(
            particle_count,
            domain,
            params,
            seed,
            InitialCondition::RandomStill,
        )
    }

    pub fn with_condition(
        particle_count: usize,
        domain: Domain,
        params: SimParameters,
        seed: u64,
        condition: InitialCondition,
    ) -> Self {
        let params = params.normalized();
        let domain = domain.normalized();
        let mut rng = StdRng::seed_from_u64(seed);
        let spread = condition.velocity_range();

        let mut particles = Vec::with_capacity(particle_count);
        for _ in 0..particle_count {
            let position = Vec2::new(
                rng.random::<f64>() * domain.width,
                rng.random::<f64>() * domain.height,
            );
            let velocity = Vec2::new(
                rng.random_range(-spread..spread),
                rng.random_range(-spread..spread),
            );
            let radius = 2.0 * (0.8 + 0.4 * rng.random::<f64>());
            particles.push(
                Particle::new(position, velocity, PI * radius * radius)
                    .with_radius(radius)
                    .with_density(params.rest_density),
            );
        }

        let mut grid = SpatialGrid::new(params.interaction_radius);
        grid.rebuild(&mut particles);
        let executor = ParallelExecutor::new(params.parallel);
        let scratch = Scratch::for_particles(&particles);

        log::debug!(
            "initialized {particle_count} particles in {}x{} (seed {seed}, {:?}, {} workers)",
            domain.width,
            domain.height,
            condition,
            executor.workers()
        );

        Self {
            interaction_radius: params.interaction_radius,
            smoothing_factor: params.smoothing_factor,
            dampening_factor: params.dampening_factor,
            drag_enabled: params.drag_enabled,
            attraction_factor: params.attraction_factor,
            rest_density: params.rest_density,
            viscosity: params.viscosity,
            boundary: params.boundary(),
            particles,
            grid,
            domain,
            executor,
            scratch,
            params,
            condition,
            seed,
            step_count: 0,
        }
    }

    /// Live edits to the public fields are discarded.
    pub fn reset(&mut self) {
        let count = self.particles.len();
        *self = Self::with_condition(count, self.domain, self.params, self.seed, self.condition);
    }

    pub fn set_parallel_config(&mut self, config: ParallelConfig) {
        self.executor = ParallelExecutor::new(config);
        self.params.parallel = self.executor.config();
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn parameters(&self) -> &SimParameters {
        &self.params
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn step(&mut self, gravity: f64, pressure_multiplier: f64, dt: f64) -> PressureStats {
        let dt = if dt.is_finite() { dt } else { 0.0 };
        let h = normalize_cell_size(self.interaction_radius);
        let force_params = ForceParams {
            h,
            smoothing_factor: self.smoothing_factor,
            pressure_multiplier,
            viscosity: self.viscosity,
            attraction_factor: self.attraction_factor,
        };
        let exec = &self.executor;
        let particles = &mut self.particles;
        let scratch = &mut self.scratch;

        exec.for_each_mut(particles, |_, p| p.force = Vec2::zero());
        predict_positions(exec, particles, dt);

        self.grid.set_cell_size(h);
        self.grid.rebuild(particles);

        scratch.positions.resize(particles.len(), Vec2::zero());
        {
            let shared: &[Particle] = particles;
            exec.fill(&mut scratch.positions, |i| shared[i].position);
        }
        find_neighbors(exec, particles, &scratch.positions, &self.grid, h);
        compute_densities(exec, particles, &scratch.positions, h);
        compute_pressures(exec, particles, pressure_multiplier, self.rest_density);

        apply_gravity(exec, particles, gravity);
        apply_neighbor_forces(exec, particles, &mut scratch.neighbor_forces, &force_params);
        apply_attraction(
            exec,
            particles,
            &self.grid,
            &mut scratch.pair_forces,
            &force_params,
        );
        if self.drag_enabled {
            apply_drag(exec, particles, self.dampening_factor, dt);
        }

        integrate(exec, particles, dt, self.domain, self.boundary, self.step_count);
        self.step_count += 1;

        let stats = pressure_stats(exec, particles, &mut scratch.stats);
        log::trace!(
            "step {}: {} cells, pressure mean {:.3} std {:.3}",
            self.step_count,
            self.grid.cell_count(),
            stats.mean,
            stats.std
        );
        stats
    }

    pub fn density_gradient(&self, index: usize) -> Option<Vec2> {
        let p = self.particles.get(index)?;
        let neighbors = p.neighbors.iter().map(|&j| self.particles[j].position);
        Some(gradient_at(
            p.position,
            neighbors,
            normalize_cell_size(self.interaction_radius),
            self.smoothing_factor,
        ))
    }

    pub fn kernel_laplacian(&self, index: usize) -> Option<f64> {
        let p = self.particles.get(index)?;
        let neighbors = p.neighbors.iter().map(|&j| self.particles[j].position);
        Some(laplacian_at(
            p.position,
            neighbors,
            normalize_cell_size(self.interaction_radius),
            self.smoothing_factor,
        ))
    }

    pub fn apply_impulse(&mut self, point: Vec2, strength: f64, radius: f64) -> usize {
        let slack = self
            .particles
            .iter()
            .zip(&self.scratch.positions)
            .map(|(p, &rebuilt)| (p.position - rebuilt).length())
            .fold(0.0, f64::max);
        impulse::apply_impulse(&mut self.particles, &self.grid, point, strength, radius, slack)
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    pub fn momentum(&self) -> Vec2 {
        self.particles
            .iter()
            .fold(Vec2::zero(), |sum, p| sum + p.velocity * p.mass)
    }
}
