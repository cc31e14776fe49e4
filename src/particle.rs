use crate::Vec2;

pub const NEIGHBOR_CAPACITY: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
    pub density: f64,
    pub pressure: f64,
    pub mass: f64,
    pub radius: f64,
    pub cell: (i32, i32),
    pub neighbors: Vec<usize>,
}

impl Particle {
    pub fn new(position: Vec2, velocity: Vec2, mass: f64) -> Self {
        Self {
            position,
            velocity,
            force: Vec2::zero(),
            density: 0.0,
            pressure: 0.0,
            mass,
            radius: 0.0,
            cell: (0, 0),
            neighbors: Vec::with_capacity(NEIGHBOR_CAPACITY),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn inverse_mass(&self) -> f64 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            1.0
        }
    }

    pub fn speed_squared(&self) -> f64 {
        self.velocity.length_squared()
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.speed_squared()
    }
}
