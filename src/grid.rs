use crate::{Particle, Vec2};
use rustc_hash::FxHashMap;

pub const MIN_CELL_SIZE: f64 = 1e-3;

/// `x` in the high half, `y` as raw bits in the low half.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(i64);

impl CellKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self(((x as i64) << 32) | (y as u32 as i64))
    }

    pub const fn coords(self) -> (i32, i32) {
        ((self.0 >> 32) as i32, self.0 as i32)
    }
}

#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: FxHashMap<CellKey, Vec<usize>>,
    occupied: Vec<CellKey>,
}

pub fn normalize_cell_size(cell_size: f64) -> f64 {
    if cell_size.is_finite() && cell_size >= MIN_CELL_SIZE {
        cell_size
    } else {
        MIN_CELL_SIZE
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: normalize_cell_size(cell_size),
            cells: FxHashMap::default(),
            occupied: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn set_cell_size(&mut self, cell_size: f64) {
        self.cell_size = normalize_cell_size(cell_size);
    }

    pub fn cell_coords(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    pub fn rebuild(&mut self, particles: &mut [Particle]) {
        for list in self.cells.values_mut() {
            list.clear();
        }
        self.occupied.clear();
        for (i, particle) in particles.iter_mut().enumerate() {
            let (cx, cy) = self.cell_coords(particle.position);
            particle.cell = (cx, cy);
            let key = CellKey::new(cx, cy);
            let list = self.cells.entry(key).or_default();
            if list.is_empty() {
                self.occupied.push(key);
            }
            list.push(i);
        }
        self.cells.retain(|_, list| !list.is_empty());
    }

    pub fn cell(&self, key: CellKey) -> &[usize] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occupied(&self) -> &[CellKey] {
        &self.occupied
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn block(&self, cx: i32, cy: i32) -> impl Iterator<Item = &[usize]> + '_ {
        let cx = cx as i64;
        let cy = cy as i64;
        (-1..=1i64)
            .flat_map(move |dx| (-1..=1i64).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(move |(nx, ny)| {
                let nx = i32::try_from(nx).ok()?;
                let ny = i32::try_from(ny).ok()?;
                self.cells.get(&CellKey::new(nx, ny)).map(Vec::as_slice)
            })
    }

    pub fn neighbors_of(&self, cx: i32, cy: i32) -> Vec<usize> {
        let mut out = Vec::new();
        for list in self.block(cx, cy) {
            out.extend_from_slice(list);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn particles_at(points: &[(f64, f64)]) -> Vec<Particle> {
        points
            .iter()
            .map(|&(x, y)| Particle::new(Vec2::new(x, y), Vec2::zero(), 1.0))
            .collect()
    }

    #[test]
    fn cell_key_round_trips_signed_coordinates() {
        for (x, y) in [
            (0, 0),
            (1, -1),
            (-1, 1),
            (-7, -3),
            (i32::MAX, i32::MIN),
            (i32::MIN, i32::MAX),
        ] {
            assert_eq!(CellKey::new(x, y).coords(), (x, y));
        }
        assert_ne!(CellKey::new(-1, 0), CellKey::new(0, -1));
    }

    #[test]
    fn invalid_cell_size_is_normalized() {
        assert_eq!(SpatialGrid::new(0.0).cell_size(), MIN_CELL_SIZE);
        assert_eq!(SpatialGrid::new(-5.0).cell_size(), MIN_CELL_SIZE);
        assert_eq!(SpatialGrid::new(f64::NAN).cell_size(), MIN_CELL_SIZE);
        assert_eq!(SpatialGrid::new(2.5).cell_size(), 2.5);
    }

    #[test]
    fn rebuild_places_each_particle_once_and_caches_cell() {
        let mut particles = particles_at(&[(0.5, 0.5), (1.5, 0.5), (-0.5, -0.5), (0.7, 0.2)]);
        let mut grid = SpatialGrid::new(1.0);
        grid.rebuild(&mut particles);
        assert_eq!(grid.cell(CellKey::new(0, 0)), &[0, 3]);
        assert_eq!(grid.cell(CellKey::new(1, 0)), &[1]);
        assert_eq!(grid.cell(CellKey::new(-1, -1)), &[2]);
        assert_eq!(particles[2].cell, (-1, -1));
        let total: usize = grid.occupied().iter().map(|&k| grid.cell(k).len()).sum();
        assert_eq!(total, particles.len());
        assert_eq!(
            grid.occupied(),
            &[CellKey::new(0, 0), CellKey::new(1, 0), CellKey::new(-1, -1)]
        );
    }

    #[test]
    fn rebuild_drops_stale_cells() {
        let mut particles = particles_at(&[(0.5, 0.5), (5.5, 5.5)]);
        let mut grid = SpatialGrid::new(1.0);
        grid.rebuild(&mut particles);
        assert_eq!(grid.cell_count(), 2);
        particles[1].position = Vec2::new(0.2, 0.9);
        grid.rebuild(&mut particles);
        assert_eq!(grid.cell_count(), 1);
        assert!(grid.cell(CellKey::new(5, 5)).is_empty());
        assert_eq!(grid.cell(CellKey::new(0, 0)), &[0, 1]);
    }

    #[test]
    fn neighbors_cover_three_by_three_block() {
        let mut particles = particles_at(&[
            (0.5, 0.5),
            (-0.5, -0.5),
            (1.5, 1.5),
            (2.5, 0.5),
            (0.5, -1.5),
        ]);
        let mut grid = SpatialGrid::new(1.0);
        grid.rebuild(&mut particles);
        let mut found = grid.neighbors_of(0, 0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
        assert!(grid.neighbors_of(100, 100).is_empty());
    }

    #[test]
    fn neighbor_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(17);
        for &h in &[1.0, 2.5, 7.0] {
            let points: Vec<(f64, f64)> = (0..400)
                .map(|_| (rng.random_range(-20.0..40.0), rng.random_range(-20.0..40.0)))
                .collect();
            let mut particles = particles_at(&points);
            let mut grid = SpatialGrid::new(h);
            grid.rebuild(&mut particles);
            for i in 0..particles.len() {
                let pi = particles[i].position;
                let (cx, cy) = particles[i].cell;
                let mut from_grid: Vec<usize> = grid
                    .neighbors_of(cx, cy)
                    .into_iter()
                    .filter(|&j| (particles[j].position - pi).length_squared() < h * h)
                    .collect();
                from_grid.sort_unstable();
                let brute: Vec<usize> = (0..particles.len())
                    .filter(|&j| (particles[j].position - pi).length_squared() < h * h)
                    .collect();
                assert_eq!(from_grid, brute, "particle {i} with h={h}");
            }
        }
    }
}
