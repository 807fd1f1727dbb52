//! Uniform voxel grid over an axis-aligned box

use glam::DVec3;

/// Dense 3-D grid with cubic voxels
#[derive(Debug, Clone)]
pub struct VoxelGrid<T: Clone + Default> {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub spacing: f64,
    pub origin: DVec3,
    data: Vec<T>,
}

impl<T: Clone + Default> VoxelGrid<T> {
    /// Grid covering `[min, max]` with voxels of edge `spacing`
    pub fn covering(min: DVec3, max: DVec3, spacing: f64) -> Self {
        let extent = max - min;
        let count = |len: f64| ((len / spacing).ceil() as usize).max(1);
        Self::new(count(extent.x), count(extent.y), count(extent.z), spacing, min)
    }

    pub fn new(nx: usize, ny: usize, nz: usize, spacing: f64, origin: DVec3) -> Self {
        Self {
            nx,
            ny,
            nz,
            spacing,
            origin,
            data: vec![T::default(); nx * ny * nz],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.ny + y) * self.nx + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        if x < self.nx && y < self.ny && z < self.nz {
            Some(&self.data[self.index(x, y, z)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut T> {
        if x < self.nx && y < self.ny && z < self.nz {
            let idx = self.index(x, y, z);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    /// Convert world position to voxel coordinates, clamped to the grid
    #[inline]
    pub fn world_to_cell(&self, pos: DVec3) -> (usize, usize, usize) {
        let rel = (pos - self.origin) / self.spacing;
        let clamp = |v: f64, n: usize| (v.floor() as i64).clamp(0, n as i64 - 1) as usize;
        (clamp(rel.x, self.nx), clamp(rel.y, self.ny), clamp(rel.z, self.nz))
    }

    /// Sample grid at world position
    pub fn sample(&self, pos: DVec3) -> &T {
        let (x, y, z) = self.world_to_cell(pos);
        &self.data[self.index(x, y, z)]
    }

    /// Voxel centre in world coordinates
    pub fn cell_center(&self, x: usize, y: usize, z: usize) -> DVec3 {
        self.origin
            + DVec3::new(x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5) * self.spacing
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_rounds_up() {
        let grid: VoxelGrid<f64> =
            VoxelGrid::covering(DVec3::ZERO, DVec3::new(10.0, 8.0, 3.0), 4.0);
        assert_eq!((grid.nx, grid.ny, grid.nz), (3, 2, 1));
        assert_eq!(grid.len(), 6);
    }

    #[test]
    fn test_world_to_cell_clamps() {
        let grid: VoxelGrid<f64> = VoxelGrid::new(4, 4, 4, 1.0, DVec3::ZERO);
        assert_eq!(grid.world_to_cell(DVec3::new(-5.0, 2.5, 100.0)), (0, 2, 3));
    }

    #[test]
    fn test_cell_center_round_trip() {
        let grid: VoxelGrid<f64> = VoxelGrid::new(5, 5, 5, 2.0, DVec3::splat(-5.0));
        let c = grid.cell_center(1, 2, 3);
        assert_eq!(grid.world_to_cell(c), (1, 2, 3));
    }
}
