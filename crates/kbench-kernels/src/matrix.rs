//! Dense square matrices of `f64`.
//!
//! Storage is one contiguous row-major buffer, so row blocks can be handed to
//! different workers as disjoint slices.

use core::ops::{Index, IndexMut};

use crate::error::KernelError;

/// n×n matrix in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    dim: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Zero-filled n×n matrix.
    pub fn zeros(dim: usize) -> Result<Self, KernelError> {
        Self::filled(dim, 0.0)
    }

    /// n×n matrix with every cell set to `value`.
    pub fn filled(dim: usize, value: f64) -> Result<Self, KernelError> {
        let elements = cell_count(dim)?;
        let mut data = Vec::new();
        data.try_reserve_exact(elements)
            .map_err(|_| KernelError::AllocationFailure { elements })?;
        data.resize(elements, value);
        Ok(Matrix { dim, data })
    }

    /// Matrix whose cell (i, j) is `f(i, j)`.
    pub fn from_fn(dim: usize, mut f: impl FnMut(usize, usize) -> f64) -> Result<Self, KernelError> {
        let mut m = Self::zeros(dim)?;
        for i in 0..dim {
            for j in 0..dim {
                m.data[i * dim + j] = f(i, j);
            }
        }
        Ok(m)
    }

    /// Wraps an existing row-major buffer of exactly `dim * dim` values.
    pub fn from_vec(dim: usize, data: Vec<f64>) -> Result<Self, KernelError> {
        let elements = cell_count(dim)?;
        if data.len() != elements {
            return Err(KernelError::InvalidArgument(format!(
                "{}x{} matrix needs {} values, got {}",
                dim,
                dim,
                elements,
                data.len()
            )));
        }
        Ok(Matrix { dim, data })
    }

    /// Deterministic pseudo-random values in `[0, 1)`.
    pub fn random(dim: usize, seed: u32) -> Result<Self, KernelError> {
        let mut s = seed;
        Self::from_fn(dim, |_, _| {
            // Simple LCG for deterministic values
            s = s.wrapping_mul(1103515245).wrapping_add(12345);
            f64::from((s >> 16) & 0x7fff) / 32768.0
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.dim && j < self.dim {
            Some(self.data[i * self.dim + j])
        } else {
            None
        }
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Largest per-cell relative difference `|a - b| / max(|a|, |b|, 1)`.
    pub fn max_relative_diff(&self, other: &Matrix) -> Result<f64, KernelError> {
        ensure_same_dim(self, other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| (a - b).abs() / a.abs().max(b.abs()).max(1.0))
            .fold(0.0, f64::max))
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of bounds");
        &self.data[i * self.dim + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of bounds");
        &mut self.data[i * self.dim + j]
    }
}

fn cell_count(dim: usize) -> Result<usize, KernelError> {
    dim.checked_mul(dim)
        .ok_or(KernelError::AllocationFailure { elements: usize::MAX })
}

pub(crate) fn ensure_same_dim(a: &Matrix, b: &Matrix) -> Result<(), KernelError> {
    if a.dim != b.dim {
        return Err(KernelError::InvalidArgument(format!(
            "dimension mismatch: {}x{} vs {}x{}",
            a.dim, a.dim, b.dim, b.dim
        )));
    }
    Ok(())
}
