use runtime::{Runtime, ThreadBudget};

use crate::error::KernelError;

/// `x[i] = alpha * x[i] + y[i]` for every i, with `x` split into contiguous
/// blocks among `budget` workers.
pub fn daxpy(
    rt: &Runtime,
    alpha: f64,
    x: &mut [f64],
    y: &[f64],
    budget: ThreadBudget,
) -> Result<(), KernelError> {
    if x.len() != y.len() {
        return Err(KernelError::InvalidArgument(format!(
            "daxpy length mismatch: x has {}, y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Ok(());
    }
    rt.map_chunks_mut(x, 1, budget, |range, block| {
        for (xi, yi) in block.iter_mut().zip(&y[range]) {
            *xi = alpha * *xi + yi;
        }
    })?;
    Ok(())
}

/// Vector of `len` copies of `value`, reporting allocation failure instead of
/// aborting.
pub fn vector(len: usize, value: f64) -> Result<Vec<f64>, KernelError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| KernelError::AllocationFailure { elements: len })?;
    v.resize(len, value);
    Ok(v)
}

pub fn daxpy_seq(alpha: f64, x: &mut [f64], y: &[f64]) -> Result<(), KernelError> {
    if x.len() != y.len() {
        return Err(KernelError::InvalidArgument(format!(
            "daxpy length mismatch: x has {}, y has {}",
            x.len(),
            y.len()
        )));
    }
    for (xi, yi) in x.iter_mut().zip(y) {
        *xi = alpha * *xi + yi;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::RuntimeConfig;

    #[test]
    fn test_daxpy_matches_sequential() {
        let rt = Runtime::new(RuntimeConfig::with_threads(4)).unwrap();
        let y: Vec<f64> = (0..1001).map(|i| i as f64).collect();
        let mut x = vec![1.0; 1001];
        let mut expected = x.clone();
        daxpy(&rt, 2.5, &mut x, &y, ThreadBudget::new(4).unwrap()).unwrap();
        daxpy_seq(2.5, &mut expected, &y).unwrap();
        assert_eq!(x, expected);
        assert_eq!(x[10], 12.5);
    }

    #[test]
    fn test_empty_vectors() {
        let rt = Runtime::new(RuntimeConfig::with_threads(3)).unwrap();
        let mut x = vector(0, 1.0).unwrap();
        daxpy(&rt, 2.5, &mut x, &[], ThreadBudget::new(3).unwrap()).unwrap();
        assert!(x.is_empty());
    }

    #[test]
    fn test_huge_vector_is_allocation_failure() {
        assert!(matches!(
            vector(usize::MAX, 0.0),
            Err(KernelError::AllocationFailure { .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let rt = Runtime::new(RuntimeConfig::with_threads(2)).unwrap();
        let mut x = vec![0.0; 3];
        let err = daxpy(&rt, 1.0, &mut x, &[1.0; 4], ThreadBudget::ONE);
        assert!(matches!(err, Err(KernelError::InvalidArgument(_))));
    }
}
