use rand::Rng;

/// Draw a point uniformly from the `n`-simplex: sort `n - 1` uniforms in
/// `[0, 1)` and take the gaps between consecutive values, bracketed by 0 and 1.
pub fn partition_one<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    fill_partition(rng, &mut out);
    out
}

/// Fill `out` with a uniform random simplex vector.
pub fn fill_partition<R: Rng + ?Sized>(rng: &mut R, out: &mut [f64]) {
    match out.len() {
        0 => {}
        1 => out[0] = 1.0,
        n => {
            let mut cuts: Vec<f64> = (0..n - 1).map(|_| rng.random::<f64>()).collect();
            cuts.sort_by(f64::total_cmp);

            let mut prev = 0.0;
            for (slot, &cut) in out.iter_mut().zip(&cuts) {
                *slot = cut - prev;
                prev = cut;
            }
            out[n - 1] = 1.0 - prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_partition_sums_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..10 {
            let p = partition_one(&mut rng, n);
            assert_eq!(p.len(), n);
            assert!(p.iter().all(|&x| x >= 0.0));
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert!(partition_one(&mut rng, 0).is_empty());
    }

    #[test]
    fn test_partition_is_deterministic_under_seed() {
        let a = partition_one(&mut StdRng::seed_from_u64(42), 5);
        let b = partition_one(&mut StdRng::seed_from_u64(42), 5);
        assert_eq!(a, b);
    }
}
