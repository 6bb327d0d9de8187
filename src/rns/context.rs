//! Garner-coefficient CRT context.

use crypto_bigint::BoxedUint;

use crate::math::{Modulus, MulOperand};

use super::base::{limb_precision, product, to_moduli, validate_moduli};
use super::{RnsError, RnsResult};

/// A list of pairwise-coprime moduli with Garner coefficients
/// `g_i = q*_i * q~_i`, so that `g_i = 1 (mod q_i)` and `g_i = 0 (mod q_j)`.
///
/// Lighter than [`super::RnsBase`] in intent: it only lifts and projects and
/// is meant for parameter-setup checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RnsContext {
    moduli: Vec<Modulus>,
    base_prod: BoxedUint,
    q_star: Vec<BoxedUint>,
    q_tilde: Vec<MulOperand>,
    garner: Vec<BoxedUint>,
    // prod_{k < i} q_k and its inverse modulo q_i, for mixed-radix lifting.
    radix_prod: Vec<BoxedUint>,
    radix_inv: Vec<MulOperand>,
}

impl RnsContext {
    pub fn new(moduli: &[u64]) -> RnsResult<Self> {
        let moduli = to_moduli(moduli)?;
        validate_moduli(&moduli)?;
        let size = moduli.len();
        let bits = limb_precision(size);

        let base_prod = product(&moduli, bits);
        let mut q_star = Vec::with_capacity(size);
        let mut q_tilde = Vec::with_capacity(size);
        let mut garner = Vec::with_capacity(size);
        let mut radix_prod = Vec::with_capacity(size);
        let mut radix_inv = Vec::with_capacity(size);

        for (i, q) in moduli.iter().enumerate() {
            let others = moduli.iter().enumerate().filter(|&(j, _)| j != i);
            let star = product(others.map(|(_, m)| m), bits);
            let tilde = q.try_inv(q.reduce_uint(&star))?;
            let g = star.wrapping_mul(&BoxedUint::from(tilde));

            let prefix = product(&moduli[..i], bits);
            let prefix_inv = q.try_inv(q.reduce_uint(&prefix))?;

            q_star.push(star);
            q_tilde.push(MulOperand::new(tilde, q));
            garner.push(g);
            radix_prod.push(prefix);
            radix_inv.push(MulOperand::new(prefix_inv, q));
        }

        Ok(Self {
            moduli,
            base_prod,
            q_star,
            q_tilde,
            garner,
            radix_prod,
            radix_inv,
        })
    }

    pub fn size(&self) -> usize {
        self.moduli.len()
    }

    pub fn moduli(&self) -> &[Modulus] {
        &self.moduli
    }

    pub fn base_prod(&self) -> &BoxedUint {
        &self.base_prod
    }

    pub fn get_garner(&self, index: usize) -> RnsResult<&BoxedUint> {
        self.garner.get(index).ok_or(RnsError::IndexOutOfRange {
            index,
            size: self.size(),
        })
    }

    fn check_limbs(&self, actual: usize) -> RnsResult<()> {
        if actual != self.size() {
            return Err(RnsError::LimbCountMismatch {
                expected: self.size(),
                actual,
            });
        }
        Ok(())
    }

    pub fn decompose(&self, value: &[u64]) -> RnsResult<Vec<u64>> {
        self.check_limbs(value.len())?;
        let value = BoxedUint::from_words(value.iter().copied());
        Ok(self.moduli.iter().map(|q| q.reduce_uint(&value)).collect())
    }

    /// `sum g_i * x_i mod Q`, with each term evaluated as `q*_i * [x_i * q~_i]_{q_i}`.
    pub fn compose(&self, residues: &[u64]) -> RnsResult<Vec<u64>> {
        self.check_limbs(residues.len())?;
        let mut acc = BoxedUint::zero_with_precision(self.base_prod.bits_precision());
        for (i, &x) in residues.iter().enumerate() {
            let digit = self.moduli[i].mul_operand(x, &self.q_tilde[i]);
            let term = self.q_star[i].wrapping_mul(&BoxedUint::from(digit));
            acc = acc.add_mod(&term, &self.base_prod);
        }
        Ok(acc.as_words().to_vec())
    }

    /// Incremental Garner lifting: after step `i` the partial result is the
    /// unique value below `q_0 * ... * q_i` matching the first `i + 1` residues.
    pub fn compose_mixed_radix(&self, residues: &[u64]) -> RnsResult<Vec<u64>> {
        self.check_limbs(residues.len())?;
        let mut acc = BoxedUint::zero_with_precision(self.base_prod.bits_precision());
        for (i, &x) in residues.iter().enumerate() {
            let q = &self.moduli[i];
            let delta = q.sub(q.reduce(x), q.reduce_uint(&acc));
            let digit = q.mul_operand(delta, &self.radix_inv[i]);
            acc = acc.wrapping_add(&self.radix_prod[i].wrapping_mul(&BoxedUint::from(digit)));
        }
        Ok(acc.as_words().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_bigint::NonZero;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_constructor_validates_moduli() {
        assert!(RnsContext::new(&[2]).is_ok());
        assert!(RnsContext::new(&[2, 3]).is_ok());
        assert!(RnsContext::new(&[4, 15, 1153]).is_ok());

        assert_eq!(RnsContext::new(&[]), Err(RnsError::EmptyBase));
        assert_eq!(
            RnsContext::new(&[2, 4]),
            Err(RnsError::NotCoprime {
                first: 2,
                second: 4
            })
        );
        assert!(RnsContext::new(&[2, 3, 5, 30]).is_err());
        assert_eq!(RnsContext::new(&[5, 0]), Err(RnsError::ZeroModulus));
    }

    #[test]
    fn test_garner_coefficients_are_crt_idempotents() {
        let ctx = RnsContext::new(&[4, 15, 1153]).unwrap();
        for i in 0..3 {
            let g = ctx.get_garner(i).unwrap();
            for (j, q) in ctx.moduli().iter().enumerate() {
                assert_eq!(q.reduce_uint(g), u64::from(i == j));
            }
        }
        assert_eq!(
            ctx.get_garner(3),
            Err(RnsError::IndexOutOfRange { index: 3, size: 3 })
        );
    }

    #[test]
    fn test_base_product() {
        let words = |moduli: &[u64]| RnsContext::new(moduli).unwrap().base_prod().as_words().to_vec();
        assert_eq!(words(&[2]), vec![2]);
        assert_eq!(words(&[2, 5]), vec![10, 0]);
        assert_eq!(words(&[4, 15, 1153]), vec![4 * 15 * 1153, 0, 0]);
    }

    #[test]
    fn test_project_lift_small() {
        let ctx = RnsContext::new(&[4, 15, 1153]).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for _ in 0..100 {
            let v = rng.random_range(0..4 * 15 * 1153u64);
            let value = [v, 0, 0];
            let residues = ctx.decompose(&value).unwrap();
            assert_eq!(residues, vec![v % 4, v % 15, v % 1153]);
            assert_eq!(ctx.compose(&residues).unwrap(), value);
            assert_eq!(ctx.compose_mixed_radix(&residues).unwrap(), value);
        }
    }

    #[test]
    fn test_garner_sum_reconstructs_wide_values() {
        let moduli = crate::math::generate_primes(61, 3, 16).unwrap();
        let ctx = RnsContext::new(&moduli).unwrap();
        let q = ctx.base_prod();
        let residues: Vec<u64> = moduli.iter().map(|&m| m / 3).collect();

        // x = sum g_i * x_i mod Q, accumulated with full-width products.
        let mut acc = BoxedUint::zero_with_precision(q.bits_precision());
        for (i, &x) in residues.iter().enumerate() {
            let g = ctx.get_garner(i).unwrap();
            assert_eq!(g.bits_precision(), q.bits_precision());
            let wide = g.mul(&BoxedUint::from(x));
            let q_wide = NonZero::new(q.widen(wide.bits_precision())).unwrap();
            let term = wide.rem(&q_wide).shorten(q.bits_precision());
            acc = acc.add_mod(&term, q);
        }
        assert_eq!(ctx.compose(&residues).unwrap(), acc.as_words());
    }

    #[test]
    fn test_both_lifts_agree_on_wide_moduli() {
        let moduli = crate::math::generate_primes(61, 3, 16).unwrap();
        let ctx = RnsContext::new(&moduli).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        for _ in 0..100 {
            let residues: Vec<u64> = moduli.iter().map(|&q| rng.random_range(0..q)).collect();
            let direct = ctx.compose(&residues).unwrap();
            assert_eq!(direct, ctx.compose_mixed_radix(&residues).unwrap());
            assert_eq!(ctx.decompose(&direct).unwrap(), residues);
        }
    }
}
