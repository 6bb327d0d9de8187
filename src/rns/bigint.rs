//! Conversions between [`RnsBase`] residues and fixed-width `crypto_bigint::Uint` values.

use crypto_bigint::{BoxedUint, Limb, Uint};

use super::{RnsBase, RnsError, RnsResult};

impl RnsBase {
    /// Residues of `value` modulo each `q_i`; values above `Q` wrap.
    pub fn decompose_uint<const LIMBS: usize>(&self, value: &Uint<LIMBS>) -> Vec<u64> {
        self.decompose_value(&BoxedUint::from(value))
    }

    /// CRT reconstruction into a fixed-width integer, failing when the
    /// reconstructed value does not fit in `LIMBS` words.
    pub fn compose_uint<const LIMBS: usize>(&self, residues: &[u64]) -> RnsResult<Uint<LIMBS>> {
        let value = self.compose_value(residues)?;
        let needed = value.bits().div_ceil(Limb::BITS) as usize;
        if needed > LIMBS {
            return Err(RnsError::LimbOverflow {
                needed,
                available: LIMBS,
            });
        }
        let mut words = [0; LIMBS];
        for (word, &limb) in words.iter_mut().zip(value.as_words()) {
            *word = limb;
        }
        Ok(Uint::from_words(words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_bigint::{NonZero, U128, U256};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_small_values_round_trip() {
        let base = RnsBase::new(&[3, 5, 7]).unwrap();
        let residues = base.decompose_uint(&U128::from_u64(52));
        assert_eq!(residues, vec![1, 2, 3]);
        assert_eq!(base.compose_uint::<2>(&residues).unwrap(), U128::from_u64(52));
    }

    #[test]
    fn test_wide_values_match_bigint_remainder() {
        let moduli = crate::math::generate_primes(61, 4, 8).unwrap();
        let base = RnsBase::new(&moduli).unwrap();
        let q = U256::from_words(base.base_prod().as_words().try_into().unwrap());
        let q = NonZero::new(q).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        for _ in 0..50 {
            let words: [u64; 4] = std::array::from_fn(|_| rng.random::<u64>());
            let value = U256::from_words(words).rem(&q);
            let residues = base.decompose_uint(&value);
            for (r, &m) in residues.iter().zip(&moduli) {
                let expected = value.rem(&NonZero::new(U256::from_u64(m)).unwrap());
                assert_eq!(*r, expected.as_words()[0]);
            }
            assert_eq!(base.compose_uint::<4>(&residues).unwrap(), value);
        }
    }

    #[test]
    fn test_compose_reports_overflow() {
        let moduli = crate::math::generate_primes(61, 3, 8).unwrap();
        let base = RnsBase::new(&moduli).unwrap();
        let residues: Vec<u64> = moduli.iter().map(|q| q - 1).collect();
        assert_eq!(
            base.compose_uint::<2>(&residues),
            Err(RnsError::LimbOverflow {
                needed: 3,
                available: 2
            })
        );
        assert!(base.compose_uint::<3>(&residues).is_ok());
    }
}
