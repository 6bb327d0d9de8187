use rand::distr::{Distribution, Uniform};
use rand::{Rng, seq::SliceRandom};

use crate::math::Modulus;
use crate::rns::{RnsBase, RnsError, RnsPoly, RnsResult};

/// Samples `count` residues uniformly from `[0, modulus)`.
pub fn uniform_residues<R: Rng + ?Sized>(
    modulus: &Modulus,
    count: usize,
    rng: &mut R,
) -> RnsResult<Vec<u64>> {
    let distribution =
        Uniform::new(0, modulus.value()).map_err(|_| RnsError::ZeroModulus)?;
    Ok((0..count).map(|_| distribution.sample(rng)).collect())
}

/// A `(|base|, degree)` tensor with every channel uniform modulo its modulus.
///
/// The channels are independent, so the tensor is a uniform element of
/// `Z_Q^degree`.
pub fn uniform_poly<R: Rng + ?Sized>(
    base: &RnsBase,
    degree: usize,
    rng: &mut R,
) -> RnsResult<RnsPoly> {
    let mut out = RnsPoly::zero(base.size(), degree);
    for (q, channel) in base.moduli().iter().zip(out.channels_mut()) {
        let distribution = Uniform::new(0, q.value()).map_err(|_| RnsError::ZeroModulus)?;
        for coeff in channel.iter_mut() {
            *coeff = distribution.sample(rng);
        }
    }
    Ok(out)
}

/// A ternary vector with exactly `hamming_weight` entries in `{-1, 1}`,
/// written into every channel of `base` (`-1` becomes `q_i - 1`).
pub fn ternary_poly<R: Rng + ?Sized>(
    base: &RnsBase,
    degree: usize,
    hamming_weight: usize,
    rng: &mut R,
) -> RnsResult<RnsPoly> {
    if hamming_weight > degree {
        return Err(RnsError::IndexOutOfRange {
            index: hamming_weight,
            size: degree,
        });
    }
    let mut signs = vec![0i8; degree];
    let mut indices: Vec<usize> = (0..degree).collect();
    indices.shuffle(rng);
    for &idx in indices.iter().take(hamming_weight) {
        signs[idx] = if rng.random_bool(0.5) { 1 } else { -1 };
    }

    let mut out = RnsPoly::zero(base.size(), degree);
    for (q, channel) in base.moduli().iter().zip(out.channels_mut()) {
        for (coeff, &s) in channel.iter_mut().zip(&signs) {
            *coeff = match s {
                1 => 1,
                -1 => q.value() - 1,
                _ => 0,
            };
        }
    }
    Ok(out)
}
