//! RNS bases: ordered sets of pairwise-coprime moduli with the CRT constants
//! needed to move between a big integer and its residues.

use crypto_bigint::{BoxedUint, Limb};

use crate::math::{Modulus, MulOperand, are_coprime};

use super::{RnsError, RnsPoly, RnsResult};

/// Checks that `moduli` is nonempty, nonzero, duplicate-free and pairwise coprime.
pub(crate) fn validate_moduli(moduli: &[Modulus]) -> RnsResult<()> {
    if moduli.is_empty() {
        return Err(RnsError::EmptyBase);
    }
    if moduli.iter().any(Modulus::is_zero) {
        return Err(RnsError::ZeroModulus);
    }
    for (i, a) in moduli.iter().enumerate() {
        for b in &moduli[i + 1..] {
            if a.value() == b.value() {
                return Err(RnsError::DuplicateModulus { modulus: a.value() });
            }
            if !are_coprime(a.value(), b.value()) {
                return Err(RnsError::NotCoprime {
                    first: a.value(),
                    second: b.value(),
                });
            }
        }
    }
    Ok(())
}

pub(crate) fn to_moduli(values: &[u64]) -> RnsResult<Vec<Modulus>> {
    values.iter().map(|&v| Modulus::new(v)).collect()
}

/// One limb per modulus is enough for any product of word-sized moduli.
pub(crate) fn limb_precision(size: usize) -> u32 {
    size.max(1) as u32 * Limb::BITS
}

/// Product of `moduli` at `bits_precision`.
pub(crate) fn product<'a>(
    moduli: impl IntoIterator<Item = &'a Modulus>,
    bits_precision: u32,
) -> BoxedUint {
    moduli
        .into_iter()
        .fold(BoxedUint::one_with_precision(bits_precision), |acc, q| {
            acc.wrapping_mul(&BoxedUint::from(q.value()))
        })
}

/// An RNS base `{q_0, ..., q_{k-1}}`.
///
/// Alongside the moduli it stores `Q = prod q_i` and, per modulus, the punctured
/// product `q*_i = Q / q_i` (both with `k` limbs of precision) and
/// `q~_i = q*_i^{-1} mod q_i`. Bases are immutable; [`RnsBase::extend`] and the
/// drop methods return new bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RnsBase {
    moduli: Vec<Modulus>,
    base_prod: BoxedUint,
    punctured_prod: Vec<BoxedUint>,
    inv_punctured_prod_mod_base: Vec<MulOperand>,
}

impl RnsBase {
    pub fn new(moduli: &[u64]) -> RnsResult<Self> {
        Self::from_moduli(to_moduli(moduli)?)
    }

    pub fn from_moduli(moduli: Vec<Modulus>) -> RnsResult<Self> {
        validate_moduli(&moduli)?;
        let bits = limb_precision(moduli.len());

        let base_prod = product(&moduli, bits);
        let punctured_prod: Vec<BoxedUint> = (0..moduli.len())
            .map(|i| {
                let others = moduli.iter().enumerate().filter(|&(j, _)| j != i);
                product(others.map(|(_, q)| q), bits)
            })
            .collect();
        let inv_punctured_prod_mod_base = moduli
            .iter()
            .zip(&punctured_prod)
            .map(|(q, punctured)| {
                let inv = q.try_inv(q.reduce_uint(punctured))?;
                Ok(MulOperand::new(inv, q))
            })
            .collect::<RnsResult<Vec<_>>>()?;

        Ok(Self {
            moduli,
            base_prod,
            punctured_prod,
            inv_punctured_prod_mod_base,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.moduli.len()
    }

    #[inline]
    pub fn moduli(&self) -> &[Modulus] {
        &self.moduli
    }

    pub fn values(&self) -> Vec<u64> {
        self.moduli.iter().map(Modulus::value).collect()
    }

    pub fn get(&self, index: usize) -> RnsResult<&Modulus> {
        self.moduli.get(index).ok_or(RnsError::IndexOutOfRange {
            index,
            size: self.size(),
        })
    }

    /// `Q`, with `size` limbs of precision.
    pub fn base_prod(&self) -> &BoxedUint {
        &self.base_prod
    }

    pub fn punctured_prod(&self, index: usize) -> RnsResult<&BoxedUint> {
        self.get(index)?;
        Ok(&self.punctured_prod[index])
    }

    pub fn inv_punctured_prod_mod_base(&self, index: usize) -> RnsResult<&MulOperand> {
        self.get(index)?;
        Ok(&self.inv_punctured_prod_mod_base[index])
    }

    pub(crate) fn inv_punctured_prod_mod_base_array(&self) -> &[MulOperand] {
        &self.inv_punctured_prod_mod_base
    }

    pub(crate) fn punctured_prod_array(&self) -> &[BoxedUint] {
        &self.punctured_prod
    }

    pub fn contains(&self, value: u64) -> bool {
        self.moduli.iter().any(|q| q.value() == value)
    }

    /// Order-independent containment: every modulus of `self` is in `other`.
    pub fn is_sub_base_of(&self, other: &RnsBase) -> bool {
        self.moduli.iter().all(|q| other.contains(q.value()))
    }

    pub fn is_super_base_of(&self, other: &RnsBase) -> bool {
        other.is_sub_base_of(self)
    }

    /// Appends `value`; the result must stay pairwise coprime.
    pub fn extend(&self, value: u64) -> RnsResult<Self> {
        let modulus = Modulus::new(value)?;
        let mut moduli = self.moduli.clone();
        moduli.push(modulus);
        Self::from_moduli(moduli)
    }

    pub fn extend_base(&self, other: &RnsBase) -> RnsResult<Self> {
        let mut moduli = self.moduli.clone();
        moduli.extend_from_slice(&other.moduli);
        Self::from_moduli(moduli)
    }

    /// Removes the last modulus.
    pub fn drop_last(&self) -> RnsResult<Self> {
        if self.size() == 1 {
            return Err(RnsError::CannotDropLast);
        }
        Self::from_moduli(self.moduli[..self.size() - 1].to_vec())
    }

    /// Removes `value`, keeping the order of the remaining moduli.
    pub fn drop_modulus(&self, value: u64) -> RnsResult<Self> {
        if self.size() == 1 {
            return Err(RnsError::CannotDropLast);
        }
        if !self.contains(value) {
            return Err(RnsError::ModulusNotFound { modulus: value });
        }
        let moduli = self
            .moduli
            .iter()
            .copied()
            .filter(|q| q.value() != value)
            .collect();
        Self::from_moduli(moduli)
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

    /// Residues of a `size`-limb integer, one per modulus.
    pub fn decompose(&self, value: &[u64]) -> RnsResult<Vec<u64>> {
        self.check_limbs(value.len())?;
        Ok(self.decompose_value(&BoxedUint::from_words(value.iter().copied())))
    }

    /// Residues of an integer of any precision; values above `Q` wrap.
    pub fn decompose_value(&self, value: &BoxedUint) -> Vec<u64> {
        self.moduli.iter().map(|q| q.reduce_uint(value)).collect()
    }

    /// CRT reconstruction `sum q*_i * [x_i * q~_i]_{q_i} mod Q` as `size` limbs.
    pub fn compose(&self, residues: &[u64]) -> RnsResult<Vec<u64>> {
        Ok(self.compose_value(residues)?.as_words().to_vec())
    }

    /// Like [`RnsBase::compose`], returning `x` with the precision of `Q`.
    pub fn compose_value(&self, residues: &[u64]) -> RnsResult<BoxedUint> {
        self.check_limbs(residues.len())?;
        Ok(self.compose_column(residues.iter().copied()))
    }

    fn compose_column(&self, residues: impl Iterator<Item = u64>) -> BoxedUint {
        let mut acc = BoxedUint::zero_with_precision(self.base_prod.bits_precision());
        for (i, x) in residues.enumerate() {
            let q = &self.moduli[i];
            let digit = q.mul_operand(x, &self.inv_punctured_prod_mod_base[i]);
            // q*_i * digit < Q, so the product fits the precision of Q.
            let term = self.punctured_prod[i].wrapping_mul(&BoxedUint::from(digit));
            acc = acc.add_mod(&term, &self.base_prod);
        }
        acc
    }

    /// Decomposes `count` packed `size`-limb integers into a `(size, count)`
    /// tensor: channel `i` holds every value reduced modulo `q_i`.
    pub fn decompose_array(&self, values: &[u64], count: usize) -> RnsResult<RnsPoly> {
        let size = self.size();
        if values.len() != count * size {
            return Err(RnsError::LimbCountMismatch {
                expected: count * size,
                actual: values.len(),
            });
        }
        let mut out = RnsPoly::zero(size, count);
        for (j, words) in values.chunks_exact(size).enumerate() {
            let value = BoxedUint::from_words(words.iter().copied());
            for (i, residue) in self.decompose_value(&value).into_iter().enumerate() {
                out.set_coeff(i, j, residue);
            }
        }
        Ok(out)
    }

    /// Inverse of [`RnsBase::decompose_array`]: `count * size` packed limbs.
    pub fn compose_array(&self, residues: &RnsPoly) -> RnsResult<Vec<u64>> {
        let size = self.size();
        let count = residues.degree();
        residues.check_shape(size, count)?;
        let mut out = vec![0u64; count * size];
        for (j, words) in out.chunks_exact_mut(size).enumerate() {
            let column = (0..size).map(|i| residues.coeff(i, j));
            words.copy_from_slice(self.compose_column(column).as_words());
        }
        Ok(out)
    }
}
