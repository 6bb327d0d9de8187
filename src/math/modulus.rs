//! Word-sized moduli with precomputed Barrett and Shoup constants.
//!
//! Every residue in this crate lives below a [`Modulus`] of at most
//! [`MOD_BIT_COUNT_MAX`] bits, which leaves head-room for lazy sums of a few
//! residues in a single `u64` and for 128-bit dot-product accumulation.

use crypto_bigint::{BoxedUint, Limb, NonZero};

use crate::math::primes::is_prime;
use crate::math::utils::try_mod_inverse;
use crate::rns::{RnsError, RnsResult};

/// Largest supported modulus width in bits.
pub const MOD_BIT_COUNT_MAX: u32 = 61;

/// Number of 122-bit products that fit in a `u128` accumulator before reducing.
const DOT_PRODUCT_BATCH: usize = 32;

/// A modulus `p` in `[2, 2^61)` or the unset value 0.
///
/// The Barrett ratio is `floor(2^128 / p)` split into its high and low words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modulus {
    value: u64,
    bit_count: u32,
    barrett_hi: u64,
    barrett_lo: u64,
}

impl Default for Modulus {
    fn default() -> Self {
        Self::zero()
    }
}

impl Modulus {
    /// Builds a modulus, rejecting 1 and values wider than 61 bits.
    ///
    /// Zero is accepted and yields the unset modulus (see [`Modulus::is_zero`]).
    pub fn new(value: u64) -> RnsResult<Self> {
        if value == 0 {
            return Ok(Self::zero());
        }
        if value == 1 || value >> MOD_BIT_COUNT_MAX != 0 {
            return Err(RnsError::InvalidModulus { modulus: value });
        }
        let ratio = barrett_ratio(value);
        Ok(Self {
            value,
            bit_count: u64::BITS - value.leading_zeros(),
            barrett_hi: (ratio >> 64) as u64,
            barrett_lo: ratio as u64,
        })
    }

    pub const fn zero() -> Self {
        Self {
            value: 0,
            bit_count: 0,
            barrett_hi: 0,
            barrett_lo: 0,
        }
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub const fn bit_count(&self) -> u32 {
        self.bit_count
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_prime(&self) -> bool {
        is_prime(self.value)
    }

    /// Returns the modulus when set, `ZeroModulus` otherwise.
    pub fn require_nonzero(&self) -> RnsResult<&Self> {
        if self.is_zero() {
            Err(RnsError::ZeroModulus)
        } else {
            Ok(self)
        }
    }

    /// Reduces any `u64` into `[0, p)`.
    #[inline]
    pub fn reduce(&self, a: u64) -> u64 {
        debug_assert!(!self.is_zero());
        let lo = (a as u128 * self.barrett_lo as u128) >> 64;
        let q = ((a as u128 * self.barrett_hi as u128 + lo) >> 64) as u64;
        let r = a.wrapping_sub(q.wrapping_mul(self.value));
        self.reduce_once(r)
    }

    /// Reduces any `u128` into `[0, p)`.
    #[inline]
    pub fn reduce_u128(&self, a: u128) -> u64 {
        debug_assert!(!self.is_zero());
        let a_lo = a as u64 as u128;
        let a_hi = a >> 64;
        let lo = self.barrett_lo as u128;
        let hi = self.barrett_hi as u128;

        // floor(a * ratio / 2^128), possibly short by one or two.
        let lo_lo = (a_lo * lo) >> 64;
        let (mid, c1) = (a_lo * hi).overflowing_add(a_hi * lo);
        let (mid, c2) = mid.overflowing_add(lo_lo);
        let carry = ((c1 as u128) + (c2 as u128)) << 64;
        let q = (mid >> 64) + carry + a_hi * hi;

        let r = a.wrapping_sub(q.wrapping_mul(self.value as u128)) as u64;
        self.reduce_once(self.reduce_once(r))
    }

    /// Reduces a multi-limb integer of any precision into `[0, p)`.
    pub fn reduce_uint(&self, value: &BoxedUint) -> u64 {
        let divisor: Option<NonZero<Limb>> = NonZero::new(Limb::from(self.value)).into();
        divisor.map_or(0, |p| value.rem_limb(p).0)
    }

    #[inline]
    fn reduce_once(&self, r: u64) -> u64 {
        if r >= self.value { r - self.value } else { r }
    }

    /// `a + b mod p` for reduced operands.
    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.value && b < self.value);
        self.reduce_once(a + b)
    }

    /// `a - b mod p` for reduced operands.
    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.value && b < self.value);
        if a >= b { a - b } else { a + self.value - b }
    }

    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.value);
        if a == 0 { 0 } else { self.value - a }
    }

    /// `a * b mod p` for arbitrary `u64` operands.
    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128)
    }

    /// `a * b + c mod p` for arbitrary `u64` operands.
    #[inline]
    pub fn mul_add(&self, a: u64, b: u64, c: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128 + c as u128)
    }

    /// `x * y mod p` using the Shoup quotient of `y`. `x` may be unreduced.
    #[inline]
    pub fn mul_operand(&self, x: u64, y: &MulOperand) -> u64 {
        let q = ((x as u128 * y.quotient as u128) >> 64) as u64;
        let r = y
            .operand
            .wrapping_mul(x)
            .wrapping_sub(q.wrapping_mul(self.value));
        self.reduce_once(r)
    }

    /// `x * y + z mod p`. `x` and `z` may be unreduced.
    #[inline]
    pub fn mul_add_operand(&self, x: u64, y: &MulOperand, z: u64) -> u64 {
        self.add(self.mul_operand(x, y), self.reduce(z))
    }

    /// Inverse of `a` modulo `p`, or `None` when `a` is not a unit.
    pub fn inv(&self, a: u64) -> Option<u64> {
        try_mod_inverse(a, self.value)
    }

    /// Like [`Modulus::inv`] but reports the failing pair.
    pub fn try_inv(&self, a: u64) -> RnsResult<u64> {
        self.inv(a).ok_or(RnsError::NotInvertible {
            value: a,
            modulus: self.value,
        })
    }

    /// `sum(a[i] * b[i]) mod p` for reduced operands of equal length.
    pub fn dot_product(&self, a: &[u64], b: &[u64]) -> u64 {
        debug_assert_eq!(a.len(), b.len());
        let mut acc = 0u64;
        for (ca, cb) in a.chunks(DOT_PRODUCT_BATCH).zip(b.chunks(DOT_PRODUCT_BATCH)) {
            let sum = ca
                .iter()
                .zip(cb)
                .fold(acc as u128, |s, (&x, &y)| s + x as u128 * y as u128);
            acc = self.reduce_u128(sum);
        }
        acc
    }

    /// Shoup operand for the constant `value mod p`.
    pub fn operand(&self, value: u64) -> MulOperand {
        MulOperand::new(self.reduce(value), self)
    }
}

/// `floor(2^128 / p)` for `p >= 2`.
fn barrett_ratio(p: u64) -> u128 {
    let p = p as u128;
    let ratio = u128::MAX / p;
    if u128::MAX % p == p - 1 { ratio + 1 } else { ratio }
}

/// A fixed multiplicand `w < p` with its Shoup quotient `floor(w * 2^64 / p)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MulOperand {
    operand: u64,
    quotient: u64,
}

impl MulOperand {
    pub fn new(operand: u64, modulus: &Modulus) -> Self {
        debug_assert!(operand < modulus.value());
        let quotient = (((operand as u128) << 64) / modulus.value() as u128) as u64;
        Self { operand, quotient }
    }

    #[inline]
    pub fn operand(&self) -> u64 {
        self.operand
    }

    #[inline]
    pub fn quotient(&self) -> u64 {
        self.quotient
    }
}
