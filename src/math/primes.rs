//! Prime search for auxiliary RNS bases.
//!
//! Primality uses deterministic Miller-Rabin over `u64`: with the first twelve
//! prime bases no composite below 3.3 * 10^24 passes, which covers every
//! `u64`. Candidates for NTT-friendly moduli are visited only on the
//! arithmetic progression `p = 1 (mod 2n)`, descending from a bound.
//!
//! Reference:
//! https://en.wikipedia.org/wiki/Miller%E2%80%93Rabin_primality_test

use crate::rns::{RnsError, RnsResult};

// Deterministic for all n < 318,665,857,834,031,151,167,461.
// Source: https://miller-rabin.appspot.com/
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `(a * b) mod modulus` through a `u128` product.
///
/// Kept separate from [`crate::math::Modulus`], which is limited to 61 bits.
fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut acc = 1 % modulus;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    acc
}

/// Splits `n > 0` into `(d, r)` with `n = d * 2^r` and `d` odd.
fn split_power_of_two(n: u64) -> (u64, u32) {
    let r = n.trailing_zeros();
    (n >> r, r)
}

/// Returns `true` if `n` is prime.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n & 1 == 0 => return false,
        _ => {}
    }

    let (d, r) = split_power_of_two(n - 1);
    'bases: for &a in MILLER_RABIN_BASES.iter() {
        if a % n == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// `true` when `p` is prime and `p = 1 (mod 2n)`.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, n: u64) -> bool {
    match n.checked_mul(2) {
        Some(step) if step > 0 => p % step == 1 && is_prime(p),
        _ => false,
    }
}

/// Largest `x <= value` with `x = 1 (mod step)`, if any.
fn snap_down_to_congruence(value: u64, step: u64) -> Option<u64> {
    let delta = (value % step + step - 1) % step;
    value.checked_sub(delta)
}

/// Returns the largest prime `p < bound` with `p = 1 (mod 2n)`.
///
/// Returns `None` when no such prime exists or `2n` does not fit in `u64`.
pub fn get_first_prime_down(bound: u64, n: u64) -> Option<u64> {
    let step = n.checked_mul(2).filter(|&s| s > 1)?;
    if bound <= 2 {
        return None;
    }
    let mut candidate = snap_down_to_congruence(bound - 1, step)?;
    loop {
        if candidate <= 2 {
            return None;
        }
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(step)?;
    }
}

/// Generates the `count` largest primes of exactly `bit_count` bits that are
/// congruent to 1 modulo `2 * degree`, in descending order.
///
/// ```
/// use rns_toolkit::math::{generate_primes, is_ntt_friendly_prime};
///
/// let primes = generate_primes(61, 3, 1024).unwrap();
/// assert_eq!(primes.len(), 3);
/// assert!(primes.windows(2).all(|w| w[0] > w[1]));
/// for p in primes {
///     assert!(is_ntt_friendly_prime(p, 1024));
/// }
/// ```
pub fn generate_primes(
    bit_count: u32,
    count: usize,
    degree: usize,
) -> RnsResult<Vec<u64>> {
    let factor = (degree as u64).saturating_mul(2);
    let failure = RnsError::PrimeGeneration {
        bit_count,
        count,
        factor,
    };
    if !(2..=62).contains(&bit_count) || degree == 0 {
        return Err(failure);
    }

    let upper_bound = 1u64 << bit_count;
    let lower_bound = 1u64 << (bit_count - 1);

    let mut primes = Vec::with_capacity(count);
    let mut cursor = upper_bound;
    while primes.len() < count {
        match get_first_prime_down(cursor, degree as u64) {
            Some(prime) if prime > lower_bound => {
                primes.push(prime);
                cursor = prime;
            }
            _ => return Err(failure),
        }
    }
    Ok(primes)
}
