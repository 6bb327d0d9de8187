/// Returns `(g, x, y)` with `a * x + b * y = g = gcd(a, b)`.
pub fn extended_gcd(a: i128, b: i128) -> (i128, i128, i128) {
    if a == 0 {
        (b, 0, 1)
    } else {
        let (g, x, y) = extended_gcd(b % a, a);
        (g, y - (b / a) * x, x)
    }
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[inline]
pub fn are_coprime(a: u64, b: u64) -> bool {
    gcd(a, b) == 1
}

/// Inverse of `a` modulo `m`, or `None` when `gcd(a, m) != 1`.
///
/// Works for any modulus `m >= 2`, prime or not.
pub fn try_mod_inverse(a: u64, m: u64) -> Option<u64> {
    if m < 2 {
        return None;
    }
    let a = a % m;
    if a == 0 {
        return None;
    }
    let (g, x, _) = extended_gcd(a as i128, m as i128);
    if g != 1 {
        return None;
    }
    let m = m as i128;
    Some(x.rem_euclid(m) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd_matches_known_values() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(0, 9), 9);
        assert!(are_coprime(15, 1153));
        assert!(!are_coprime(2, 30));
    }

    #[test]
    fn test_extended_gcd_produces_bezout_coefficients() {
        let (g, x, y) = extended_gcd(240, 46);
        assert_eq!(g, 2);
        assert_eq!(240 * x + 46 * y, 2);
    }

    #[test]
    fn test_inverse_exists_only_for_units() {
        assert_eq!(try_mod_inverse(3, 7), Some(5));
        assert_eq!(try_mod_inverse(10, 7), Some(5));
        assert_eq!(try_mod_inverse(2, 4), None);
        assert_eq!(try_mod_inverse(0, 7), None);
        assert_eq!(try_mod_inverse(5, 1), None);
    }

    #[test]
    fn test_inverse_modulo_power_of_two() {
        let m = 1u64 << 32;
        let inv = try_mod_inverse(3, m).unwrap();
        assert_eq!((3u128 * inv as u128) % m as u128, 1);
        let big = (1u64 << 61) - 1;
        let inv = try_mod_inverse(big - 2, big).unwrap();
        assert_eq!(((big - 2) as u128 * inv as u128) % big as u128, 1);
    }
}
