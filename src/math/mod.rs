pub mod modulus;
pub mod primes;
pub mod sampling;
pub mod utils;

pub use modulus::{MOD_BIT_COUNT_MAX, Modulus, MulOperand};
pub use primes::{generate_primes, get_first_prime_down, is_ntt_friendly_prime, is_prime};
pub use sampling::{ternary_poly, uniform_poly, uniform_residues};
pub use utils::{are_coprime, gcd, try_mod_inverse};
