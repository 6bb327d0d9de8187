//! RNS arithmetic and modulus switching for BFV/BGV-style schemes.
//!
//! [`math`] holds the word-sized leaves (moduli, prime search, multi-limb
//! helpers, sampling); [`rns`] builds bases, CRT contexts, base converters and
//! the [`RnsTool`] kernels on top of them.

pub mod math;
pub mod rns;

pub use math::{Modulus, MulOperand, generate_primes};
pub use rns::{
    BaseConverter, ErrorKind, RnsBase, RnsContext, RnsError, RnsPoly, RnsResult, RnsTool,
    RnsToolBuilder,
};
