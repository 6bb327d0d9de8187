//! Residue Number System (RNS) toolkit for BFV/BGV.
//!
//! Large integers modulo `Q = q_0 * ... * q_{k-1}` are carried as residues
//! modulo pairwise-coprime word-sized moduli. This module provides the bases,
//! the CRT reconstruction, base conversion between residue systems, and the
//! BEHZ/HPS modulus-switching kernels built on top of them.

mod base;
mod bigint;
mod builder;
mod context;
mod converter;
mod errors;
mod poly;
mod tool;

pub use base::RnsBase;
pub use builder::{
    COEFF_MOD_COUNT_MAX, DEFAULT_AUXILIARY_BIT_COUNT, DEFAULT_M_TILDE, DEFAULT_RESERVED_BITS,
    POLY_MOD_DEGREE_MAX, POLY_MOD_DEGREE_MIN, RnsToolBuilder, RnsToolParams,
};
pub use context::RnsContext;
pub use converter::BaseConverter;
pub use errors::{ErrorKind, RnsError, RnsResult};
pub use poly::RnsPoly;
pub use tool::RnsTool;
