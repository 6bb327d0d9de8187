use thiserror::Error;

/// Coarse classification of [`RnsError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed moduli, degree or configuration; raised at construction.
    InvalidArgument,
    /// An index past the end of a base.
    IndexOutOfRange,
    /// An operation that is not defined for the current object.
    IllegalState,
    /// A caller buffer of the wrong shape.
    Precondition,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RnsError {
    #[error("RNS base must contain at least one modulus")]
    EmptyBase,
    #[error("modulus must be nonzero")]
    ZeroModulus,
    #[error("modulus {modulus} is outside the supported range [2, 2^61)")]
    InvalidModulus { modulus: u64 },
    #[error("moduli {first} and {second} are not coprime")]
    NotCoprime { first: u64, second: u64 },
    #[error("modulus {modulus} appears more than once")]
    DuplicateModulus { modulus: u64 },
    #[error("base does not contain modulus {modulus}")]
    ModulusNotFound { modulus: u64 },
    #[error("polynomial degree must be a power of two in [2, 131072], got {degree}")]
    InvalidDegree { degree: usize },
    #[error("coefficient base size must be in [1, 64], got {size}")]
    InvalidBaseSize { size: usize },
    #[error("auxiliary prime bit count must be in [2, 61], got {bit_count}")]
    InvalidAuxiliaryBitCount { bit_count: u32 },
    #[error("m_tilde {m_tilde} must be nonzero and narrower than the auxiliary primes")]
    InvalidMTilde { m_tilde: u64 },
    #[error("{value} is not invertible modulo {modulus}")]
    NotInvertible { value: u64, modulus: u64 },
    #[error("unable to find {count} primes of {bit_count} bits congruent to 1 mod {factor}")]
    PrimeGeneration {
        bit_count: u32,
        count: usize,
        factor: u64,
    },
    #[error("index {index} out of range for base of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("cannot drop from base of size 1")]
    CannotDropLast,
    #[error("output base must have size {expected}, got {actual}")]
    OutputBaseSize { expected: usize, actual: usize },
    #[error("operation requires a nonzero plain modulus")]
    MissingPlainModulus,
    #[error("shape mismatch: expected {expected:?} (channels, degree), got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("limb count mismatch: expected {expected}, got {actual}")]
    LimbCountMismatch { expected: usize, actual: usize },
    #[error("value needs {needed} limbs but only {available} are available")]
    LimbOverflow { needed: usize, available: usize },
}

impl RnsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::CannotDropLast
            | Self::OutputBaseSize { .. }
            | Self::MissingPlainModulus => ErrorKind::IllegalState,
            Self::ShapeMismatch { .. }
            | Self::LimbCountMismatch { .. }
            | Self::LimbOverflow { .. } => ErrorKind::Precondition,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

pub type RnsResult<T> = Result<T, RnsError>;
