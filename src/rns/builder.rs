use super::{RnsBase, RnsError, RnsResult, RnsTool};
use crate::math::MOD_BIT_COUNT_MAX;

pub const POLY_MOD_DEGREE_MIN: usize = 2;
pub const POLY_MOD_DEGREE_MAX: usize = 131_072;
pub const COEFF_MOD_COUNT_MAX: usize = 64;

pub const DEFAULT_AUXILIARY_BIT_COUNT: u32 = 61;
pub const DEFAULT_M_TILDE: u64 = 1 << 32;
pub const DEFAULT_RESERVED_BITS: u32 = 32;

/// Validated inputs for [`RnsTool`] construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RnsToolParams {
    pub degree: usize,
    pub base_q: RnsBase,
    pub plain_modulus: u64,
    pub auxiliary_bit_count: u32,
    pub m_tilde: u64,
    pub reserved_bits: u32,
}

pub struct RnsToolBuilder {
    degree: usize,
    base_q: RnsBase,
    plain_modulus: Option<u64>,
    auxiliary_bit_count: Option<u32>,
    m_tilde: Option<u64>,
    reserved_bits: Option<u32>,
}

impl RnsToolBuilder {
    pub fn new(degree: usize, base_q: RnsBase) -> Self {
        Self {
            degree,
            base_q,
            plain_modulus: None,
            auxiliary_bit_count: None,
            m_tilde: None,
            reserved_bits: None,
        }
    }

    /// Plaintext modulus `t`; 0 leaves the decryption kernels disabled.
    pub fn plain_modulus(mut self, t: u64) -> Self {
        self.plain_modulus = Some(t);
        self
    }

    /// Width of the sampled `m_sk`, `gamma` and `B` primes.
    pub fn auxiliary_bit_count(mut self, bits: u32) -> Self {
        self.auxiliary_bit_count = Some(bits);
        self
    }

    pub fn m_tilde(mut self, m_tilde: u64) -> Self {
        self.m_tilde = Some(m_tilde);
        self
    }

    /// Head-room kept for the `K * n` expansion factor when sizing base B.
    pub fn reserved_bits(mut self, bits: u32) -> Self {
        self.reserved_bits = Some(bits);
        self
    }

    pub fn params(self) -> RnsResult<RnsToolParams> {
        let params = RnsToolParams {
            degree: self.degree,
            base_q: self.base_q,
            plain_modulus: self.plain_modulus.unwrap_or(0),
            auxiliary_bit_count: self
                .auxiliary_bit_count
                .unwrap_or(DEFAULT_AUXILIARY_BIT_COUNT),
            m_tilde: self.m_tilde.unwrap_or(DEFAULT_M_TILDE),
            reserved_bits: self.reserved_bits.unwrap_or(DEFAULT_RESERVED_BITS),
        };

        if !params.degree.is_power_of_two()
            || !(POLY_MOD_DEGREE_MIN..=POLY_MOD_DEGREE_MAX).contains(&params.degree)
        {
            return Err(RnsError::InvalidDegree {
                degree: params.degree,
            });
        }
        if params.base_q.size() > COEFF_MOD_COUNT_MAX {
            return Err(RnsError::InvalidBaseSize {
                size: params.base_q.size(),
            });
        }
        if !(2..=MOD_BIT_COUNT_MAX).contains(&params.auxiliary_bit_count) {
            return Err(RnsError::InvalidAuxiliaryBitCount {
                bit_count: params.auxiliary_bit_count,
            });
        }
        let m_tilde_bits = u64::BITS - params.m_tilde.leading_zeros();
        if params.m_tilde < 2 || m_tilde_bits >= params.auxiliary_bit_count {
            return Err(RnsError::InvalidMTilde {
                m_tilde: params.m_tilde,
            });
        }
        Ok(params)
    }

    pub fn build(self) -> RnsResult<RnsTool> {
        RnsTool::from_params(self.params()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_q() -> RnsBase {
        RnsBase::new(&[3, 5]).unwrap()
    }

    #[test]
    fn test_defaults_are_applied() {
        let params = RnsToolBuilder::new(4, base_q()).params().unwrap();
        assert_eq!(params.plain_modulus, 0);
        assert_eq!(params.auxiliary_bit_count, 61);
        assert_eq!(params.m_tilde, 1 << 32);
        assert_eq!(params.reserved_bits, 32);
    }

    #[test]
    fn test_overrides_are_kept() {
        let params = RnsToolBuilder::new(8, base_q())
            .plain_modulus(65537)
            .auxiliary_bit_count(50)
            .m_tilde(1 << 20)
            .reserved_bits(16)
            .params()
            .unwrap();
        assert_eq!(params.plain_modulus, 65537);
        assert_eq!(params.auxiliary_bit_count, 50);
        assert_eq!(params.m_tilde, 1 << 20);
        assert_eq!(params.reserved_bits, 16);
    }

    #[test]
    fn test_degree_must_be_power_of_two_in_range() {
        for degree in [0, 1, 3, 12, 262_144] {
            assert_eq!(
                RnsToolBuilder::new(degree, base_q()).params().unwrap_err(),
                RnsError::InvalidDegree { degree }
            );
        }
        assert!(RnsToolBuilder::new(2, base_q()).params().is_ok());
        assert!(RnsToolBuilder::new(131_072, base_q()).params().is_ok());
    }

    #[test]
    fn test_auxiliary_configuration_is_checked() {
        assert_eq!(
            RnsToolBuilder::new(4, base_q())
                .auxiliary_bit_count(62)
                .params()
                .unwrap_err(),
            RnsError::InvalidAuxiliaryBitCount { bit_count: 62 }
        );
        assert_eq!(
            RnsToolBuilder::new(4, base_q())
                .auxiliary_bit_count(32)
                .params()
                .unwrap_err(),
            RnsError::InvalidMTilde { m_tilde: 1 << 32 }
        );
        assert!(RnsToolBuilder::new(4, base_q()).m_tilde(1).params().is_err());
    }
}
