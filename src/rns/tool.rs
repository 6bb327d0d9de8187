//! BEHZ/HPS modulus-switching kernels for BFV and BGV.
//!
//! An [`RnsTool`] is built once per `(N, Q, t)` and derives:
//! - `B`, a base of auxiliary primes, and `m_sk`, so that `Bsk = B ∪ {m_sk}`;
//! - the helper modulus `m~` (default `2^32`) appended as `Bsk ∪ {m~}`;
//! - `gamma`, the correction modulus for exact decryption rounding, when `t != 0`.
//!
//! Every kernel takes caller-owned [`RnsPoly`] buffers, checks their shapes
//! before writing anything, and is otherwise infallible.

use tracing::{debug, instrument};

use super::base::validate_moduli;
use super::builder::{RnsToolBuilder, RnsToolParams};
use super::{BaseConverter, RnsBase, RnsError, RnsPoly, RnsResult};
use crypto_bigint::BoxedUint;

use crate::math::{Modulus, MulOperand, generate_primes};

/// Constants that exist only with a plaintext modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlainScaling {
    t: Modulus,
    base_t_gamma: RnsBase,
    q_to_t: BaseConverter,
    q_to_t_gamma: BaseConverter,
    // t * gamma mod q_i
    prod_t_gamma_mod_q: Vec<MulOperand>,
    // -Q^{-1} mod {t, gamma}
    neg_inv_q_mod_t_gamma: Vec<MulOperand>,
    inv_gamma_mod_t: MulOperand,
    inv_q_last_mod_t: u64,
    q_last_mod_t: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RnsTool {
    degree: usize,
    base_q: RnsBase,
    base_b: RnsBase,
    base_bsk: RnsBase,
    base_bsk_m_tilde: RnsBase,
    m_tilde: Modulus,
    m_sk: Modulus,
    gamma: Modulus,

    q_to_bsk_m_tilde: BaseConverter,
    q_to_bsk: BaseConverter,
    b_to_q: BaseConverter,
    b_to_m_sk: BaseConverter,

    m_tilde_mod_q: Vec<MulOperand>,
    // B mod q_i
    prod_b_mod_q: Vec<u64>,
    // Q mod Bsk_i
    prod_q_mod_bsk: Vec<MulOperand>,
    inv_prod_q_mod_bsk: Vec<MulOperand>,
    inv_prod_b_mod_m_sk: MulOperand,
    inv_m_tilde_mod_bsk: Vec<MulOperand>,
    neg_inv_prod_q_mod_m_tilde: MulOperand,
    inv_q_last_mod_q: Vec<MulOperand>,

    plain: Option<PlainScaling>,
}

/// Shoup operands for `value^{-1} mod m` over every modulus of `base`.
fn inverses_mod(value: &BoxedUint, moduli: &[Modulus]) -> RnsResult<Vec<MulOperand>> {
    moduli
        .iter()
        .map(|m| {
            let inv = m.try_inv(m.reduce_uint(value))?;
            Ok(MulOperand::new(inv, m))
        })
        .collect()
}

/// `count` NTT-friendly primes of `bit_count` bits in descending order,
/// skipping every value in `exclude`.
fn auxiliary_primes(
    bit_count: u32,
    count: usize,
    degree: usize,
    exclude: &[u64],
) -> RnsResult<Vec<u64>> {
    let candidates = generate_primes(bit_count, count + exclude.len(), degree)?;
    Ok(candidates
        .into_iter()
        .filter(|p| !exclude.contains(p))
        .take(count)
        .collect())
}

impl RnsTool {
    /// Builds a tool with default auxiliary parameters; `t = 0` means no
    /// plaintext modulus.
    pub fn new(degree: usize, base_q: &RnsBase, plain_modulus: u64) -> RnsResult<Self> {
        RnsToolBuilder::new(degree, base_q.clone())
            .plain_modulus(plain_modulus)
            .build()
    }

    pub fn builder(degree: usize, base_q: RnsBase) -> RnsToolBuilder {
        RnsToolBuilder::new(degree, base_q)
    }

    #[instrument(skip_all, fields(degree = params.degree, q_size = params.base_q.size()))]
    pub fn from_params(params: RnsToolParams) -> RnsResult<Self> {
        let RnsToolParams {
            degree,
            base_q,
            plain_modulus,
            auxiliary_bit_count: aux_bits,
            m_tilde,
            reserved_bits,
        } = params;
        let t = Modulus::new(plain_modulus)?;
        let m_tilde = Modulus::new(m_tilde)?.require_nonzero().copied()?;
        let q_size = base_q.size();

        // Keep K * n * t * Q < B * m_sk, compared in bits.
        let q_bits = base_q.base_prod().bits();
        let mut b_size = q_size;
        let enlarged = reserved_bits + t.bit_count() + q_bits
            >= aux_bits * q_size as u32 + aux_bits;
        if enlarged {
            b_size += 1;
        }

        let mut taken = base_q.values();
        taken.push(t.value());
        let primes = auxiliary_primes(aux_bits, b_size + 2, degree, &taken)?;
        let m_sk = Modulus::new(primes[0])?;
        let gamma = Modulus::new(primes[1])?;
        let base_b = RnsBase::new(&primes[2..])?;
        let base_bsk = base_b.extend(m_sk.value())?;
        let base_bsk_m_tilde = base_bsk.extend(m_tilde.value())?;
        debug!(
            b_size,
            enlarged,
            m_sk = m_sk.value(),
            gamma = gamma.value(),
            base_b = ?base_b.values(),
            "sampled auxiliary primes"
        );

        let mut all = base_q.moduli().to_vec();
        all.extend_from_slice(base_bsk_m_tilde.moduli());
        validate_moduli(&all)?;

        let q_to_bsk_m_tilde = BaseConverter::new(&base_q, &base_bsk_m_tilde);
        let q_to_bsk = BaseConverter::new(&base_q, &base_bsk);
        let b_to_q = BaseConverter::new(&base_b, &base_q);
        let b_to_m_sk = BaseConverter::new(&base_b, &RnsBase::from_moduli(vec![m_sk])?);

        let m_tilde_mod_q = base_q
            .moduli()
            .iter()
            .map(|q| q.operand(m_tilde.value()))
            .collect();
        let prod_b_mod_q = base_q
            .moduli()
            .iter()
            .map(|q| q.reduce_uint(base_b.base_prod()))
            .collect();
        let prod_q_mod_bsk = base_bsk
            .moduli()
            .iter()
            .map(|m| MulOperand::new(m.reduce_uint(base_q.base_prod()), m))
            .collect();
        let inv_prod_q_mod_bsk = inverses_mod(base_q.base_prod(), base_bsk.moduli())?;
        let inv_prod_b_mod_m_sk = inverses_mod(base_b.base_prod(), &[m_sk])?[0];
        let inv_m_tilde_mod_bsk =
            inverses_mod(&BoxedUint::from(m_tilde.value()), base_bsk.moduli())?;
        let inv_q_mod_m_tilde = m_tilde.try_inv(m_tilde.reduce_uint(base_q.base_prod()))?;
        let neg_inv_prod_q_mod_m_tilde =
            MulOperand::new(m_tilde.neg(inv_q_mod_m_tilde), &m_tilde);

        let q_moduli = base_q.moduli();
        let q_last = q_moduli[q_size - 1];
        let inv_q_last_mod_q =
            inverses_mod(&BoxedUint::from(q_last.value()), &q_moduli[..q_size - 1])?;

        let plain = if t.is_zero() {
            None
        } else {
            Some(Self::plain_scaling(&base_q, t, gamma)?)
        };
        debug!(
            bsk_size = base_bsk.size(),
            plain = !t.is_zero(),
            "rns tool ready"
        );

        Ok(Self {
            degree,
            base_q,
            base_b,
            base_bsk,
            base_bsk_m_tilde,
            m_tilde,
            m_sk,
            gamma,
            q_to_bsk_m_tilde,
            q_to_bsk,
            b_to_q,
            b_to_m_sk,
            m_tilde_mod_q,
            prod_b_mod_q,
            prod_q_mod_bsk,
            inv_prod_q_mod_bsk,
            inv_prod_b_mod_m_sk,
            inv_m_tilde_mod_bsk,
            neg_inv_prod_q_mod_m_tilde,
            inv_q_last_mod_q,
            plain,
        })
    }

    fn plain_scaling(base_q: &RnsBase, t: Modulus, gamma: Modulus) -> RnsResult<PlainScaling> {
        let base_t_gamma = RnsBase::from_moduli(vec![t, gamma])?;
        let q_to_t = BaseConverter::new(base_q, &RnsBase::from_moduli(vec![t])?);
        let q_to_t_gamma = BaseConverter::new(base_q, &base_t_gamma);

        let prod_t_gamma_mod_q = base_q
            .moduli()
            .iter()
            .map(|q| MulOperand::new(q.reduce_uint(base_t_gamma.base_prod()), q))
            .collect();
        let neg_inv_q_mod_t_gamma = base_t_gamma
            .moduli()
            .iter()
            .map(|m| {
                let inv = m.try_inv(m.reduce_uint(base_q.base_prod()))?;
                Ok(MulOperand::new(m.neg(inv), m))
            })
            .collect::<RnsResult<Vec<_>>>()?;
        let inv_gamma_mod_t = MulOperand::new(t.try_inv(gamma.value())?, &t);

        let q_last = base_q.moduli()[base_q.size() - 1].value();
        let inv_q_last_mod_t = t.try_inv(q_last)?;
        let q_last_mod_t = t.reduce(q_last);

        Ok(PlainScaling {
            t,
            base_t_gamma,
            q_to_t,
            q_to_t_gamma,
            prod_t_gamma_mod_q,
            neg_inv_q_mod_t_gamma,
            inv_gamma_mod_t,
            inv_q_last_mod_t,
            q_last_mod_t,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn base_q(&self) -> &RnsBase {
        &self.base_q
    }

    pub fn base_b(&self) -> &RnsBase {
        &self.base_b
    }

    pub fn base_bsk(&self) -> &RnsBase {
        &self.base_bsk
    }

    pub fn base_bsk_m_tilde(&self) -> &RnsBase {
        &self.base_bsk_m_tilde
    }

    pub fn base_t_gamma(&self) -> Option<&RnsBase> {
        self.plain.as_ref().map(|p| &p.base_t_gamma)
    }

    pub fn m_tilde(&self) -> &Modulus {
        &self.m_tilde
    }

    pub fn m_sk(&self) -> &Modulus {
        &self.m_sk
    }

    pub fn gamma(&self) -> &Modulus {
        &self.gamma
    }

    /// The plaintext modulus; zero when none was configured.
    pub fn plain_modulus(&self) -> Modulus {
        self.plain.as_ref().map_or(Modulus::zero(), |p| p.t)
    }

    /// `q_last^{-1} mod q_i` for every `i` but the last.
    pub fn inv_q_last_mod_q(&self) -> &[MulOperand] {
        &self.inv_q_last_mod_q
    }

    pub fn inv_q_last_mod_t(&self) -> Option<u64> {
        self.plain.as_ref().map(|p| p.inv_q_last_mod_t)
    }

    pub fn q_last_mod_t(&self) -> Option<u64> {
        self.plain.as_ref().map(|p| p.q_last_mod_t)
    }

    fn plain(&self) -> RnsResult<&PlainScaling> {
        self.plain.as_ref().ok_or(RnsError::MissingPlainModulus)
    }

    /// `FastBConv([x * m~]_Q, Q, Bsk ∪ {m~})`.
    ///
    /// `input` is `(|Q|, N)`, `output` is `(|Bsk| + 1, N)`.
    pub fn fast_b_conv_m_tilde(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let n = self.degree;
        input.check_shape(self.base_q.size(), n)?;
        output.check_shape(self.base_bsk_m_tilde.size(), n)?;

        let mut scaled = RnsPoly::zero(self.base_q.size(), n);
        for (((q, factor), src), dst) in self
            .base_q
            .moduli()
            .iter()
            .zip(&self.m_tilde_mod_q)
            .zip(input.channels())
            .zip(scaled.channels_mut())
        {
            for (d, &x) in dst.iter_mut().zip(src) {
                *d = q.mul_operand(x, factor);
            }
        }
        self.q_to_bsk_m_tilde
            .fast_convert_slices(scaled.as_slice(), output.as_mut_slice(), n);
        Ok(())
    }

    /// Small Montgomery reduction: maps `[c * m~]_Q + Q * u` in `Bsk ∪ {m~}`
    /// to `c + Q * u'` in `Bsk` with the `m~` factor cancelled.
    ///
    /// `input` is `(|Bsk| + 1, N)`, `output` is `(|Bsk|, N)`.
    pub fn sm_mrq(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let n = self.degree;
        let bsk_size = self.base_bsk.size();
        input.check_shape(bsk_size + 1, n)?;
        output.check_shape(bsk_size, n)?;

        // r = -c'' * Q^{-1} mod m~
        let m_tilde = &self.m_tilde;
        let r_m_tilde: Vec<u64> = input
            .channel(bsk_size)
            .iter()
            .map(|&x| m_tilde.mul_operand(x, &self.neg_inv_prod_q_mod_m_tilde))
            .collect();
        let m_tilde_half = m_tilde.value() >> 1;

        for (i, (m, dst)) in self
            .base_bsk
            .moduli()
            .iter()
            .zip(output.channels_mut())
            .enumerate()
        {
            let src = input.channel(i);
            for ((d, &x), &r) in dst.iter_mut().zip(src).zip(&r_m_tilde) {
                // Centered lift of r from [0, m~) to (-m~/2, m~/2], shifted into [0, m).
                let r = if r >= m_tilde_half {
                    r + (m.value() - m_tilde.value())
                } else {
                    r
                };
                let c = m.mul_add_operand(r, &self.prod_q_mod_bsk[i], x);
                *d = m.mul_operand(c, &self.inv_m_tilde_mod_bsk[i]);
            }
        }
        Ok(())
    }

    /// Approximate `floor(x / Q)` in `Bsk`, off by at most `|Q| - 1`.
    ///
    /// `input` is `(|Q| + |Bsk|, N)` with the `Q` channels first, `output` is `(|Bsk|, N)`.
    pub fn fast_floor(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let n = self.degree;
        let q_size = self.base_q.size();
        let bsk_size = self.base_bsk.size();
        input.check_shape(q_size + bsk_size, n)?;
        output.check_shape(bsk_size, n)?;

        self.q_to_bsk
            .fast_convert_slices(input.channel_range(0..q_size), output.as_mut_slice(), n);
        for (i, (m, dst)) in self
            .base_bsk
            .moduli()
            .iter()
            .zip(output.channels_mut())
            .enumerate()
        {
            for (d, &x) in dst.iter_mut().zip(input.channel(q_size + i)) {
                *d = m.mul_operand(x + (m.value() - *d), &self.inv_prod_q_mod_bsk[i]);
            }
        }
        Ok(())
    }

    /// Shenoy-Kumaresan conversion from `Bsk` back to `Q`, exact for inputs
    /// below `B * m_sk / 2`.
    ///
    /// `input` is `(|Bsk|, N)`, `output` is `(|Q|, N)`.
    pub fn fast_b_conv_sk(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let n = self.degree;
        let b_size = self.base_b.size();
        input.check_shape(self.base_bsk.size(), n)?;
        output.check_shape(self.base_q.size(), n)?;

        let in_b = input.channel_range(0..b_size);
        self.b_to_q.fast_convert_slices(in_b, output.as_mut_slice(), n);
        let mut conv_m_sk = vec![0u64; n];
        self.b_to_m_sk.fast_convert_slices(in_b, &mut conv_m_sk, n);

        // alpha = (FastBConv(x, B, m_sk) - x_sk) * B^{-1} mod m_sk
        let m_sk = &self.m_sk;
        let alpha: Vec<u64> = conv_m_sk
            .iter()
            .zip(input.channel(b_size))
            .map(|(&conv, &x)| {
                m_sk.mul_operand(conv + (m_sk.value() - m_sk.reduce(x)), &self.inv_prod_b_mod_m_sk)
            })
            .collect();
        let m_sk_half = m_sk.value() >> 1;

        for ((q, &prod_b), dst) in self
            .base_q
            .moduli()
            .iter()
            .zip(&self.prod_b_mod_q)
            .zip(output.channels_mut())
        {
            let prod_b_op = MulOperand::new(prod_b, q);
            let neg_prod_b_op = MulOperand::new(q.neg(prod_b), q);
            for (d, &a) in dst.iter_mut().zip(&alpha) {
                // alpha above m_sk / 2 stands for the negative value alpha - m_sk.
                *d = if a > m_sk_half {
                    q.mul_add_operand(m_sk.neg(a), &prod_b_op, *d)
                } else {
                    q.mul_add_operand(a, &neg_prod_b_op, *d)
                };
            }
        }
        Ok(())
    }

    /// Divides by the last modulus of `Q` with rounding, in place.
    ///
    /// On return channels `0..|Q|-1` hold `round(x / q_last)`, off by at most
    /// one; the last channel is left meaningless and should be dropped.
    pub fn divide_and_round_q_last_inplace(&self, poly: &mut RnsPoly) -> RnsResult<()> {
        let n = self.degree;
        let q_size = self.base_q.size();
        poly.check_shape(q_size, n)?;
        if q_size == 1 {
            return Err(RnsError::CannotDropLast);
        }

        let (head, last) = poly.as_mut_slice().split_at_mut((q_size - 1) * n);
        let q_last = &self.base_q.moduli()[q_size - 1];
        let half = q_last.value() >> 1;
        // Adding q_last / 2 turns the floor below into rounding.
        for x in last.iter_mut() {
            *x = q_last.add(q_last.reduce(*x), half);
        }

        for ((q, inv), dst) in self
            .base_q
            .moduli()
            .iter()
            .zip(&self.inv_q_last_mod_q)
            .zip(head.chunks_exact_mut(n))
        {
            let half_mod = q.reduce(half);
            for (d, &l) in dst.iter_mut().zip(last.iter()) {
                let correction = q.sub(q.reduce(l), half_mod);
                *d = q.mul_operand(q.sub(q.reduce(*d), correction), inv);
            }
        }
        Ok(())
    }

    /// Exact `round(t * x / Q) mod t` of the phase `x` using gamma correction.
    ///
    /// `input` is `(|Q|, N)`, `output` is `(1, N)`.
    pub fn decrypt_scale_and_round(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let plain = self.plain()?;
        let n = self.degree;
        input.check_shape(self.base_q.size(), n)?;
        output.check_shape(1, n)?;

        // |gamma * t * x|_q
        let mut scaled = RnsPoly::zero(self.base_q.size(), n);
        for (((q, factor), src), dst) in self
            .base_q
            .moduli()
            .iter()
            .zip(&plain.prod_t_gamma_mod_q)
            .zip(input.channels())
            .zip(scaled.channels_mut())
        {
            for (d, &x) in dst.iter_mut().zip(src) {
                *d = q.mul_operand(x, factor);
            }
        }

        // s = FastBConv(|gamma * t * x|_q, q, {t, gamma}) * |-Q^{-1}|_{t, gamma}
        let mut s = RnsPoly::zero(2, n);
        plain
            .q_to_t_gamma
            .fast_convert_slices(scaled.as_slice(), s.as_mut_slice(), n);
        for ((m, factor), channel) in plain
            .base_t_gamma
            .moduli()
            .iter()
            .zip(&plain.neg_inv_q_mod_t_gamma)
            .zip(s.channels_mut())
        {
            for x in channel.iter_mut() {
                *x = m.mul_operand(*x, factor);
            }
        }

        let t = &plain.t;
        let gamma = self.gamma.value();
        let gamma_half = gamma >> 1;
        for ((d, &s_t), &s_gamma) in output
            .as_mut_slice()
            .iter_mut()
            .zip(s.channel(0))
            .zip(s.channel(1))
        {
            // Center s_gamma before subtracting it from s_t.
            let m = if s_gamma > gamma_half {
                t.add(s_t, t.reduce(gamma - s_gamma))
            } else {
                t.sub(s_t, t.reduce(s_gamma))
            };
            *d = if m == 0 {
                0
            } else {
                t.mul_operand(m, &plain.inv_gamma_mod_t)
            };
        }
        Ok(())
    }

    /// BGV decryption helper: exact conversion of the centered phase into `{t}`.
    ///
    /// `phase` is `(|Q|, N)`, `output` is `(1, N)`.
    pub fn decrypt_mod_t(&self, phase: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let plain = self.plain()?;
        phase.check_shape(self.base_q.size(), self.degree)?;
        plain.q_to_t.exact_convert_array(phase, output)
    }
}
