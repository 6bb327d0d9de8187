//! Residue-to-residue base conversion.
//!
//! For an input base `q` and output base `p`, the fast conversion
//!
//! ```text
//! FastBConv(x, q, p)_i = sum_j [x_j * q~_j]_{q_j} * (q*_j mod p_i)  mod p_i
//! ```
//!
//! never materializes the integer. The result is `x + a * Q` for some
//! `0 <= a < |q|`, which is what the BEHZ kernels in [`super::RnsTool`] rely on.

use tracing::trace;

use super::{RnsBase, RnsError, RnsPoly, RnsResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseConverter {
    input_base: RnsBase,
    output_base: RnsBase,
    // base_change_matrix[i][j] = q*_j mod p_i
    base_change_matrix: Vec<Vec<u64>>,
    // Q mod p_i
    input_prod_mod_output: Vec<u64>,
}

impl BaseConverter {
    /// Precomputes the conversion constants; the two bases need not be related.
    pub fn new(input_base: &RnsBase, output_base: &RnsBase) -> Self {
        trace!(
            input_size = input_base.size(),
            output_size = output_base.size(),
            "building base converter"
        );
        let base_change_matrix = output_base
            .moduli()
            .iter()
            .map(|p| {
                input_base
                    .punctured_prod_array()
                    .iter()
                    .map(|q_star| p.reduce_uint(q_star))
                    .collect()
            })
            .collect();
        let input_prod_mod_output = output_base
            .moduli()
            .iter()
            .map(|p| p.reduce_uint(input_base.base_prod()))
            .collect();

        Self {
            input_base: input_base.clone(),
            output_base: output_base.clone(),
            base_change_matrix,
            input_prod_mod_output,
        }
    }

    pub fn input_base(&self) -> &RnsBase {
        &self.input_base
    }

    pub fn output_base(&self) -> &RnsBase {
        &self.output_base
    }

    pub fn input_size(&self) -> usize {
        self.input_base.size()
    }

    pub fn output_size(&self) -> usize {
        self.output_base.size()
    }

    fn check_single(expected: usize, actual: usize) -> RnsResult<()> {
        if expected != actual {
            return Err(RnsError::ShapeMismatch {
                expected: (expected, 1),
                actual: (actual, 1),
            });
        }
        Ok(())
    }

    /// Converts one coefficient given by its input residues.
    pub fn fast_convert(&self, input: &[u64], output: &mut [u64]) -> RnsResult<()> {
        Self::check_single(self.input_size(), input.len())?;
        Self::check_single(self.output_size(), output.len())?;
        self.fast_convert_slices(input, output, 1);
        Ok(())
    }

    /// Converts every coefficient of an `(input_size, N)` tensor into an
    /// `(output_size, N)` tensor.
    pub fn fast_convert_array(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        let degree = input.degree();
        input.check_shape(self.input_size(), degree)?;
        output.check_shape(self.output_size(), degree)?;
        self.fast_convert_slices(input.as_slice(), output.as_mut_slice(), degree);
        Ok(())
    }

    /// Channel-major kernel; shapes are the caller's responsibility.
    pub(crate) fn fast_convert_slices(&self, input: &[u64], output: &mut [u64], degree: usize) {
        let size = self.input_size();
        debug_assert_eq!(input.len(), size * degree);
        debug_assert_eq!(output.len(), self.output_size() * degree);
        if degree == 0 {
            return;
        }

        // Coefficient-major scratch so each dot product reads one contiguous row.
        let mut scaled = vec![0u64; degree * size];
        for (i, (q, inv)) in self
            .input_base
            .moduli()
            .iter()
            .zip(self.input_base.inv_punctured_prod_mod_base_array())
            .enumerate()
        {
            for (j, &x) in input[i * degree..(i + 1) * degree].iter().enumerate() {
                scaled[j * size + i] = q.mul_operand(x, inv);
            }
        }

        for ((p, row), out) in self
            .output_base
            .moduli()
            .iter()
            .zip(&self.base_change_matrix)
            .zip(output.chunks_exact_mut(degree))
        {
            for (coeff, column) in out.iter_mut().zip(scaled.chunks_exact(size)) {
                *coeff = p.dot_product(column, row);
            }
        }
    }

    fn check_exact(&self) -> RnsResult<()> {
        if self.output_size() != 1 {
            return Err(RnsError::OutputBaseSize {
                expected: 1,
                actual: self.output_size(),
            });
        }
        Ok(())
    }

    /// Exact conversion into a single-modulus output base.
    ///
    /// Returns the residue of the centered representative of the input in
    /// `[-Q/2, Q/2)`, subtracting `v * Q` with
    /// `v = round(sum [x_i * q~_i]_{q_i} / q_i)`.
    pub fn exact_convert(&self, input: &[u64]) -> RnsResult<u64> {
        self.check_exact()?;
        Self::check_single(self.input_size(), input.len())?;
        let mut scratch = vec![0u64; self.input_size()];
        Ok(self.exact_convert_one(input.iter().copied(), &mut scratch))
    }

    /// Exact conversion of an `(input_size, N)` tensor into a `(1, N)` tensor.
    pub fn exact_convert_array(&self, input: &RnsPoly, output: &mut RnsPoly) -> RnsResult<()> {
        self.check_exact()?;
        let degree = input.degree();
        input.check_shape(self.input_size(), degree)?;
        output.check_shape(1, degree)?;
        self.exact_convert_slices(input.as_slice(), output.as_mut_slice(), degree);
        Ok(())
    }

    pub(crate) fn exact_convert_slices(&self, input: &[u64], output: &mut [u64], degree: usize) {
        let mut scratch = vec![0u64; self.input_size()];
        for (j, out) in output.iter_mut().enumerate() {
            let column = (0..self.input_size()).map(|i| input[i * degree + j]);
            *out = self.exact_convert_one(column, &mut scratch);
        }
    }

    fn exact_convert_one(&self, input: impl Iterator<Item = u64>, scaled: &mut [u64]) -> u64 {
        let mut v = 0f64;
        for (((x, q), inv), s) in input
            .zip(self.input_base.moduli())
            .zip(self.input_base.inv_punctured_prod_mod_base_array())
            .zip(scaled.iter_mut())
        {
            *s = q.mul_operand(x, inv);
            v += *s as f64 / q.value() as f64;
        }
        // A tie at exactly one half rounds down.
        let v = if v == 0.5 { 0 } else { v.round() as u64 };

        let p = &self.output_base.moduli()[0];
        let sum = p.dot_product(scaled, &self.base_change_matrix[0]);
        p.sub(sum, p.mul(v, self.input_prod_mod_output[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(input: &[u64], output: &[u64]) -> BaseConverter {
        BaseConverter::new(&RnsBase::new(input).unwrap(), &RnsBase::new(output).unwrap())
    }

    fn assert_fast(conv: &BaseConverter, input: &[u64], expected: &[u64]) {
        let mut out = vec![0u64; conv.output_size()];
        conv.fast_convert(input, &mut out).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_single_modulus_conversions() {
        let conv = converter(&[2], &[2]);
        assert_fast(&conv, &[0], &[0]);
        assert_fast(&conv, &[1], &[1]);

        let conv = converter(&[2], &[3]);
        assert_fast(&conv, &[0], &[0]);
        assert_fast(&conv, &[1], &[1]);

        let conv = converter(&[3], &[2]);
        assert_fast(&conv, &[0], &[0]);
        assert_fast(&conv, &[1], &[1]);
        assert_fast(&conv, &[2], &[0]);
    }

    #[test]
    fn test_multi_modulus_conversions() {
        let conv = converter(&[2, 3], &[2]);
        assert_fast(&conv, &[0, 0], &[0]);
        assert_fast(&conv, &[1, 1], &[1]);
        assert_fast(&conv, &[0, 2], &[0]);
        assert_fast(&conv, &[1, 0], &[1]);

        let conv = converter(&[2, 3], &[2, 3]);
        assert_fast(&conv, &[1, 1], &[1, 1]);
        assert_fast(&conv, &[1, 2], &[1, 2]);

        let conv = converter(&[2, 3], &[3, 4, 5]);
        assert_fast(&conv, &[0, 0], &[0, 0, 0]);
        assert_fast(&conv, &[1, 1], &[1, 3, 2]);
        assert_fast(&conv, &[1, 2], &[2, 1, 0]);
    }

    #[test]
    fn test_fast_conversion_overshoots_by_multiples_of_q() {
        // 5 in {3, 7}: the fast result is 5 + a * 21 for a in {0, 1}.
        let conv = converter(&[3, 7], &[1153]);
        let mut out = [0u64];
        conv.fast_convert(&[2, 5], &mut out).unwrap();
        assert!(out[0] == 5 || out[0] == 26, "got {}", out[0]);
    }

    #[test]
    fn test_array_conversion_is_per_coefficient() {
        let conv = converter(&[3], &[2]);
        let input = RnsPoly::from_channels(vec![vec![0, 1, 2]]).unwrap();
        let mut output = RnsPoly::zero(1, 3);
        conv.fast_convert_array(&input, &mut output).unwrap();
        assert_eq!(output.as_slice(), &[0, 1, 0]);

        let conv = converter(&[2, 3], &[3, 4, 5]);
        let input = RnsPoly::from_channels(vec![vec![0, 1, 1], vec![0, 1, 2]]).unwrap();
        let mut output = RnsPoly::zero(3, 3);
        conv.fast_convert_array(&input, &mut output).unwrap();
        assert_eq!(output.into_channels(), vec![vec![0, 1, 2], vec![0, 3, 1], vec![0, 2, 0]]);
    }

    #[test]
    fn test_empty_tensors_convert_to_empty_tensors() {
        let conv = converter(&[2, 3], &[3, 4, 5]);
        let input = RnsPoly::zero(2, 0);
        let mut output = RnsPoly::zero(3, 0);
        conv.fast_convert_array(&input, &mut output).unwrap();
        assert_eq!(output.shape(), (3, 0));

        let conv = converter(&[3, 5], &[7]);
        let mut output = RnsPoly::zero(1, 0);
        conv.exact_convert_array(&input, &mut output).unwrap();
        assert!(output.as_slice().is_empty());
    }

    #[test]
    fn test_exact_conversion_is_centered() {
        let conv = converter(&[3, 5], &[7]);
        // 4 in [0, 7.5) stays 4; 14 = -1 mod 15 maps to 6.
        assert_eq!(conv.exact_convert(&[1, 4]).unwrap(), 4);
        assert_eq!(conv.exact_convert(&[2, 4]).unwrap(), 6);
        assert_eq!(conv.exact_convert(&[0, 0]).unwrap(), 0);

        let input = RnsPoly::from_channels(vec![vec![1, 2, 0], vec![4, 4, 0]]).unwrap();
        let mut output = RnsPoly::zero(1, 3);
        conv.exact_convert_array(&input, &mut output).unwrap();
        assert_eq!(output.as_slice(), &[4, 6, 0]);
    }

    #[test]
    fn test_exact_conversion_requires_single_output() {
        let conv = converter(&[3, 5], &[7, 11]);
        assert_eq!(
            conv.exact_convert(&[1, 4]),
            Err(RnsError::OutputBaseSize {
                expected: 1,
                actual: 2
            })
        );
        let input = RnsPoly::zero(2, 4);
        let mut output = RnsPoly::zero(1, 4);
        assert!(conv.exact_convert_array(&input, &mut output).is_err());
    }

    #[test]
    fn test_shapes_are_checked_before_writing() {
        let conv = converter(&[2, 3], &[5]);
        let mut out = [9u64];
        assert!(conv.fast_convert(&[1], &mut out).is_err());
        assert_eq!(out, [9]);

        let input = RnsPoly::zero(2, 4);
        let mut output = RnsPoly::from_channels(vec![vec![7; 3]]).unwrap();
        assert_eq!(
            conv.fast_convert_array(&input, &mut output),
            Err(RnsError::ShapeMismatch {
                expected: (1, 4),
                actual: (1, 3)
            })
        );
        assert_eq!(output.as_slice(), &[7, 7, 7]);
    }
}
