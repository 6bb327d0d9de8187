use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rns_toolkit::math::{generate_primes, uniform_poly};
use rns_toolkit::{RnsBase, RnsPoly, RnsTool};
use std::hint::black_box;

const DEGREE: usize = 4096;
const PLAIN_MODULUS: u64 = 65537;

fn tool(q_size: usize) -> RnsTool {
    let primes = generate_primes(50, q_size, DEGREE).unwrap();
    let base = RnsBase::new(&primes).unwrap();
    RnsTool::new(DEGREE, &base, PLAIN_MODULUS).unwrap()
}

fn bench_behz_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("behz");
    let mut rng = ChaCha20Rng::seed_from_u64(42);

    for &k in &[2usize, 4] {
        let tool = tool(k);
        let input = uniform_poly(tool.base_q(), DEGREE, &mut rng).unwrap();
        let mut extended = RnsPoly::zero(tool.base_bsk_m_tilde().size(), DEGREE);
        let mut bsk = RnsPoly::zero(tool.base_bsk().size(), DEGREE);
        let mut back = RnsPoly::zero(k, DEGREE);

        group.bench_with_input(BenchmarkId::new("fast_b_conv_m_tilde", k), &input, |b, input| {
            b.iter(|| tool.fast_b_conv_m_tilde(black_box(input), &mut extended).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("sm_mrq", k), &extended.clone(), |b, ext| {
            b.iter(|| tool.sm_mrq(black_box(ext), &mut bsk).unwrap());
        });

        let q_bsk = uniform_poly(&tool.base_q().extend_base(tool.base_bsk()).unwrap(), DEGREE, &mut rng)
            .unwrap();
        group.bench_with_input(BenchmarkId::new("fast_floor", k), &q_bsk, |b, input| {
            b.iter(|| tool.fast_floor(black_box(input), &mut bsk).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("fast_b_conv_sk", k), &bsk.clone(), |b, input| {
            b.iter(|| tool.fast_b_conv_sk(black_box(input), &mut back).unwrap());
        });
    }

    group.finish();
}

fn bench_rescale_and_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescale_decrypt");
    let mut rng = ChaCha20Rng::seed_from_u64(9);

    for &k in &[2usize, 4] {
        let tool = tool(k);
        let input = uniform_poly(tool.base_q(), DEGREE, &mut rng).unwrap();
        let mut out = RnsPoly::zero(1, DEGREE);

        group.bench_with_input(
            BenchmarkId::new("divide_and_round_q_last", k),
            &input,
            |b, input| {
                b.iter(|| {
                    let mut poly = input.clone();
                    tool.divide_and_round_q_last_inplace(&mut poly).unwrap();
                    black_box(poly)
                });
            },
        );
        group.bench_with_input(BenchmarkId::new("decrypt_scale_and_round", k), &input, |b, input| {
            b.iter(|| tool.decrypt_scale_and_round(black_box(input), &mut out).unwrap());
        });
    }

    group.finish();
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("rns_tool_new");
    group.sample_size(10);
    for &k in &[2usize, 8] {
        let primes = generate_primes(50, k, DEGREE).unwrap();
        let base = RnsBase::new(&primes).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(k), &base, |b, base| {
            b.iter(|| black_box(RnsTool::new(DEGREE, base, PLAIN_MODULUS).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(rns_tool, bench_behz_kernels, bench_rescale_and_decrypt, bench_construction);
criterion_main!(rns_tool);
