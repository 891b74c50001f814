// benches/scan_perf.rs
// Criterion benchmarks for index construction, the extension kernels and a whole-volume scan.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use ferrous_lastal::alignment::centroid::CentroidAligner;
use ferrous_lastal::alignment::gapped::GappedXdropAligner;
use ferrous_lastal::alignment::pipeline::{scan_strand, StrandResults};
use ferrous_lastal::alignment::workspace::ScanWorkspace;
use ferrous_lastal::alphabet::{Alphabet, SubsetAlphabet};
use ferrous_lastal::context::ScanContext;
use ferrous_lastal::index::{InMemoryVolumes, SubsetSuffixArray, VolumeLoader};
use ferrous_lastal::scan_opt::ScanOpt;
use ferrous_lastal::scoring::GapCosts;
use ferrous_lastal::sequence::SequenceBuffer;

const LETTERS: &[u8] = b"ACGT";

fn random_dna(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| LETTERS[rng.gen_range(0..4)]).collect()
}

/// Reads sampled from `reference` with about 2% substitutions.
fn sample_reads(rng: &mut StdRng, reference: &[u8], count: usize, len: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| {
            let start = rng.gen_range(0..reference.len() - len);
            reference[start..start + len]
                .iter()
                .map(|&c| if rng.gen_ratio(1, 50) { LETTERS[rng.gen_range(0..4)] } else { c })
                .collect()
        })
        .collect()
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    let dna = Alphabet::dna();
    let mut rng = StdRng::seed_from_u64(0xDEADBEEFCAFEBABE);
    for len in [10_000usize, 100_000] {
        let reference = SequenceBuffer::from_records(&dna, [("chr", &random_dna(&mut rng, len)[..])]);
        group.throughput(Throughput::Bytes(len as u64));
        for pattern in ["A C G T", "AG CT"] {
            group.bench_function(format!("{}_{}", pattern.replace(' ', "-"), len), |b| {
                b.iter_batched(
                    || SubsetAlphabet::from_pattern(&dna, pattern, false).unwrap(),
                    |subset| SubsetSuffixArray::build(black_box(reference.as_slice()), subset, 1, 4),
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_gapped_extension(c: &mut Criterion) {
    let mut group = c.benchmark_group("gapped_extension");
    let mut rng = StdRng::seed_from_u64(0x1234_5678);
    let gaps = GapCosts::affine(7, 1);
    for len in [100usize, 500, 2000] {
        let r = random_dna(&mut rng, len);
        let q: Vec<u8> = r
            .iter()
            .map(|&c| if rng.gen_ratio(1, 20) { LETTERS[rng.gen_range(0..4)] } else { c })
            .collect();
        let col = |i: usize, j: usize| if r[i] == q[j] { 1 } else { -1 };
        let mut aligner = GappedXdropAligner::new();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("xdrop_{}", len), |b| {
            b.iter(|| aligner.extend(col, len, len, &gaps, 39, 10_000).unwrap())
        });

        let mut centroid = CentroidAligner::new();
        aligner.extend(col, len, len, &gaps, 39, 10_000).unwrap();
        group.bench_function(format!("posterior_{}", len), |b| {
            b.iter(|| {
                centroid.compute(col, aligner.bands(), &gaps, 1.0);
                centroid.centroid(1.0, 0.0)
            })
        });
    }
    group.finish();
}

fn bench_volume_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("volume_scan");
    group.sample_size(10);
    let dna = Alphabet::dna();
    let mut rng = StdRng::seed_from_u64(0xFEED_F00D);
    let reference = random_dna(&mut rng, 200_000);
    let reads = sample_reads(&mut rng, &reference, 200, 150);
    let names: Vec<String> = (0..reads.len()).map(|i| format!("read{}", i)).collect();
    let queries = SequenceBuffer::from_records(&dna, names.iter().map(|n| n.as_str()).zip(reads.iter().map(|r| r.as_slice())));

    let opt = ScanOpt {
        threads: 1,
        ..Default::default()
    };
    let ctx = ScanContext::new(opt, queries).unwrap();
    let refs = SequenceBuffer::from_records(&dna, [("chr", &reference[..])]);
    let loader = InMemoryVolumes::new(&dna, ctx.index_params(), vec![("v0".to_string(), refs)]).unwrap();
    let volume = loader.load(0).unwrap();

    group.throughput(Throughput::Elements(reads.len() as u64));
    group.bench_function("reads_200x150_both_strands", |b| {
        let mut ws = ScanWorkspace::new();
        b.iter(|| {
            let mut out = StrandResults::default();
            for strand in &ctx.strands {
                scan_strand(&ctx, &volume, strand, &mut ws, &mut out);
            }
            black_box(out.records.len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_index_build, bench_gapped_extension, bench_volume_scan);
criterion_main!(benches);
