// tests/parallel_equivalence.rs
//
// The set of matches must not depend on the number of blocks, threads,
// window size or split threshold.

use rand::{rngs::StdRng, Rng, SeedableRng};

use ferrous_map::filter::HomopolymerMasker;
use ferrous_map::pipeline::{merge, partition_reads};
use ferrous_map::{map_reads, Contig, MapOpt, Match, Read, Strands};

const BASES: &[u8] = b"ACGT";

fn random_seq(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

fn mutate(rng: &mut StdRng, seq: &[u8], edits: usize) -> Vec<u8> {
    let mut out = seq.to_vec();
    for _ in 0..edits {
        let pos = rng.gen_range(0..out.len());
        match rng.gen_range(0..3) {
            0 => out[pos] = BASES[rng.gen_range(0..4)],
            1 => out.insert(pos, BASES[rng.gen_range(0..4)]),
            _ => {
                out.remove(pos);
            }
        }
    }
    out
}

/// Two contigs and reads sampled from both strands with a few edits
fn workload(seed: u64, num_reads: usize) -> (Vec<Contig>, Vec<Read>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let seqs: Vec<Vec<u8>> = vec![random_seq(&mut rng, 6_000), random_seq(&mut rng, 3_500)];
    let contigs: Vec<Contig> = seqs
        .iter()
        .enumerate()
        .map(|(i, s)| Contig::new(i, format!("ctg{}", i), s))
        .collect();

    let reads = (0..num_reads)
        .map(|id| {
            let src = &seqs[rng.gen_range(0..seqs.len())];
            let len = rng.gen_range(40..120);
            let start = rng.gen_range(0..src.len() - len);
            let n_edits = rng.gen_range(0..3);
            let mut sample = mutate(&mut rng, &src[start..start + len], n_edits);
            if rng.gen_bool(0.5) {
                sample = sample
                    .iter()
                    .rev()
                    .map(|&b| match b {
                        b'A' => b'T',
                        b'C' => b'G',
                        b'G' => b'C',
                        _ => b'A',
                    })
                    .collect();
            }
            Read::new(id, format!("read{}", id), &sample)
        })
        .collect();
    (contigs, reads)
}

fn sorted(matches: &[Match]) -> Vec<Match> {
    let mut v: Vec<Match> = matches.iter().map(|m| Match { id: 0, ..*m }).collect();
    v.sort();
    v
}

fn base_opt() -> MapOpt {
    MapOpt {
        error_rate: 0.05,
        seed_len: 8,
        strands: Strands::Both,
        ..MapOpt::default()
    }
}

#[test]
fn test_one_block_equals_many_blocks() {
    let (contigs, reads) = workload(7, 400);
    let masker = HomopolymerMasker::new(50);

    let single = map_reads(
        &contigs,
        &reads,
        &masker,
        &MapOpt {
            n_threads: 1,
            blocks_per_core: 1.0,
            ..base_opt()
        },
    )
    .unwrap();
    assert_eq!(single.stats.blocks, 1);

    let many = map_reads(
        &contigs,
        &reads,
        &masker,
        &MapOpt {
            n_threads: 4,
            blocks_per_core: 2.0,
            split_threshold: 4,
            window_size: 700,
            ..base_opt()
        },
    )
    .unwrap();
    assert_eq!(many.stats.blocks, 8);

    assert!(!single.matches.is_empty());
    assert_eq!(sorted(single.matches.as_slice()), sorted(many.matches.as_slice()));
    assert_eq!(single.stats.filter_hits, many.stats.filter_hits);
    assert_eq!(single.stats.verifications, many.stats.verifications);
}

#[test]
fn test_repeated_runs_are_identical() {
    let (contigs, reads) = workload(11, 250);
    let opt = MapOpt {
        n_threads: 3,
        blocks_per_core: 1.5,
        split_threshold: 2,
        window_size: 333,
        ..base_opt()
    };
    let a = map_reads(&contigs, &reads, &HomopolymerMasker::new(50), &opt).unwrap();
    let b = map_reads(&contigs, &reads, &HomopolymerMasker::new(50), &opt).unwrap();
    // block order and within-block order are fixed, so even ids agree
    assert_eq!(a.matches.as_slice(), b.matches.as_slice());
}

#[test]
fn test_most_sampled_reads_are_mapped() {
    let (contigs, reads) = workload(3, 200);
    let result = map_reads(
        &contigs,
        &reads,
        &HomopolymerMasker::new(50),
        &MapOpt {
            n_threads: 2,
            ..base_opt()
        },
    )
    .unwrap();
    let mut mapped: Vec<usize> = result.matches.iter().map(|m| m.read_id).collect();
    mapped.sort_unstable();
    mapped.dedup();
    // reads carry at most two edits, well within 5% of 40+ bases
    assert_eq!(mapped.len(), reads.len());
}

#[test]
fn test_block_buffers_merge_completely() {
    let (contigs, reads) = workload(5, 300);
    let blocks = partition_reads(&reads, 6);
    let opt = MapOpt {
        n_threads: 2,
        ..base_opt()
    };

    // map each block separately and merge the buffers by hand
    let mut buffers = Vec::new();
    for block in &blocks {
        let local: Vec<Read> = block.reads.to_vec();
        let result = map_reads(&contigs, &local, &HomopolymerMasker::new(50), &opt).unwrap();
        buffers.push(result.matches.into_vec());
    }
    let total: usize = buffers.iter().map(Vec::len).sum();
    let merged = merge(buffers).unwrap();
    assert_eq!(merged.len(), total);

    let whole = map_reads(&contigs, &reads, &HomopolymerMasker::new(50), &opt).unwrap();
    assert_eq!(sorted(merged.as_slice()), sorted(whole.matches.as_slice()));
}
