use criterion::{Criterion, criterion_group, criterion_main};
use doc_rag::chunking::{ChunkingConfig, TextSplitter};
use doc_rag::index::cosine_similarity;
use std::hint::black_box;

/// Roughly 200 KB of policy-like prose in paragraphs
fn policy_document() -> String {
    let sentences = [
        "A grace period of thirty days is provided for premium payment after the due date.",
        "Claims must be notified to the insurer within thirty days of hospital admission.",
        "Maternity expenses are covered after twenty four months of continuous coverage.",
        "Room rent is limited to one percent of the sum insured per day.",
        "Pre-existing diseases are covered after thirty six months of continuous coverage.",
    ];

    let mut text = String::new();
    for paragraph in 0..500 {
        for line in 0..5 {
            text.push_str(sentences[(paragraph + line) % sentences.len()]);
            text.push(if line == 4 { '\n' } else { ' ' });
        }
        text.push('\n');
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = policy_document();

    let default_splitter = TextSplitter::new(ChunkingConfig::default());
    c.bench_function("split default", |b| {
        b.iter(|| default_splitter.split(black_box(&text)));
    });

    let small_splitter = TextSplitter::new(ChunkingConfig {
        chunk_size: 200,
        chunk_overlap: 40,
        ..ChunkingConfig::default()
    });
    c.bench_function("split small chunks", |b| {
        b.iter(|| small_splitter.split(black_box(&text)));
    });

    let unbroken = "x".repeat(100_000);
    c.bench_function("split without separators", |b| {
        b.iter(|| default_splitter.split(black_box(&unbroken)));
    });

    let query: Vec<f32> = (0..768).map(|i| (i as f32).sin()).collect();
    let record: Vec<f32> = (0..768).map(|i| (i as f32).cos()).collect();
    c.bench_function("cosine 768", |b| {
        b.iter(|| cosine_similarity(black_box(&query), black_box(&record)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
