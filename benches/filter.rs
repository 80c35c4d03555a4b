use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use termgloss::{ALL_CATEGORIES, GlossaryDataset, Term, TermStore, filter_terms};

const CATEGORIES: &[&str] = &["Web", "DevOps", "Data", "Security"];

fn synthetic_store(terms: usize) -> TermStore {
    let terms = (0..terms)
        .map(|n| Term {
            id: format!("term-{n}"),
            term: format!("Term {n:04}"),
            full_form: (n % 3 == 0).then(|| format!("Fully Expanded Term {n:04}")),
            definition: format!("Definition text for entry number {n}, mentioning pipelines."),
            category: CATEGORIES[n % CATEGORIES.len()].to_string(),
            related_terms: vec![format!("Term {:04}", (n + 1) % 500)],
            examples: Vec::new(),
        })
        .collect();
    TermStore::from_dataset(GlossaryDataset {
        terms,
        categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
    })
}

fn bench_load(c: &mut Criterion) {
    let raw = serde_json::json!({
        "terms": (0..500).map(|n| serde_json::json!({
            "id": format!("term-{n}"),
            "term": format!("Term {n:04}"),
            "definition": "A definition.",
            "category": CATEGORIES[n % CATEGORIES.len()],
        })).collect::<Vec<_>>(),
        "categories": CATEGORIES,
    })
    .to_string();
    c.bench_function("dataset::parse_and_sort", |b| {
        b.iter(|| {
            let dataset = GlossaryDataset::parse(&raw).expect("valid payload");
            black_box(dataset.terms.len());
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    for size in [50usize, 500] {
        let store = synthetic_store(size);
        c.bench_with_input(BenchmarkId::new("filter::category", size), &store, |b, store| {
            b.iter(|| black_box(filter_terms(store, "DevOps", "")).len());
        });
        c.bench_with_input(BenchmarkId::new("filter::query", size), &store, |b, store| {
            b.iter(|| black_box(filter_terms(store, ALL_CATEGORIES, "pipelines")).len());
        });
    }
}

fn bench_name_resolution(c: &mut Criterion) {
    let store = synthetic_store(500);
    c.bench_function("store::resolve_id_by_name", |b| {
        b.iter(|| black_box(store.resolve_id_by_name("term 0250")));
    });
}

criterion_group!(benches, bench_load, bench_filter, bench_name_resolution);
criterion_main!(benches);
