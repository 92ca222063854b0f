use std::collections::HashSet;

use clipsearch::error::BoxError;
use clipsearch::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::*;

fn random_vectors(n: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect()).collect()
}

#[fixture]
fn compass() -> VectorStore<&'static str> {
    build_store(
        2,
        [("E", vec![1.0, 0.0]), ("N", vec![0.0, 1.0]), ("W", vec![-1.0, 0.0]), ("S", vec![0.0, -1.0])],
    )
    .unwrap()
}

#[fixture]
fn corpus() -> VectorStore {
    build_store(
        16,
        random_vectors(300, 16, 42)
            .into_iter()
            .enumerate()
            .map(|(i, v)| (ImagePayload::new(format!("images/{i:04}.jpg")), v)),
    )
    .unwrap()
}

fn ids<P>(hits: &[Hit<'_, P>]) -> Vec<usize> {
    hits.iter().map(|h| h.id).collect()
}

#[rstest]
fn compass_top1(compass: VectorStore<&'static str>) {
    let exact = exact_search(&compass, &[0.9, 0.1], 1).unwrap();
    assert_eq!(*exact[0].payload, "E");
    assert!((exact[0].score - 0.9939).abs() < 1e-3);

    let index = build_index(&compass, BuildParams::default()).unwrap();
    let approximate = approximate_search(&index, &[0.9, 0.1], 1, 10).unwrap();
    assert_eq!(*approximate[0].payload, "E");
}

#[test]
fn empty_store_cannot_be_indexed() {
    let store = VectorStore::<ImagePayload>::new(DEFAULT_DIMENSION).unwrap();
    assert!(matches!(build_index(&store, BuildParams::default()), Err(Error::EmptyCorpus)));
}

#[rstest]
fn wrong_query_dimension(compass: VectorStore<&'static str>) {
    assert!(matches!(
        exact_search(&compass, &[1.0, 0.0, 0.0], 1),
        Err(Error::DimensionMismatch { expected: 2, actual: 3 })
    ));
    let index = build_index(&compass, BuildParams::default()).unwrap();
    assert!(matches!(index.search(&[1.0], 1, 10), Err(Error::DimensionMismatch { .. })));
}

#[rstest]
fn zero_k_is_rejected(compass: VectorStore<&'static str>) {
    let index = build_index(&compass, BuildParams::default()).unwrap();
    assert!(matches!(exact_search(&compass, &[1.0, 0.0], 0), Err(Error::InvalidK)));
    assert!(matches!(index.search(&[1.0, 0.0], 0, 10), Err(Error::InvalidK)));
}

#[rstest]
#[case(2, 4)]
#[case(4, 16)]
#[case(16, 100)]
fn approximate_results_are_ranked(corpus: VectorStore, #[case] m: usize, #[case] ef: usize) {
    let index = build_index(&corpus, BuildParams::new(m, ef)).unwrap();
    for query in random_vectors(20, 16, 7) {
        let hits = index.search(&query, 10, 32).unwrap();
        assert!(hits.len() <= 10);
        let unique: HashSet<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(unique.len(), hits.len());
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[rstest]
#[case(2, 4)]
#[case(8, 32)]
fn full_breadth_matches_exact(corpus: VectorStore, #[case] m: usize, #[case] ef: usize) {
    let index = build_index(&corpus, BuildParams::new(m, ef)).unwrap();
    for query in random_vectors(10, 16, 11) {
        let approximate = index.search(&query, 10, corpus.len()).unwrap();
        let exact = exact_search(&corpus, &query, 10).unwrap();
        assert_eq!(ids(&approximate), ids(&exact));
    }
}

fn overlap(a: &[usize], b: &[usize]) -> usize {
    a.iter().filter(|id| b.contains(id)).count()
}

#[rstest]
#[case(2, 4)]
#[case(8, 32)]
fn overlap_never_drops_as_ef_search_grows(
    corpus: VectorStore,
    #[case] m: usize,
    #[case] ef: usize,
) {
    let index = build_index(&corpus, BuildParams::new(m, ef)).unwrap();
    for query in random_vectors(30, 16, 5) {
        let exact = ids(&exact_search(&corpus, &query, 10).unwrap());
        let mut last = 0;
        for ef_search in 10..60 {
            let approximate = ids(&index.search(&query, 10, ef_search).unwrap());
            let current = overlap(&approximate, &exact);
            assert!(current >= last, "ef_search = {ef_search}: {current} < {last}");
            last = current;
        }
    }
}

#[rstest]
fn exact_results_ignore_build_params(corpus: VectorStore) {
    let queries: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let embedder = lookup(random_vectors(10, 16, 21));
    let options = EvalOptions { k: 10, ef_search: 16 };

    let reports: Vec<_> = [BuildParams::new(2, 4), BuildParams::new(8, 32), BuildParams::default()]
        .into_iter()
        .map(|params| {
            let index = build_index(&corpus, params).unwrap();
            evaluate(&index, &corpus, &queries, &embedder, options).unwrap()
        })
        .collect();
    for report in &reports[1..] {
        for (a, b) in report.queries.iter().zip(&reports[0].queries) {
            assert_eq!(a.exact, b.exact);
        }
    }
}

#[rstest]
fn build_is_deterministic(corpus: VectorStore) {
    let params = BuildParams::new(8, 40);
    let a = build_index(&corpus, params).unwrap();
    let b = build_index(&corpus, params).unwrap();
    assert_eq!(a.graph(), b.graph());

    let query = [0.5; 16];
    assert_eq!(ids(&a.search(&query, 5, 16).unwrap()), ids(&b.search(&query, 5, 16).unwrap()));
}

#[test]
fn ties_break_by_ascending_id() {
    let store =
        build_store(2, [(0, vec![0.6, 0.8]), (1, vec![0.6, 0.8]), (2, vec![0.6, 0.8])]).unwrap();
    let hits = exact_search(&store, &[1.0, 1.0], 3).unwrap();
    assert_eq!(ids(&hits), vec![0, 1, 2]);

    let index = build_index(&store, BuildParams::default()).unwrap();
    assert_eq!(ids(&index.search(&[1.0, 1.0], 2, 1).unwrap()), vec![0, 1]);
}

#[rstest]
fn concurrent_searches_agree(corpus: VectorStore) {
    let index = build_index(&corpus, BuildParams::new(8, 40)).unwrap();
    let queries = random_vectors(16, 16, 3);
    let expected: Vec<_> = queries.iter().map(|q| ids(&index.search(q, 5, 20).unwrap())).collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = queries
            .iter()
            .map(|q| s.spawn(|| ids(&index.search(q, 5, 20).unwrap())))
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });
}

fn lookup(vectors: Vec<Vec<f32>>) -> impl Fn(&str) -> Result<Vec<f32>, BoxError> + Sync {
    move |text: &str| -> Result<Vec<f32>, BoxError> {
        let i: usize = text.parse()?;
        Ok(vectors[i].clone())
    }
}

#[rstest]
fn evaluate_k_covering_corpus_is_exact(compass: VectorStore<&'static str>) {
    let index = build_index(&compass, BuildParams::new(1, 1)).unwrap();
    let queries: Vec<String> = (0..3).map(|i| i.to_string()).collect();
    let embedder = lookup(vec![vec![0.9, 0.1], vec![-0.2, 1.0], vec![0.0, -1.0]]);

    let report =
        evaluate(&index, &compass, &queries, &embedder, EvalOptions { k: 10, ef_search: 1 })
            .unwrap();
    assert_eq!(report.k, 4);
    assert_eq!(report.mean_precision, 1.0);
    for q in &report.queries {
        assert_eq!(q.overlap, vec![0, 1, 2, 3]);
        assert_eq!(q.payloads.len(), 4);
    }
}

#[rstest]
fn evaluate_precision_bounds(corpus: VectorStore) {
    let index = build_index(&corpus, BuildParams::new(4, 8)).unwrap();
    let queries: Vec<String> = (0..25).map(|i| i.to_string()).collect();
    let embedder = lookup(random_vectors(25, 16, 99));

    let report = evaluate(&index, &corpus, &queries, &embedder, EvalOptions { k: 10, ef_search: 10 })
        .unwrap();
    assert_eq!(report.queries.len(), 25);
    for (q, name) in report.queries.iter().zip(&queries) {
        assert_eq!(&q.query, name);
        assert!((0.0..=1.0).contains(&q.precision));
        assert_eq!(q.overlap.len() as f64 / 10.0, q.precision);
        for (id, payload) in q.overlap.iter().zip(&q.payloads) {
            assert_eq!(corpus.get(*id).unwrap().payload, payload);
        }
    }
    let mean = report.queries.iter().map(|q| q.precision).sum::<f64>() / 25.0;
    assert!((report.mean_precision - mean).abs() < 1e-12);
}

#[rstest]
fn evaluate_repeated_queries_keep_their_vectors(compass: VectorStore<&'static str>) {
    let index = build_index(&compass, BuildParams::default()).unwrap();
    let queries: Vec<String> = vec!["0".into(), "1".into()];
    let embedder = lookup(vec![vec![1.0, 0.0], vec![-1.0, 0.0]]);

    let report =
        evaluate(&index, &compass, &queries, &embedder, EvalOptions { k: 1, ef_search: 8 })
            .unwrap();
    assert_eq!(report.queries[0].exact, vec![0]);
    assert_eq!(report.queries[1].exact, vec![2]);
}

#[rstest]
fn evaluate_rejects_foreign_store(compass: VectorStore<&'static str>) {
    let index = build_index(&compass, BuildParams::default()).unwrap();
    let other = compass.clone();
    let embedder = lookup(vec![vec![1.0, 0.0]]);
    let queries = vec!["0".to_string()];

    let r = evaluate(&index, &other, &queries, &embedder, EvalOptions::default());
    assert!(matches!(r, Err(Error::SnapshotMismatch)));
}

#[rstest]
fn evaluate_errors(compass: VectorStore<&'static str>) {
    let index = build_index(&compass, BuildParams::default()).unwrap();
    let embedder = lookup(vec![vec![1.0, 0.0]]);

    let r = evaluate(&index, &compass, &[], &embedder, EvalOptions::default());
    assert!(matches!(r, Err(Error::EmptyQuerySet)));

    let queries = vec!["0".to_string()];
    let r = evaluate(&index, &compass, &queries, &embedder, EvalOptions { k: 0, ef_search: 8 });
    assert!(matches!(r, Err(Error::InvalidK)));

    let queries = vec!["cat".to_string()];
    let r = evaluate(&index, &compass, &queries, &embedder, EvalOptions::default());
    assert!(matches!(r, Err(Error::Embedding { .. })));
}
