//! Retrieval pipeline: embed, rank, threshold, merge by section.

use crate::error::SearchError;
use crate::models::{RelatedChunk, ScoredFragment, SectionKey, SectionResult};
use crate::vectorstore::{descending, normalize_l2, VectorIndex};
use providers::EmbeddingProvider;
use std::collections::HashMap;
use storage::FragmentStore;
use tracing::debug;

/// Runs one query end to end.
///
/// Every indexed fragment is scored; only those scoring strictly above
/// `threshold` are kept, then grouped into sections and ranked by each
/// section's best fragment.
pub fn semantic_search(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    fragments: &FragmentStore,
    query: &str,
    threshold: f64,
) -> Result<Vec<SectionResult>, SearchError> {
    let mut vector = embedder.embed(query)?;
    if vector.len() != index.dimension() {
        return Err(SearchError::DimensionMismatch {
            expected: index.dimension(),
            actual: vector.len(),
        });
    }
    normalize_l2(&mut vector);

    let ranked = index.search(&vector);
    let total = ranked.len();
    let hits = filter_hits(ranked, threshold);
    let scored = resolve(hits, fragments)?;
    let survivors = scored.len();
    let best_row = scored.first().map(|s| s.id);
    let sections = merge_sections(scored);
    debug!(
        query_chars = query.chars().count(),
        threshold,
        total,
        survivors,
        best_row = ?best_row,
        sections = sections.len(),
        "search complete"
    );
    Ok(sections)
}

/// Keeps hits scoring strictly above `threshold`, preserving rank order.
///
/// Scores are widened to `f64` before comparing so a threshold such as `0.6`
/// is not rounded to the nearest `f32` first.
pub fn filter_hits(hits: Vec<(usize, f32)>, threshold: f64) -> Vec<(usize, f32)> {
    hits.into_iter()
        .filter(|(_, score)| f64::from(*score) > threshold)
        .collect()
}

fn resolve(
    hits: Vec<(usize, f32)>,
    fragments: &FragmentStore,
) -> Result<Vec<ScoredFragment<'_>>, SearchError> {
    hits.into_iter()
        .map(|(id, score)| {
            fragments
                .get(id)
                .map(|fragment| ScoredFragment {
                    id,
                    score,
                    fragment,
                })
                .map_err(SearchError::Consistency)
        })
        .collect()
}

struct SectionAccumulator {
    key: SectionKey,
    page_number: Option<i64>,
    content: String,
    chunks: Vec<RelatedChunk>,
}

impl SectionAccumulator {
    fn new(key: SectionKey) -> Self {
        Self {
            key,
            page_number: None,
            content: String::new(),
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, scored: &ScoredFragment<'_>) {
        let fragment = scored.fragment;
        // first non-null page wins
        if self.page_number.is_none() {
            self.page_number = fragment.page_number;
        }
        self.content.push_str(&fragment.content);
        self.content.push('\n');
        self.chunks.push(RelatedChunk {
            chunk_id: fragment.chunk_id.clone(),
            score: scored.score,
            content: fragment.content.clone(),
        });
    }

    fn finish(self) -> SectionResult {
        SectionResult {
            header: self.key.header,
            secondary_header: self.key.secondary_header,
            sub_header: self.key.sub_header,
            page_number: self.page_number,
            content: self.content.trim().to_string(),
            related_chunks: self.chunks,
        }
    }
}

/// Groups ranked fragments by section key and orders the sections.
///
/// Sections appear in the order their first fragment was seen, fragments
/// within a section keep their incoming order, and the final list is
/// stably sorted by each section's highest score.
pub fn merge_sections(scored: Vec<ScoredFragment<'_>>) -> Vec<SectionResult> {
    let mut slots: HashMap<SectionKey, usize> = HashMap::new();
    let mut groups: Vec<SectionAccumulator> = Vec::new();

    for s in &scored {
        let key = SectionKey::of(s.fragment);
        let slot = *slots.entry(key).or_insert_with_key(|k| {
            groups.push(SectionAccumulator::new(k.clone()));
            groups.len() - 1
        });
        groups[slot].push(s);
    }

    let mut sections: Vec<SectionResult> =
        groups.into_iter().map(SectionAccumulator::finish).collect();
    sections.sort_by(|a, b| descending(a.top_score(), b.top_score()));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorstore::FlatIndex;
    use providers::ProviderError;
    use storage::models::{ChunkId, Fragment};

    fn frag(id: i64, keys: (&str, &str, &str), page: Option<i64>, content: &str) -> Fragment {
        Fragment {
            chunk_id: ChunkId::Int(id),
            header: keys.0.to_string(),
            secondary_header: keys.1.to_string(),
            sub_header: keys.2.to_string(),
            page_number: page,
            content: content.to_string(),
        }
    }

    fn scored<'a>(fragments: &'a [Fragment], scores: &[f32]) -> Vec<ScoredFragment<'a>> {
        fragments
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(id, (fragment, score))| ScoredFragment {
                id,
                score: *score,
                fragment,
            })
            .collect()
    }

    #[test]
    fn single_fragment_section() {
        let fragments = vec![frag(7, ("Intro", "", ""), Some(3), "  Welcome to the guide.\n")];
        let out = merge_sections(scored(&fragments, &[0.9]));
        assert_eq!(
            out,
            vec![SectionResult {
                header: "Intro".into(),
                secondary_header: "".into(),
                sub_header: "".into(),
                page_number: Some(3),
                content: "Welcome to the guide.".into(),
                related_chunks: vec![RelatedChunk {
                    chunk_id: ChunkId::Int(7),
                    score: 0.9,
                    content: "  Welcome to the guide.\n".into(),
                }],
            }]
        );
    }

    #[test]
    fn shared_key_joins_in_arrival_order() {
        let key = ("Setup", "Power", "");
        let fragments = vec![
            frag(1, key, Some(4), "first part"),
            frag(2, key, Some(5), "second part"),
        ];
        let out = merge_sections(scored(&fragments, &[0.8, 0.95]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "first part\nsecond part");
        assert_eq!(out[0].top_score(), 0.95);
        let ids: Vec<ChunkId> = out[0]
            .related_chunks
            .iter()
            .map(|c| c.chunk_id.clone())
            .collect();
        assert_eq!(ids, vec![ChunkId::Int(1), ChunkId::Int(2)]);
    }

    #[test]
    fn first_non_null_page_wins() {
        let key = ("A", "", "");
        let fragments = vec![
            frag(1, key, None, "a"),
            frag(2, key, Some(9), "b"),
            frag(3, key, Some(2), "c"),
        ];
        let out = merge_sections(scored(&fragments, &[0.9, 0.8, 0.7]));
        assert_eq!(out[0].page_number, Some(9));

        let fragments = vec![frag(1, key, None, "a"), frag(2, key, None, "b")];
        let out = merge_sections(scored(&fragments, &[0.9, 0.8]));
        assert_eq!(out[0].page_number, None);
    }

    #[test]
    fn empty_components_are_distinct_keys() {
        let fragments = vec![
            frag(1, ("A", "", ""), None, "x"),
            frag(2, ("A", "B", ""), None, "y"),
            frag(3, ("A", "", "B"), None, "z"),
            frag(4, ("A", "", ""), None, "w"),
        ];
        let out = merge_sections(scored(&fragments, &[0.9, 0.85, 0.8, 0.75]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].key().secondary_header, "");
        assert_eq!(out[0].key().sub_header, "");
        assert_eq!(out[0].related_chunks.len(), 2);
        assert_eq!(out[0].content, "x\nw");
    }

    #[test]
    fn sections_rank_by_best_fragment() {
        // "many" has several middling fragments, "one" has a single strong one
        let fragments = vec![
            frag(1, ("many", "", ""), None, "m1"),
            frag(2, ("one", "", ""), None, "o1"),
            frag(3, ("many", "", ""), None, "m2"),
            frag(4, ("many", "", ""), None, "m3"),
        ];
        let out = merge_sections(scored(&fragments, &[0.7, 0.99, 0.69, 0.68]));
        let headers: Vec<&str> = out.iter().map(|s| s.header.as_str()).collect();
        assert_eq!(headers, vec!["one", "many"]);
    }

    #[test]
    fn tied_sections_keep_first_appearance() {
        let fragments = vec![
            frag(1, ("b", "", ""), None, "b"),
            frag(2, ("a", "", ""), None, "a"),
            frag(3, ("c", "", ""), None, "c"),
        ];
        let out = merge_sections(scored(&fragments, &[0.8, 0.8, 0.9]));
        let headers: Vec<&str> = out.iter().map(|s| s.header.as_str()).collect();
        assert_eq!(headers, vec!["c", "b", "a"]);
    }

    #[test]
    fn filter_is_exclusive() {
        let hits = vec![(0, 0.9), (1, 0.5), (2, 0.49)];
        assert_eq!(filter_hits(hits, 0.5), vec![(0, 0.9)]);
        assert!(filter_hits(vec![(0, 0.99)], 1.0).is_empty());
        assert!(filter_hits(vec![(0, 1.0)], 1.0).is_empty());
    }

    #[test]
    fn threshold_is_compared_in_double_precision() {
        // 0.6_f32 widens to 0.6000000238..., which is above the f64 0.6
        assert_eq!(filter_hits(vec![(0, 0.6_f32)], 0.6), vec![(0, 0.6_f32)]);
        assert!(filter_hits(vec![(0, 0.6_f32)], f64::from(0.6_f32)).is_empty());
        let below = f32::from_bits(0.6_f32.to_bits() - 1);
        assert!(filter_hits(vec![(0, below)], 0.6).is_empty());
    }

    struct Fixed(Vec<f32>);

    impl EmbeddingProvider for Fixed {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(self.0.clone())
        }

        fn dimension(&self) -> Option<usize> {
            Some(self.0.len())
        }
    }

    fn corpus() -> (FlatIndex, FragmentStore) {
        let rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7, 0.7, 0.0],
            vec![0.5, 0.0, 0.5],
            vec![0.0, 0.0, 1.0],
        ];
        let fragments = vec![
            frag(0, ("Intro", "", ""), Some(1), "alpha"),
            frag(1, ("Intro", "", ""), None, "beta"),
            frag(2, ("Setup", "Power", ""), Some(2), "gamma"),
            frag(3, ("Setup", "Power", ""), Some(3), "delta"),
            frag(4, ("Usage", "", "Tips"), Some(4), "epsilon"),
            frag(5, ("Usage", "", ""), Some(5), "zeta"),
        ];
        (
            FlatIndex::new(3, rows).unwrap(),
            FragmentStore::new(fragments),
        )
    }

    #[test]
    fn pipeline_invariants_hold_across_thresholds() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![2.0, 0.5, 0.1]);
        let thresholds = [-1.0, 0.0, 0.3, 0.6, 0.9, 1.0];
        let mut previous: Option<Vec<SectionResult>> = None;

        for t in thresholds {
            let out = semantic_search(&embedder, &index, &store, "q", t).unwrap();
            for section in &out {
                assert!(!section.related_chunks.is_empty());
                assert!(section.related_chunks.iter().all(|c| f64::from(c.score) > t));
                let key = section.key();
                for chunk in &section.related_chunks {
                    let row = match chunk.chunk_id {
                        ChunkId::Int(n) => n as usize,
                        ChunkId::Text(_) => unreachable!(),
                    };
                    assert_eq!(SectionKey::of(store.get(row).unwrap()), key);
                }
            }
            for pair in out.windows(2) {
                assert!(pair[0].top_score() >= pair[1].top_score());
            }
            if let Some(prev) = &previous {
                // every chunk kept at the higher threshold was kept before
                for section in &out {
                    let before = prev.iter().find(|s| s.key() == section.key()).unwrap();
                    for chunk in &section.related_chunks {
                        assert!(before.related_chunks.contains(chunk));
                    }
                }
            }
            previous = Some(out);
        }
    }

    #[test]
    fn pipeline_is_idempotent() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![0.3, 0.3, 0.3]);
        let a = semantic_search(&embedder, &index, &store, "q", 0.2).unwrap();
        let b = semantic_search(&embedder, &index, &store, "q", 0.2).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn exact_match_scores_one_and_leads() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![0.0, 0.0, 4.0]);
        let out = semantic_search(&embedder, &index, &store, "q", 0.6).unwrap();
        assert_eq!(out[0].key(), SectionKey::of(store.get(5).unwrap()));
        assert!((out[0].related_chunks[0].score - 1.0).abs() < 1e-6);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].header, "Usage");
        assert_eq!(out[1].sub_header, "Tips");
    }

    #[test]
    fn perfect_threshold_returns_nothing() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![0.2, 0.9, 0.4]);
        let out = semantic_search(&embedder, &index, &store, "q", 1.0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_query_vector_yields_nothing() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![0.0, 0.0, 0.0]);
        let out = semantic_search(&embedder, &index, &store, "", 0.6).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let (index, store) = corpus();
        let embedder = Fixed(vec![1.0, 0.0]);
        match semantic_search(&embedder, &index, &store, "q", 0.0) {
            Err(SearchError::DimensionMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_fragment_is_a_consistency_error() {
        let (index, _) = corpus();
        let short = FragmentStore::new(vec![frag(0, ("Intro", "", ""), None, "alpha")]);
        let embedder = Fixed(vec![0.0, 1.0, 0.0]);
        assert!(matches!(
            semantic_search(&embedder, &index, &short, "q", 0.5),
            Err(SearchError::Consistency(_))
        ));
    }
}
