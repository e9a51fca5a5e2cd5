use std::collections::BTreeSet;

use proptest::prelude::*;
use wvht_core::{
    bucket_for, BuildOptions, BuildStrategy, Comparison, IndexBuilder, IndexOptions, IndexReader,
    Similarity, VisitedLines, WordVectors,
};

proptest! {
    #[test]
    fn hash_is_stable_and_in_range(key in "\\PC{0,40}", table_size in 1usize..100_000) {
        let bucket = bucket_for(&key, table_size);
        prop_assert!(bucket < table_size);
        prop_assert_eq!(bucket, bucket_for(&key, table_size));
    }

    #[test]
    fn visited_contains_exactly_inserted(lines in prop::collection::vec(0u32..5_000, 0..200), candidate in 0u32..5_000) {
        let mut visited = VisitedLines::new();
        let mut expected = BTreeSet::new();
        for line in &lines {
            prop_assert_eq!(visited.insert(*line), expected.insert(*line));
        }
        prop_assert_eq!(visited.contains(candidate), expected.contains(&candidate));
        prop_assert_eq!(visited.len() as usize, expected.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn persisted_similarity_matches_raw(
        records in records(),
        table_size in 1usize..16,
        pick in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
        spill in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("vectors.txt");
        let contents: String = records
            .iter()
            .map(|(key, v)| format!("{key} {} {} {}\n", v[0], v[1], v[2]))
            .collect();
        std::fs::write(&dataset, contents).unwrap();

        let build = BuildOptions {
            strategy: if spill { BuildStrategy::Spill { partitions: 3 } } else { BuildStrategy::Rescan },
            ..BuildOptions::default()
        };
        let out = dir.path().join("table.csv");
        IndexBuilder::new(&dataset, IndexOptions::default().with_table_size(table_size), build)
            .unwrap()
            .build(&out)
            .unwrap();
        let mut reader = IndexReader::open(&out).unwrap();

        let (a, b) = (pick.0.get(&records), pick.1.get(&records));
        let expected = Similarity::between(&a.1, &b.1);
        prop_assert_eq!(reader.compare(&a.0, &b.0).unwrap(), Comparison::Similar(expected));
    }
}

fn records() -> impl Strategy<Value = Vec<(String, [f32; 3])>> {
    prop::collection::btree_map("[a-z]{1,12}", prop::array::uniform3(-100.0f32..100.0), 1..40)
        .prop_map(|map| map.into_iter().collect())
}
