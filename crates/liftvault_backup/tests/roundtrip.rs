//! Property tests: a consistent graph survives encode, decode and link.

use liftvault_backup::link;
use liftvault_codec::{decode, encode, SnapshotHeader};
use liftvault_testkit::graph_strategy;
use proptest::prelude::*;
use uuid::Uuid;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn linked_graph_matches_source(graph in graph_strategy()) {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1_700_000_000_000);
        let records = encode(&graph, &header);
        prop_assert_eq!(records.len() as u64, graph.counts().total());

        let partial = decode(&records);
        prop_assert!(partial.failures.is_empty());
        prop_assert_eq!(partial.unknown_kinds, 0);

        let linked = link(&partial);
        prop_assert!(linked.warnings.is_empty(), "warnings: {:?}", linked.warnings);
        prop_assert_eq!(linked.graph, graph);
    }

    #[test]
    fn dropping_records_never_panics(graph in graph_strategy(), keep in any::<u64>()) {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1);
        let records: Vec<_> = encode(&graph, &header)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep >> (i % 64) & 1 == 1)
            .map(|(_, r)| r)
            .collect();

        let linked = link(&decode(&records));
        prop_assert_eq!(linked.graph.counts().total(), records.len() as u64);
        prop_assert!(linked.graph.counts().total() <= graph.counts().total());
    }
}
