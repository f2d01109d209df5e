//! Property tests for registry operation sequences and the payload codec

mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{open_coordinator, RecordingApp};
use fedlink_core::compression::{self, CompressionConfig, CompressionLevel};
use fedlink_core::WorkerId;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u8, bool),
    Remove(u8),
    SetActive(u8, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6, any::<bool>()).prop_map(|(id, active)| Op::Add(id, active)),
        (0u8..6).prop_map(Op::Remove),
        (0u8..6, any::<bool>()).prop_map(|(id, active)| Op::SetActive(id, active)),
    ]
}

fn name(id: u8) -> String {
    format!("worker-{}", id)
}

proptest! {
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(op(), 0..60)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let app = RecordingApp::new();
            let coordinator = open_coordinator(app.clone());
            // id -> active
            let mut model: BTreeMap<String, bool> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Add(id, active) => {
                        let result = coordinator.admin_add(WorkerId::from(name(id)), active).await;
                        prop_assert_eq!(result.is_ok(), !model.contains_key(&name(id)));
                        model.entry(name(id)).or_insert(active);
                    }
                    Op::Remove(id) => {
                        let was_known = coordinator.admin_remove(&name(id)).await;
                        prop_assert_eq!(was_known, model.remove(&name(id)).is_some());
                    }
                    Op::SetActive(id, active) => {
                        let result = coordinator.admin_set_active(&name(id), active).await;
                        match model.get_mut(&name(id)) {
                            Some(state) => {
                                prop_assert!(result.is_ok());
                                *state = active;
                            }
                            None => prop_assert!(result.is_err()),
                        }
                    }
                }
                prop_assert!(coordinator.registry().invariants_hold());
            }

            let listed: BTreeMap<String, bool> = coordinator
                .admin_list()
                .into_iter()
                .map(|e| (e.worker_id.into_string(), e.active))
                .collect();
            prop_assert_eq!(&listed, &model);

            let active: BTreeSet<_> = model.iter().filter(|(_, a)| **a).map(|(k, _)| k.clone()).collect();
            for id in &active {
                prop_assert!(coordinator.query_status(id).await.is_ok());
            }

            // Each worker's joins exceed its leaves by one exactly when it ends active
            for i in 0u8..6 {
                let id = name(i);
                let joined = app.joined_count(&id);
                let left = app.left_count(&id);
                prop_assert_eq!(joined, left + usize::from(active.contains(&id)));
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_compression_round_trip(data in prop::collection::vec(any::<u8>(), 0..4096), level in 0u32..10) {
        let config = CompressionConfig {
            level: CompressionLevel::new(level).unwrap(),
            ..Default::default()
        };
        let compressed = compression::compress(&data, &config).unwrap();
        let restored = compression::decompress(&compressed, &config).unwrap();
        prop_assert_eq!(restored.as_ref(), data.as_slice());
    }
}
