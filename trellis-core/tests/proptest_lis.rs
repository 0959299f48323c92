//! Property-based tests for list reconciliation.
//!
//! # Invariants tested
//!
//! 1. **LIS shape**: the returned positions are strictly increasing, index
//!    strictly increasing values, and skip `None` entries.
//! 2. **LIS optimality**: the length matches a quadratic reference.
//! 3. **Minimal moves**: after any reorder, `moved == reused - LIS(reused)`.
//! 4. **Order**: the host tree always shows the new order.
//! 5. **Accounting**: `reused + removed` equals the old length and
//!    `reused + created` equals the new length.

use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;
use trellis_core::dom::{Host, ManualFrames, MemoryDom};
use trellis_core::reactive::Runtime;
use trellis_core::reconcile::{
    bind_for, expression, longest_increasing_subsequence, template, ForBinding, Scope,
};

// ── Helpers ───────────────────────────────────────────────────────────────

/// O(n²) longest strictly increasing subsequence length over the `Some`s.
fn reference_lis_len(sequence: &[Option<usize>]) -> usize {
    let values: Vec<usize> = sequence.iter().flatten().copied().collect();
    let mut best = vec![1usize; values.len()];
    for i in 0..values.len() {
        for j in 0..i {
            if values[j] < values[i] {
                best[i] = best[i].max(best[j] + 1);
            }
        }
    }
    best.into_iter().max().unwrap_or(0)
}

/// Old list `0..n`, then a new list made of a random subset of it plus
/// `extra` fresh ids, in random order.
fn reorder_strategy() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
    (0usize..16, 0usize..5).prop_flat_map(|(n, extra)| {
        (
            prop::collection::vec(any::<bool>(), n),
            prop::collection::vec(any::<u32>(), n + extra),
        )
            .prop_map(move |(keep, order)| {
                let old: Vec<u32> = (0..n as u32).collect();
                let mut next: Vec<(u32, u32)> = old
                    .iter()
                    .zip(&keep)
                    .filter(|(_, &k)| k)
                    .map(|(&id, _)| (order[id as usize], id))
                    .collect();
                for j in 0..extra {
                    next.push((order[n + j], 100 + j as u32));
                }
                next.sort();
                (old, next.into_iter().map(|(_, id)| id).collect())
            })
    })
}

fn render(ids: &[u32]) -> String {
    ids.iter().map(|id| format!("{id},")).collect()
}

// ── LIS ───────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn lis_is_increasing_and_optimal(
        sequence in prop::collection::vec(prop::option::weighted(0.8, 0usize..50), 0..40)
    ) {
        let positions = longest_increasing_subsequence(&sequence);

        for &p in &positions {
            prop_assert!(sequence[p].is_some());
        }
        for pair in positions.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert!(sequence[pair[0]] < sequence[pair[1]]);
        }
        prop_assert_eq!(positions.len(), reference_lis_len(&sequence));
    }

    #[test]
    fn reconcile_moves_only_outside_the_lis((old, next) in reorder_strategy()) {
        let frames = ManualFrames::new();
        let rt = Runtime::new(frames.clone());
        let dom = MemoryDom::new();
        let anchor = dom.create_comment("for");
        dom.append_child(dom.root(), anchor);

        let list = rt.wrap(json!(old));
        let source = list.clone();
        let d = dom.clone();
        let binding = ForBinding::new(
            "id",
            expression(move |_| Ok(source.clone())),
            template(move |scope| {
                Ok(vec![d.create_text(&format!("{},", scope.lookup("id")?.to_display_string()))])
            }),
        );
        let handle = bind_for(&rt, dom.clone() as Rc<dyn Host>, anchor, &Scope::new(), binding);
        prop_assert_eq!(dom.text_content(dom.root()), render(&old));

        let items = list.as_object().cloned().unwrap();
        items.splice(0, old.len(), next.iter().map(|&id| f64::from(id)).collect()).unwrap();
        frames.tick();
        prop_assert_eq!(dom.text_content(dom.root()), render(&next));

        if next != old {
            let previous: Vec<Option<usize>> = next
                .iter()
                .map(|id| old.iter().position(|o| o == id))
                .collect();
            let kept = previous.iter().flatten().count();
            let lis = reference_lis_len(&previous);

            let report = handle.last_report();
            prop_assert_eq!(report.reused, kept);
            prop_assert_eq!(report.created, next.len() - kept);
            prop_assert_eq!(report.removed, old.len() - kept);
            prop_assert_eq!(report.moved, kept - lis);
        }
    }
}
