//! Property tests for detection, partitioning and reference-line editing.

use plateau::{partition, EditOutcome, JumpDetector, ReferenceLineController, ZoneWidths};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Piecewise-flat series with noise, so detection has something to find.
fn arb_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1usize..30, -50.0f64..50.0, 0.0f64..0.5), 1..8).prop_flat_map(
        |segments| {
            let len: usize = segments.iter().map(|(n, _, _)| n).sum();
            prop::collection::vec(-1.0f64..1.0, len).prop_map(move |noise| {
                let mut values = Vec::with_capacity(noise.len());
                for &(n, level, scale) in &segments {
                    let offset = values.len();
                    values.extend(noise[offset..offset + n].iter().map(|e| level + e * scale));
                }
                values
            })
        },
    )
}

fn arb_transitions(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..len, 0..10)
}

proptest! {
    #[test]
    fn detect_is_ascending_and_spaced(
        values in arb_series(),
        window in 1usize..12,
        threshold in 0.0f64..20.0,
    ) {
        let detected = JumpDetector::new(window, threshold).unwrap().detect(&values);
        for pair in detected.windows(2) {
            prop_assert!(pair[1] > pair[0] + window);
        }
        for &i in &detected {
            prop_assert!(i + 1 >= window && i < values.len());
        }
    }

    #[test]
    fn partition_is_ordered_and_in_bounds(
        (len, transitions) in (1usize..200).prop_flat_map(|n| (Just(n), arb_transitions(n))),
        left in 0usize..15,
        right in 0usize..15,
    ) {
        let intervals = partition(&transitions, ZoneWidths::new(left, right), len);
        prop_assert!(!intervals.is_empty());
        for iv in &intervals {
            prop_assert!(iv.start <= iv.end);
            prop_assert!(iv.end < len);
        }
        for pair in intervals.windows(2) {
            // Zero-width zones let neighbours share the transition sample.
            if left >= 1 && right >= 1 && len >= 2 {
                prop_assert!(pair[0].end < pair[1].start);
            } else {
                prop_assert!(pair[0].end <= pair[1].start);
            }
            prop_assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn set_all_twice_notifies_once(
        (len, transitions) in (1usize..200).prop_flat_map(|n| (Just(n), arb_transitions(n))),
    ) {
        let mut controller = ReferenceLineController::new("p", len, ZoneWidths::new(2, 3));
        let rx = controller.subscribe();
        let first = controller.set_all(&transitions);
        let second = controller.set_all(&transitions);
        prop_assert_eq!(second, EditOutcome::Unchanged);
        let expected = usize::from(first == EditOutcome::Applied);
        prop_assert_eq!(rx.try_iter().count(), expected);
    }

    #[test]
    fn add_then_delete_restores(
        (len, transitions, index) in (1usize..200).prop_flat_map(|n| {
            (Just(n), arb_transitions(n), 0..n)
        }),
    ) {
        prop_assume!(!transitions.contains(&index));
        let mut controller = ReferenceLineController::new("p", len, ZoneWidths::new(1, 4));
        let _ = controller.set_all(&transitions);
        let before = (controller.transitions(), controller.intervals().to_vec());

        prop_assert_eq!(controller.add(index), EditOutcome::Applied);
        prop_assert_eq!(controller.delete(index), EditOutcome::Applied);
        prop_assert_eq!((controller.transitions(), controller.intervals().to_vec()), before);
    }

    #[test]
    fn edge_transitions_stay_in_bounds(
        len in 1usize..100,
        left in 0usize..120,
        right in 0usize..120,
    ) {
        let zones = ZoneWidths::new(left, right);
        for transitions in [vec![0], vec![len - 1], vec![0, len - 1]] {
            for iv in partition(&transitions, zones, len) {
                prop_assert!(iv.start <= iv.end && iv.end < len);
            }
        }
    }
}
