mod util;
use line_sieve::algs::validator::ORIG_ID;
use line_sieve::prelude::*;
use proptest::prelude::*;
use util::*;

fn planned(s: &LineStore, kept: u64, donor: u64) -> Plan {
    ConflationSweep::default()
        .plan_pair(s, lid(kept), lid(donor))
        .expect("plan")
}

#[test]
fn identical_lines_merge_to_the_kept_line() {
    let mut s = track_store(4);
    add_line(&mut s, 1, &[1, 2, 3]);
    add_line(&mut s, 2, &[1, 2, 3]);

    let report = ConflationSweep::default().run(&mut s);
    assert_eq!(report.merged(), 1);
    assert_eq!(ids(&s, 1), vec![1, 2, 3]);
    assert!(is_deleted(&s, 2));
    assert!(!is_deleted(&s, 1));
}

#[test]
fn reversed_duplicate_keeps_orientation_and_extends_tail() {
    let mut s = track_store(5);
    add_line(&mut s, 1, &[1, 2, 3]);
    add_line(&mut s, 2, &[104, 103, 102, 101]);

    let Plan::Merge(op) = planned(&s, 1, 2) else {
        panic!("expected a merge");
    };
    assert_eq!(op.direction(), Direction::Reversed);
    assert_eq!(op.correspondence().len(), 3);

    let report = ConflationSweep::default().run(&mut s);
    assert_eq!(report.merged(), 1);
    assert_eq!(ids(&s, 1), vec![1, 2, 3, 104]);
    assert!(is_deleted(&s, 2));
}

#[test]
fn exact_reversed_copy_leaves_kept_geometry() {
    let mut s = track_store(3);
    add_line(&mut s, 1, &[1, 2, 3]);
    add_line(&mut s, 2, &[103, 102, 101]);

    let op = ConflationSweep::default()
        .try_merge(&mut s, lid(1), lid(2))
        .unwrap()
        .unwrap();
    assert_eq!(op.direction(), Direction::Reversed);
    assert_eq!(ids(&s, 1), vec![1, 2, 3]);
    assert!(is_deleted(&s, 2));
}

#[test]
fn donor_head_and_tail_wrap_the_kept_line() {
    let mut s = track_store(7);
    add_line(&mut s, 1, &[3, 4, 5]);
    add_line(&mut s, 2, &[101, 102, 103, 104, 105, 106, 107]);

    ConflationSweep::default().run(&mut s);
    assert_eq!(ids(&s, 1), vec![101, 102, 3, 4, 5, 106, 107]);
}

#[test]
fn ambiguous_match_is_rejected_and_nothing_changes() {
    let mut s = track_store(3);
    // 201 sits on top of 1, so vertex 1 matches twice on line 2.
    s.add_vertex(vid(201), track(1), Tags::new()).unwrap();
    add_line(&mut s, 1, &[1, 2]);
    add_line(&mut s, 2, &[101, 201, 102]);
    let before = snapshot(&s);

    assert!(matches!(planned(&s, 1, 2), Plan::Rejected(RejectReason::Ambiguous)));
    let report = ConflationSweep::default().run(&mut s);
    assert_eq!(report.merged(), 0);
    assert_eq!(report.rejected.get(&RejectReason::Ambiguous), Some(&2));
    assert_eq!(snapshot(&s), before);
}

#[test]
fn gap_in_matched_indices_is_non_contiguous() {
    let mut s = track_store(3);
    add_line(&mut s, 1, &[1, 2, 3]);
    add_line(&mut s, 2, &[101, 103]);

    assert!(matches!(planned(&s, 1, 2), Plan::Rejected(RejectReason::NonContiguous)));
    assert!(matches!(planned(&s, 2, 1), Plan::Rejected(RejectReason::NonContiguous)));
}

#[test]
fn interior_single_touch_is_indeterminate() {
    let mut s = track_store(3);
    s.add_vertex(vid(50), LatLon::new(0.001, 2.0 * STEP), Tags::new())
        .unwrap();
    add_line(&mut s, 1, &[1, 2, 3]);
    // A side road leaving from the middle of line 1.
    add_line(&mut s, 2, &[102, 50]);

    assert!(matches!(
        planned(&s, 1, 2),
        Plan::Rejected(RejectReason::IndeterminateDirection)
    ));
}

#[test]
fn zero_overlap_with_shared_origin_concatenates() {
    let mut s = track_store(4);
    let tags = format!("{ORIG_ID}=77");
    add_line_tagged(&mut s, 1, &[1, 2], &tags);
    add_line_tagged(&mut s, 2, &[103, 104], &tags);
    add_line(&mut s, 3, &[3, 4]);

    let sweep = ConflationSweep::default();
    assert!(matches!(
        sweep.try_merge(&mut s, lid(1), lid(3)),
        Ok(Err(RejectReason::NoOverlap))
    ));
    let op = sweep.try_merge(&mut s, lid(1), lid(2)).unwrap().unwrap();
    assert!(op.correspondence().is_empty());
    assert_eq!(ids(&s, 1), vec![1, 2, 103, 104]);
    assert!(is_deleted(&s, 2));
}

#[test]
fn deleted_vertex_in_a_match_is_an_error() {
    let mut s = track_store(3);
    add_line(&mut s, 1, &[1, 2, 3]);
    add_line(&mut s, 2, &[101, 102, 103]);
    s.set_vertex_deleted(vid(102), true).unwrap();

    let err = ConflationSweep::default()
        .plan_pair(&s, lid(1), lid(2))
        .unwrap_err();
    assert_eq!(
        err,
        ConflateError::DeletedVertexInMatch {
            line: lid(2),
            vertex: vid(102)
        }
    );

    let report = ConflationSweep::default().run(&mut s);
    assert_eq!(report.merged(), 0);
    assert_eq!(report.errors.len(), 2);
    assert!(!is_deleted(&s, 2));
}

#[test]
fn self_merge_is_refused() {
    let mut s = track_store(2);
    add_line(&mut s, 1, &[1, 2]);
    let err = ConflationSweep::default()
        .plan_pair(&s, lid(1), lid(1))
        .unwrap_err();
    assert_eq!(err, ConflateError::SelfMerge(lid(1)));
}

proptest! {
    /// Two overlapping windows of the same track, from two sources.
    #[test]
    fn merge_covers_union_and_undo_restores(
        a0 in 0u64..6,
        la in 2u64..6,
        b0 in 0u64..6,
        lb in 2u64..6,
        reversed in any::<bool>(),
    ) {
        let (a1, b1) = (a0 + la, b0 + lb);
        prop_assume!(a0 < b1 && b0 < a1);

        let mut s = track_store(12);
        let kept: Vec<u64> = (a0 + 1..=a1).collect();
        let mut donor: Vec<u64> = (b0 + 1..=b1).map(|i| TWIN + i).collect();
        if reversed {
            donor.reverse();
        }
        add_line(&mut s, 1, &kept);
        add_line(&mut s, 2, &donor);
        let before = snapshot(&s);

        let mut op = ConflationSweep::default()
            .try_merge(&mut s, lid(1), lid(2))
            .unwrap()
            .unwrap();
        let span = (a1.max(b1) - a0.min(b0)) as usize;
        prop_assert_eq!(s.line(lid(1)).unwrap().len(), span);
        prop_assert!(is_deleted(&s, 2));
        prop_assert_eq!(op.direction() == Direction::Reversed, reversed);

        op.undo(&mut s).unwrap();
        prop_assert_eq!(snapshot(&s), before);
        s.validate_invariants().unwrap();
    }
}
