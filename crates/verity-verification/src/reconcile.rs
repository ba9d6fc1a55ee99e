//! Approval reconciliation
//!
//! A letter may carry direct approvals, committee approvals or both. The
//! authoritative one is the latest of each list, and across the lists the
//! committee wins ties. Entries without a timestamp sort before any entry
//! with one.

use verity_core::{Approval, CommitteeApproval, DirectApproval, Timestamp};

/// Latest entry of `items` by `time`; on equal times the later entry wins
fn latest_by<T>(items: &[T], time: impl Fn(&T) -> Option<Timestamp>) -> Option<&T> {
    items.iter().fold(None, |best, current| match best {
        Some(best) if time(current) < time(best) => Some(best),
        _ => Some(current),
    })
}

/// Select the authoritative approval
pub fn reconcile(direct: &[DirectApproval], committee: &[CommitteeApproval]) -> Option<Approval> {
    let direct = latest_by(direct, |a| a.approved_at);
    let committee = latest_by(committee, |a| a.approved_at);

    match (direct, committee) {
        (None, None) => None,
        (Some(direct), None) => Some(Approval::Direct(direct.clone())),
        (None, Some(committee)) => Some(Approval::Committee(committee.clone())),
        (Some(direct), Some(committee)) => {
            if committee.approved_at >= direct.approved_at {
                Some(Approval::Committee(committee.clone()))
            } else {
                Some(Approval::Direct(direct.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use verity_core::ApprovalVia;
    use verity_testkit::strategies::{arb_committee_approvals, arb_direct_approvals};
    use verity_testkit::{at, committee_approval, direct_approval};

    #[test]
    fn test_both_empty_yields_none() {
        assert_eq!(reconcile(&[], &[]), None);
    }

    #[test]
    fn test_equal_times_committee_wins() {
        let direct = [direct_approval("l", "a1", Some(at(100)))];
        let committee = [committee_approval("l", "c1", Some(at(100)))];

        let approval = reconcile(&direct, &committee).unwrap();
        assert_eq!(approval.via(), ApprovalVia::Committee);
        assert_eq!(approval.approver_id().as_str(), "c1");
        assert_eq!(approval.committee_id().map(|c| c.as_str()), Some("committee-1"));
    }

    #[test]
    fn test_later_direct_beats_earlier_committee() {
        let direct = [direct_approval("l", "a1", Some(at(200)))];
        let committee = [committee_approval("l", "c1", Some(at(100)))];

        let approval = reconcile(&direct, &committee).unwrap();
        assert_eq!(approval.via(), ApprovalVia::Approver);
        assert_eq!(approval.committee_id(), None);
    }

    #[test]
    fn test_latest_within_list_wins() {
        let direct = [
            direct_approval("l", "a1", Some(at(300))),
            direct_approval("l", "a2", Some(at(100))),
            direct_approval("l", "a3", Some(at(200))),
        ];
        let approval = reconcile(&direct, &[]).unwrap();
        assert_eq!(approval.approver_id().as_str(), "a1");
    }

    #[test]
    fn test_tie_within_list_goes_to_later_entry() {
        let direct = [
            direct_approval("l", "a1", Some(at(100))),
            direct_approval("l", "a2", Some(at(100))),
        ];
        let approval = reconcile(&direct, &[]).unwrap();
        assert_eq!(approval.approver_id().as_str(), "a2");
    }

    #[test]
    fn test_missing_timestamps_sort_first() {
        let direct = [
            direct_approval("l", "timed", Some(at(1))),
            direct_approval("l", "untimed", None),
        ];
        assert_eq!(reconcile(&direct, &[]).unwrap().approver_id().as_str(), "timed");

        let committee = [committee_approval("l", "c1", None)];
        let approval = reconcile(&direct, &committee).unwrap();
        assert_eq!(approval.via(), ApprovalVia::Approver);

        let untimed_direct = [direct_approval("l", "a1", None)];
        let approval = reconcile(&untimed_direct, &committee).unwrap();
        assert_eq!(approval.via(), ApprovalVia::Committee);
    }

    proptest! {
        #[test]
        fn selected_approval_is_never_older_than_any_candidate(
            direct in arb_direct_approvals(),
            committee in arb_committee_approvals(),
        ) {
            let selected = reconcile(&direct, &committee);
            prop_assert_eq!(selected.is_none(), direct.is_empty() && committee.is_empty());
            if let Some(selected) = selected {
                let newest = direct
                    .iter()
                    .map(|a| a.approved_at)
                    .chain(committee.iter().map(|a| a.approved_at))
                    .max()
                    .flatten();
                prop_assert_eq!(selected.approved_at(), newest);
            }
        }

        #[test]
        fn committee_wins_whenever_it_is_not_older(
            direct in arb_direct_approvals(),
            committee in arb_committee_approvals(),
        ) {
            let newest_direct = direct.iter().map(|a| a.approved_at).max();
            let newest_committee = committee.iter().map(|a| a.approved_at).max();
            if let (Some(d), Some(c)) = (newest_direct, newest_committee) {
                let via = reconcile(&direct, &committee).map(|a| a.via());
                let expected = if c >= d { ApprovalVia::Committee } else { ApprovalVia::Approver };
                prop_assert_eq!(via, Some(expected));
            }
        }
    }
}
