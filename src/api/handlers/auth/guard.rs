//! IP reputation checks over the attempt ledger.
//!
//! The streak is the run of consecutive failures at the head of the
//! newest-first attempt list; the first success ends the run, older rows are
//! irrelevant to the policy.

/// Count the consecutive-failure streak. `outcomes` is newest-first,
/// `true` marks a successful attempt.
pub(super) fn streak(outcomes: &[bool]) -> u32 {
    u32::try_from(outcomes.iter().take_while(|success| !**success).count()).unwrap_or(u32::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Verdict {
    Clear,
    Tripped,
}

pub(super) fn evaluate(outcomes: &[bool], threshold: u32) -> Verdict {
    if streak(outcomes) >= threshold {
        Verdict::Tripped
    } else {
        Verdict::Clear
    }
}

/// Whether recording one more failure on top of `outcomes` completes a run of
/// `threshold` consecutive failures. Used after a failed compare so the flag
/// lands on the attempt that crosses the threshold.
pub(super) fn trips_on_next_failure(outcomes: &[bool], threshold: u32) -> bool {
    streak(outcomes).saturating_add(1) >= threshold
}
