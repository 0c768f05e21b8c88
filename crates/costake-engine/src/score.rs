//! Co-staker score

use crate::error::Result;
use crate::types::{signed_diff, CostakerRewardsTracker};

/// `min(active_sats, active_baby / ratio)`. A zero ratio scores nothing.
pub fn calculate_score(ratio: u128, active_baby: u128, active_sats: u128) -> u128 {
    match active_baby.checked_div(ratio) {
        Some(baby_in_sats) => active_sats.min(baby_in_sats),
        None => 0,
    }
}

/// Recompute the tracker's score and return `new - old`
pub fn update_score(tracker: &mut CostakerRewardsTracker, ratio: u128) -> Result<i128> {
    let old = tracker.total_score;
    tracker.total_score = calculate_score(ratio, tracker.active_baby, tracker.active_satoshis);
    signed_diff(tracker.total_score, old)
}
