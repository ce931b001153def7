use crate::domain::outreach::OutreachRecord;

pub const DEFAULT_TOP_N: usize = 8;

/// Highest priority first, ties kept in processing order, then truncated to `top_n`.
pub fn rank_and_truncate(mut records: Vec<OutreachRecord>, top_n: usize) -> Vec<OutreachRecord> {
    // `sort_by` is stable, which is what keeps equal scores in processing order.
    records.sort_by(|left, right| right.priority_score.cmp(&left.priority_score));
    records.truncate(top_n);
    records
}
