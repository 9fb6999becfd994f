use crate::types::RankedEntry;

pub struct LimitResult {
    pub selected: Vec<RankedEntry>,
    pub returned: usize,
    pub excluded_by_limit: usize,
}

/// Keep the first `limit` ranked entries. `None` keeps everything.
pub fn apply_limit(ranked: Vec<RankedEntry>, limit: Option<usize>) -> LimitResult {
    let total = ranked.len();
    let mut selected = ranked;

    if let Some(limit) = limit {
        selected.truncate(limit);
    }

    let returned = selected.len();
    LimitResult {
        selected,
        returned,
        excluded_by_limit: total - returned,
    }
}
