use crate::constants::{MAX_SECTOR_PERCENT, MIN_SECTOR_PERCENT};

/// Project sector shares onto `{sum = 100, each in [20, 50]}`.
///
/// Shares are clamped first; the remaining gap to 100 is then spread over the
/// sectors in proportion to their room before hitting a bound, so a single
/// pass always lands inside the feasible set.
pub fn normalize_shares(shares: [f64; 3]) -> [f64; 3] {
    let mut out = shares.map(|s| {
        if s.is_finite() {
            s.clamp(MIN_SECTOR_PERCENT, MAX_SECTOR_PERCENT)
        } else {
            100.0 / 3.0
        }
    });
    let gap = 100.0 - out.iter().sum::<f64>();
    if gap.abs() < 1e-12 {
        return out;
    }
    let room: [f64; 3] = if gap > 0.0 {
        out.map(|s| MAX_SECTOR_PERCENT - s)
    } else {
        out.map(|s| s - MIN_SECTOR_PERCENT)
    };
    let total_room: f64 = room.iter().sum();
    if total_room <= 0.0 {
        return out;
    }
    for (s, r) in out.iter_mut().zip(room) {
        *s += gap * r / total_room;
    }
    out
}
