// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Canonical time keys for keyframe timelines.
//!
//! Timelines are keyed by the string form of a normalized playback time.
//! Raw float formatting is unusable as a map key: `0.1 + 0.2` does not
//! print as `0.3`, and `"0.5"` and `"0.50"` would be distinct keys for
//! the same instant. A canonical key is truncated (never rounded) to a
//! fixed width and right-padded with `'0'`, so the same time always maps
//! to the same key and lexical order equals numeric order.

use crate::models::document::Timeline;

/// Total width of a canonical key: one integer digit, the decimal dot,
/// and seven fractional characters.
pub const KEY_WIDTH: usize = 9;

/// Maximum |time difference| treated as "the same keyframe".
pub const TIME_MATCH_THRESHOLD: f64 = 0.005;

/// Canonical key for a normalized time in [0, 1].
pub fn to_key(time: f64) -> String {
    canonical(&time.to_string())
}

/// Canonicalize an existing string key: truncate to [`KEY_WIDTH`] and
/// zero-pad. Idempotent, so keys read back from disk pass through
/// unchanged once they are canonical.
pub fn canonical(raw: &str) -> String {
    let mut key: String = raw.chars().take(KEY_WIDTH).collect();
    if !key.contains('.') {
        key.push('.');
    }
    while key.len() < KEY_WIDTH {
        key.push('0');
    }
    key
}

/// Find the timeline key numerically closest to `target`, if it is
/// within `threshold`. Never fabricates a key that is not present.
pub fn nearest_key(timeline: &Timeline, target: f64, threshold: f64) -> Option<String> {
    let mut best: Option<(f64, &String)> = None;
    for key in timeline.keys() {
        let Ok(time) = key.parse::<f64>() else {
            continue;
        };
        let diff = (time - target).abs();
        if best.map_or(true, |(d, _)| diff < d) {
            best = Some((diff, key));
        }
    }
    best.filter(|(diff, _)| *diff < threshold)
        .map(|(_, key)| key.clone())
}
