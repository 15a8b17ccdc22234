// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object color assignment and parsing.
//!
//! Colors are stored in the document as `hsl(H, 70%, 50%)` strings.
//! Hues are derived from the numeric object id with a golden-angle
//! walk, so consecutive objects get well-separated hues and the same
//! object keeps its color across sessions.

/// Hue step between consecutive ids, in degrees.
const GOLDEN_ANGLE: f64 = 137.50776405003785;

/// Color for an object id. Non-numeric ids fall back to a hash of the
/// id bytes so they still get a stable hue.
pub fn for_id(id: &str) -> String {
    let n = id.parse::<u64>().unwrap_or_else(|_| {
        id.bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
    });
    from_index(n)
}

pub fn from_index(n: u64) -> String {
    let hue = (n as f64 * GOLDEN_ANGLE) % 360.0;
    format!("hsl({:.0}, 70%, 50%)", hue)
}

/// Parse an `hsl(H, S%, L%)` string into an egui color. Unparseable
/// strings render as yellow rather than failing.
pub fn to_color32(color: &str) -> egui::Color32 {
    match parse_hsl(color) {
        Some((h, s, l)) => {
            // HSL to HSV
            let v = l + s * l.min(1.0 - l);
            let sv = if v == 0.0 { 0.0 } else { 2.0 * (1.0 - l / v) };
            egui::ecolor::Hsva::new(h / 360.0, sv, v, 1.0).into()
        }
        None => egui::Color32::YELLOW,
    }
}

fn parse_hsl(s: &str) -> Option<(f32, f32, f32)> {
    let inner = s.trim().strip_prefix("hsl(")?.strip_suffix(')')?;
    let mut parts = inner.split(',');
    let h = parts.next()?.trim().parse::<f32>().ok()?;
    let sat = parts.next()?.trim().strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
    let light = parts.next()?.trim().strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
    Some((h, sat, light))
}
