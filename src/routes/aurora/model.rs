use serde::{Deserialize, Serialize};

/// Aurora outlook derived from the NOAA planetary K-index feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuroraForecast {
    pub kp_index: f64,
    pub activity_level: String,
    pub viewing_outlook: String,
    pub observed_at: String,
}

/// The feed is a JSON array of rows, the first being a header:
/// `[["time_tag","Kp",...], ["2026-08-23 18:00:00","3.67",...], ...]`.
/// The last row is the most recent observation.
pub fn parse_forecast(rows: &serde_json::Value) -> Option<AuroraForecast> {
    let last = rows.as_array()?.iter().skip(1).last()?.as_array()?;
    let observed_at = last.first()?.as_str()?.to_string();
    let kp_index: f64 = last.get(1)?.as_str()?.trim().parse().ok()?;

    Some(AuroraForecast {
        kp_index,
        activity_level: activity_level(kp_index).to_string(),
        viewing_outlook: viewing_outlook(kp_index).to_string(),
        observed_at,
    })
}

fn activity_level(kp: f64) -> &'static str {
    if kp < 3.0 {
        "quiet"
    } else if kp < 5.0 {
        "active"
    } else if kp < 7.0 {
        "storm"
    } else {
        "severe storm"
    }
}

/// Under the auroral oval even quiet nights can show something, so the
/// outlook only goes negative at the bottom of the scale.
fn viewing_outlook(kp: f64) -> &'static str {
    if kp < 1.0 {
        "unlikely"
    } else if kp < 3.0 {
        "possible"
    } else if kp < 5.0 {
        "likely"
    } else {
        "excellent"
    }
}
