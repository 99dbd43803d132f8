//! Approach and speed-zone analysis for physical and constitutional scopes

use amanda_domain::{ApproachPrediction, Region, SpeedZoneCheck};

use crate::error::QueryError;

/// Metres per second in one mile per hour
pub const MPH_TO_MPS: f64 = 0.44704;

/// Predict whether a subject is about to reach `target`
///
/// The subject approaches when its velocity has a positive component toward
/// the centre of the target region. The approach is imminent when it
/// approaches from closer than `interaction_range`.
pub fn predict_approach(
    target: &Region,
    target_allowed: bool,
    position: (f64, f64),
    velocity: (f64, f64),
    interaction_range: f64,
) -> ApproachPrediction {
    let (x, y) = position;
    let (vx, vy) = velocity;
    let centre = ((target.x0 + target.x1) / 2.0, (target.y0 + target.y1) / 2.0);

    let distance = target.distance_to(x, y);
    let approaching = vx * (centre.0 - x) + vy * (centre.1 - y) > 0.0;
    let speed = vx.hypot(vy);
    let time_to_reach_s = (approaching && speed > 0.0).then(|| distance / speed);

    ApproachPrediction {
        distance,
        approaching,
        time_to_reach_s,
        target_allowed,
        imminent: approaching && distance < interaction_range,
    }
}

/// Check a speed against a limit ahead
///
/// Above the limit a warning is always due. Inside the band between
/// `warning_band * limit` and the limit, a warning is due when slowing to the
/// bottom of the band at `max_decel_mps2` takes at least the distance left
/// to the zone.
///
/// # Errors
///
/// [`QueryError::InvalidQuery`] for a non-positive limit or deceleration, or
/// a negative or non-finite speed or distance.
pub fn check_speed_zone(
    speed_mph: f64,
    limit_mph: f64,
    distance_to_zone_m: f64,
    max_decel_mps2: f64,
    warning_band: f64,
) -> Result<SpeedZoneCheck, QueryError> {
    let finite = [speed_mph, limit_mph, distance_to_zone_m, max_decel_mps2]
        .iter()
        .all(|v| v.is_finite());
    if !finite || limit_mph <= 0.0 || max_decel_mps2 <= 0.0 || speed_mph < 0.0 || distance_to_zone_m < 0.0 {
        return Err(QueryError::InvalidQuery(format!(
            "speed zone needs a positive limit and deceleration, got speed {} limit {} distance {} decel {}",
            speed_mph, limit_mph, distance_to_zone_m, max_decel_mps2
        )));
    }

    if speed_mph > limit_mph {
        return Ok(SpeedZoneCheck {
            speeding: true,
            near_limit: false,
            stopping_distance_m: None,
            warning_required: true,
        });
    }

    let band_floor_mph = limit_mph * warning_band;
    if speed_mph <= band_floor_mph {
        return Ok(SpeedZoneCheck::default());
    }

    let current = speed_mph * MPH_TO_MPS;
    let target = band_floor_mph * MPH_TO_MPS;
    let stopping = (current * current - target * target) / (2.0 * max_decel_mps2);

    Ok(SpeedZoneCheck {
        speeding: false,
        near_limit: true,
        stopping_distance_m: Some(stopping),
        warning_required: stopping >= distance_to_zone_m,
    })
}
