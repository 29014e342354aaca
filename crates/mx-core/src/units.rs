// mx-core/src/units.rs

use uom::si::f64::Time as UomTime;

pub type Time = UomTime;

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

/// Whole-second `h:mm:ss` rendering of an elapsed time, as shown on the process clock.
pub fn format_hms(t: Time) -> String {
    let total = seconds(t).max(0.0).floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let sec = total % 60;
    format!("{h}:{m:02}:{sec:02}")
}
