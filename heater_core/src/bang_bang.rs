//! Two-state control with hysteresis for on/off channels.

/// Next on/off command.
///
/// On at or below `target - threshold`, off at or above `target + threshold`,
/// otherwise `previous` is kept so the relay does not chatter inside the band.
#[inline]
pub fn decide(current: u16, target: u16, threshold: u16, previous: u8) -> u8 {
    let current = i32::from(current);
    let target = i32::from(target);
    let threshold = i32::from(threshold);
    if current <= target - threshold {
        1
    } else if current >= target + threshold {
        0
    } else {
        u8::from(previous != 0)
    }
}
