//! Arithmetic used by the per-cycle movement transform.

use core::f32::consts::PI;

use crate::types::CosineLevel;

/// Largest per-axis delta a serial mouse packet can carry.
pub const PACKET_AXIS_LIMIT: i16 = 127;

/// Bound of the running motion buffer.
pub const BUFFER_LIMIT: i16 = 30_000;

/// Integer division rounding half away from zero. `d` must be positive.
#[inline]
#[must_use]
pub const fn div_round(n: i32, d: i32) -> i32 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        -((-n + d / 2) / d)
    }
}

#[inline]
const fn saturate_i16(v: i32) -> i16 {
    if v > i16::MAX as i32 {
        i16::MAX
    } else if v < i16::MIN as i32 {
        i16::MIN
    } else {
        v as i16
    }
}

/// Scale `val` by `percentage` and clamp to `±limit` (no clamp when `limit` is 0).
///
/// 100 % is a no-op apart from the clamp, a zero input or zero percentage
/// always gives 0, and a scaled value that rounds to 0 stays 0 even when a
/// clamp is requested.
#[must_use]
pub fn travel_limit(val: i16, percentage: u8, limit: u16) -> i16 {
    if val == 0 || percentage == 0 {
        return 0;
    }

    let scaled = if percentage != 100 {
        let j = saturate_i16(div_round(i32::from(val) * i32::from(percentage), 100));
        if j == 0 {
            return 0;
        }
        j
    } else {
        val
    };

    clamp_to(scaled, limit)
}

#[inline]
fn clamp_to(val: i16, limit: u16) -> i16 {
    if limit == 0 {
        return val;
    }
    let limit = i16::try_from(limit).unwrap_or(i16::MAX);
    val.clamp(-limit, limit)
}

/// Remap `v` through `v * cos(v * PI / (1536 - 256 * level))`.
///
/// Small motions stay close to 1:1 while large ones are damped. Level 0
/// returns the input unchanged.
#[must_use]
pub fn cosine_smooth(v: i16, level: CosineLevel) -> i16 {
    if v == 0 || level.is_off() {
        return v;
    }

    let span = 1536.0 - 256.0 * f32::from(level.level());
    let factor = libm::cosf(f32::from(v) * (PI / span));
    let scaled = libm::roundf(f32::from(v) * factor);

    if scaled >= f32::from(i16::MAX) {
        i16::MAX
    } else if scaled <= f32::from(i16::MIN) {
        i16::MIN
    } else {
        scaled as i16
    }
}

/// Take at most one packet's worth out of a coast buffer, leaving the remainder.
#[inline]
#[must_use]
pub fn coast_take(buffer: &mut i16) -> i16 {
    let take = (*buffer).clamp(-PACKET_AXIS_LIMIT, PACKET_AXIS_LIMIT);
    *buffer -= take;
    take
}

/// Mean delta over `samples` USB reports, 0 when nothing arrived.
#[inline]
#[must_use]
pub fn average(total: i16, samples: u16) -> i16 {
    if samples == 0 {
        return 0;
    }
    saturate_i16(div_round(i32::from(total), i32::from(samples)))
}

/// Add a delta into the running buffer, saturating at [`BUFFER_LIMIT`].
#[inline]
#[must_use]
pub fn accumulate(buffer: i16, delta: i16) -> i16 {
    (i32::from(buffer) + i32::from(delta)).clamp(-i32::from(BUFFER_LIMIT), i32::from(BUFFER_LIMIT))
        as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(l: u8) -> CosineLevel {
        CosineLevel::new(l).unwrap()
    }

    #[test]
    fn test_travel_limit_hundred_percent_is_identity() {
        for v in [-30000i16, -300, -127, -1, 1, 5, 127, 300, 30000] {
            assert_eq!(travel_limit(v, 100, 0), v);
        }
    }

    #[test]
    fn test_travel_limit_zero_cases() {
        assert_eq!(travel_limit(0, 50, 127), 0);
        assert_eq!(travel_limit(0, 100, 0), 0);
        assert_eq!(travel_limit(55, 0, 0), 0);
        // 1 * 25% rounds to 0 and must stay 0
        assert_eq!(travel_limit(1, 25, 127), 0);
    }

    #[test]
    fn test_travel_limit_scales_and_clamps() {
        assert_eq!(travel_limit(10, 50, 0), 5);
        assert_eq!(travel_limit(-10, 75, 0), -8);
        assert_eq!(travel_limit(3, 50, 0), 2);
        assert_eq!(travel_limit(100, 200, 127), 127);
        assert_eq!(travel_limit(-500, 100, 127), -127);
    }

    #[test]
    fn test_cosine_smooth_keeps_small_motion() {
        assert_eq!(cosine_smooth(1, level(4)), 1);
        assert_eq!(cosine_smooth(-2, level(1)), -2);
        assert_eq!(cosine_smooth(0, level(4)), 0);
        assert_eq!(cosine_smooth(120, CosineLevel::OFF), 120);
    }

    #[test]
    fn test_cosine_smooth_damps_large_motion() {
        let low = cosine_smooth(127, level(1));
        let high = cosine_smooth(127, level(4));
        assert!(low < 127);
        assert!(high < low);
        // symmetric around zero
        assert_eq!(cosine_smooth(-127, level(4)), -high);
    }

    #[test]
    fn test_coast_take_drains_buffer() {
        let mut buf = 300;
        assert_eq!(coast_take(&mut buf), 127);
        assert_eq!(coast_take(&mut buf), 127);
        assert_eq!(coast_take(&mut buf), 46);
        assert_eq!(buf, 0);

        let mut neg = -130;
        assert_eq!(coast_take(&mut neg), -127);
        assert_eq!(coast_take(&mut neg), -3);
    }

    #[test]
    fn test_average_is_zero_safe() {
        assert_eq!(average(500, 0), 0);
        assert_eq!(average(21, 7), 3);
        assert_eq!(average(-7, 2), -4);
    }

    #[test]
    fn test_accumulate_saturates() {
        assert_eq!(accumulate(29_990, 100), BUFFER_LIMIT);
        assert_eq!(accumulate(-29_990, -100), -BUFFER_LIMIT);
        assert_eq!(accumulate(10, -3), 7);
    }
}
