//! Generic pointer ranges shared between hosts and the chip.
//!
//! Hosts describe absolute pointer positions in a signed 16-bit range
//! centred on zero.  The CH9329 only understands 0..=4095 on each axis, so
//! the event model rescales between the two.

/// Lowest absolute coordinate a host may send.
pub const MOUSE_MIN: i32 = -32768;

/// Highest absolute coordinate a host may send.
pub const MOUSE_MAX: i32 = 32767;

/// Number of distinct absolute positions per axis on the chip.
pub const DEVICE_RESOLUTION: i32 = 4096;

/// Largest absolute coordinate the chip accepts.
pub const DEVICE_MAX: i32 = DEVICE_RESOLUTION - 1;

/// Largest magnitude of a relative move or wheel delta.
pub const DELTA_LIMIT: i32 = 127;

/// Rescales a host coordinate in `MOUSE_MIN..=MOUSE_MAX` into `0..=DEVICE_MAX`.
///
/// The coordinate is shifted by `MOUSE_MAX` into `[-1, 2 * MOUSE_MAX]`, scaled
/// by `DEVICE_RESOLUTION / (2 * MOUSE_MAX)` and floored.  The two ends of the
/// shifted range land one step outside the chip's range and are clamped.
pub fn to_device_coordinate(value: i32) -> u16 {
    let shifted = i64::from(value) + i64::from(MOUSE_MAX);
    let scaled = (shifted * i64::from(DEVICE_RESOLUTION)).div_euclid(2 * i64::from(MOUSE_MAX));
    scaled.clamp(0, i64::from(DEVICE_MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_maps_to_device_zero() {
        assert_eq!(to_device_coordinate(MOUSE_MIN), 0);
    }

    #[test]
    fn test_max_maps_to_device_max() {
        assert_eq!(to_device_coordinate(MOUSE_MAX), 4095);
    }

    #[test]
    fn test_centre_maps_to_device_midpoint() {
        assert_eq!(to_device_coordinate(0), 2048);
    }

    #[test]
    fn test_rescale_is_monotonic() {
        // Arrange
        let mut previous = to_device_coordinate(MOUSE_MIN);

        // Act / Assert
        for value in (MOUSE_MIN..=MOUSE_MAX).step_by(97) {
            let current = to_device_coordinate(value);
            assert!(current >= previous, "rescale must not decrease at {value}");
            previous = current;
        }
    }

    #[test]
    fn test_rescale_matches_floating_point_formula() {
        for value in [-30000, -12345, -1, 1, 777, 16384, 32000] {
            let expected = ((value + MOUSE_MAX) as f64 / (MOUSE_MAX as f64 * 2.0 / 4096.0)).floor();
            assert_eq!(to_device_coordinate(value) as f64, expected, "value {value}");
        }
    }
}
