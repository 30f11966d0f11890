/// Fractional-second subdivisions used for the seconds rational.
pub const SECONDS_PRECISION: u32 = 10;

/// One coordinate as degrees/minutes/seconds rationals plus a hemisphere
/// reference letter. Degrees and minutes carry denominator 1; seconds use
/// [`SECONDS_PRECISION`] so the value stays exact in the rational-only
/// container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmsCoordinate {
    pub degrees: (u32, u32),
    pub minutes: (u32, u32),
    pub seconds: (u32, u32),
    pub reference: &'static str,
}

/// A resolved position encoded for the GPS field group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsPosition {
    pub latitude: DmsCoordinate,
    pub longitude: DmsCoordinate,
}

impl GpsPosition {
    pub fn from_decimal(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: encode_coordinate(latitude, "N", "S"),
            longitude: encode_coordinate(longitude, "E", "W"),
        }
    }
}

fn encode_coordinate(
    value: f64,
    positive_ref: &'static str,
    negative_ref: &'static str,
) -> DmsCoordinate {
    let abs = value.abs();
    let degrees = abs.floor();
    let rem_minutes = (abs - degrees) * 60.0;
    let minutes = rem_minutes.floor();
    let seconds = (rem_minutes - minutes) * 60.0;

    DmsCoordinate {
        degrees: (degrees as u32, 1),
        minutes: (minutes as u32, 1),
        seconds: (
            (seconds * SECONDS_PRECISION as f64).round() as u32,
            SECONDS_PRECISION,
        ),
        reference: if value < 0.0 { negative_ref } else { positive_ref },
    }
}

/// Decode a DMS quadruple back to unsigned decimal degrees.
pub fn dms_to_decimal(coord: &DmsCoordinate) -> f64 {
    let degrees = coord.degrees.0 as f64 / coord.degrees.1 as f64;
    let minutes = coord.minutes.0 as f64 / coord.minutes.1 as f64;
    let seconds = coord.seconds.0 as f64 / coord.seconds.1 as f64;
    degrees + minutes / 60.0 + seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smallest representable difference: one seconds-numerator step.
    const RESOLUTION: f64 = 1.0 / (3600.0 * SECONDS_PRECISION as f64);

    #[test]
    fn test_round_trip_within_resolution() {
        for value in [37.7749, 0.0, 89.9999, 0.0001, 122.4194, 179.9999] {
            let pos = GpsPosition::from_decimal(value, value);
            let decoded = dms_to_decimal(&pos.latitude);
            assert!(
                (decoded - value).abs() <= RESOLUTION,
                "{value} decoded to {decoded}"
            );
        }
    }

    #[test]
    fn test_exact_degrees() {
        let pos = GpsPosition::from_decimal(37.0, -122.0);
        assert_eq!(pos.latitude.degrees, (37, 1));
        assert_eq!(pos.latitude.minutes, (0, 1));
        assert_eq!(pos.latitude.seconds, (0, SECONDS_PRECISION));
        assert_eq!(pos.longitude.degrees, (122, 1));
    }

    #[test]
    fn test_hemisphere_references() {
        let sydney = GpsPosition::from_decimal(-33.8688, 151.2093);
        assert_eq!(sydney.latitude.reference, "S");
        assert_eq!(sydney.longitude.reference, "E");

        let sf = GpsPosition::from_decimal(37.7749, -122.4194);
        assert_eq!(sf.latitude.reference, "N");
        assert_eq!(sf.longitude.reference, "W");

        let origin = GpsPosition::from_decimal(0.0, 0.0);
        assert_eq!(origin.latitude.reference, "N");
        assert_eq!(origin.longitude.reference, "E");
    }

    #[test]
    fn test_negative_value_encodes_magnitude() {
        let pos = GpsPosition::from_decimal(-33.8688, 151.2093);
        let decoded = dms_to_decimal(&pos.latitude);
        assert!((decoded - 33.8688).abs() <= RESOLUTION);
    }
}
