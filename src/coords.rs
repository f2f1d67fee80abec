use serde::{Deserialize, Serialize};

/// Which axis a decimal-degree value belongs to. Selects the hemisphere
/// letter appended by the sexagesimal formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// A latitude/longitude pair in decimal degrees, |lat| <= 90, |lng| <= 180.
/// Immutable once read from image metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoCoordinate { lat, lng }
    }

    /// Both axes rendered sexagesimally, latitude first.
    pub fn sexagesimal(&self, precision: usize) -> String {
        format!(
            "{} {}",
            format_sexagesimal(self.lat, Axis::Latitude, precision),
            format_sexagesimal(self.lng, Axis::Longitude, precision)
        )
    }
}

/// Formats a decimal-degree value as degrees/minutes/seconds with a
/// hemisphere letter: N/S for latitude, O/W for longitude ("O" is the
/// German "Ost"). A value of exactly zero carries no hemisphere letter.
///
/// requires: `value` finite.
pub fn format_sexagesimal(value: f64, axis: Axis, precision: usize) -> String {
    let degree = value.abs();
    let minutes = 60.0 * degree.fract();
    let seconds = 60.0 * minutes.fract();

    let hemisphere = match axis {
        Axis::Latitude => {
            if value > 0.0 {
                "N"
            } else if value < 0.0 {
                "S"
            } else {
                ""
            }
        }
        Axis::Longitude => {
            if value > 0.0 {
                "O"
            } else if value < 0.0 {
                "W"
            } else {
                ""
            }
        }
    };

    let dms = format!(
        "{}\u{b0}{}'{:.*}''",
        degree.trunc() as i64,
        minutes.trunc() as i64,
        precision,
        seconds
    );

    if hemisphere.is_empty() {
        dms
    } else {
        format!("{} {}", dms, hemisphere)
    }
}
