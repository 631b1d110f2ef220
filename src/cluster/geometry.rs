//! Camera geometry helpers
//!
//! Pure functions: coordinate extraction from KML text plus the center and
//! range math that points the cluster camera at freshly loaded content.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

/// One geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Default camera range when fewer than two coordinates exist (meters)
pub const SINGLE_POINT_RANGE_M: f64 = 500_000.0;
/// Range clamp bounds (meters)
pub const MIN_RANGE_M: f64 = 5_000.0;
pub const MAX_RANGE_M: f64 = 20_000_000.0;

/// Meters per degree at the equator
const METERS_PER_DEGREE: f64 = 111_320.0;
/// Margin so the bounding box comfortably fits the screens
const RANGE_MARGIN: f64 = 1.8;

lazy_static! {
    /// Coordinates element inside a Point (dedicated point declarations)
    static ref POINT_COORDS: Regex =
        Regex::new(r"(?s)<Point[^>]*>.*?<coordinates[^>]*>([^<]+)</coordinates>").unwrap();
    /// Any coordinates element (polygon/line fallback)
    static ref ANY_COORDS: Regex =
        Regex::new(r"<coordinates[^>]*>([^<]+)</coordinates>").unwrap();
}

/// Parse one `lon,lat[,alt]` tuple
fn parse_tuple(tuple: &str) -> Option<Coordinate> {
    let mut parts = tuple.split(',');
    let longitude: f64 = parts.next()?.trim().parse().ok()?;
    let latitude: f64 = parts.next()?.trim().parse().ok()?;
    Some(Coordinate {
        latitude,
        longitude,
    })
}

fn parse_list(content: &str, out: &mut Vec<Coordinate>) {
    for tuple in content.split_whitespace() {
        match parse_tuple(tuple) {
            Some(coord) => out.push(coord),
            None => warn!("Skipping malformed coordinate tuple: '{}'", tuple),
        }
    }
}

/// Extract coordinates from a KML document.
///
/// Point declarations win; only when the document has none do we fall back
/// to polygon/line coordinate lists. Malformed tuples are skipped.
pub fn extract_coordinates(document: &str) -> Vec<Coordinate> {
    let mut coords = Vec::new();

    for capture in POINT_COORDS.captures_iter(document) {
        parse_list(&capture[1], &mut coords);
    }
    if !coords.is_empty() {
        return coords;
    }

    for capture in ANY_COORDS.captures_iter(document) {
        parse_list(&capture[1], &mut coords);
    }
    coords
}

/// Midpoint of the bounding box — not the centroid, so a route's endpoints
/// determine the view even with uneven point density. Empty input yields
/// the zero coordinate.
pub fn calculate_center(coords: &[Coordinate]) -> Coordinate {
    if coords.is_empty() {
        return Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
    }

    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    for c in coords {
        min_lat = min_lat.min(c.latitude);
        max_lat = max_lat.max(c.latitude);
        min_lon = min_lon.min(c.longitude);
        max_lon = max_lon.max(c.longitude);
    }

    Coordinate {
        latitude: (min_lat + max_lat) / 2.0,
        longitude: (min_lon + max_lon) / 2.0,
    }
}

/// Camera range in meters proportional to the larger bounding-box spread,
/// clamped to [5 km, 20 000 km]. Fewer than two coordinates yield a fixed
/// default since no meaningful spread exists.
pub fn calculate_range(coords: &[Coordinate]) -> f64 {
    if coords.len() < 2 {
        return SINGLE_POINT_RANGE_M;
    }

    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    for c in coords {
        min_lat = min_lat.min(c.latitude);
        max_lat = max_lat.max(c.latitude);
        min_lon = min_lon.min(c.longitude);
        max_lon = max_lon.max(c.longitude);
    }

    let spread = (max_lat - min_lat).max(max_lon - min_lon);
    (spread * METERS_PER_DEGREE * RANGE_MARGIN).clamp(MIN_RANGE_M, MAX_RANGE_M)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate {
            latitude: lat,
            longitude: lon,
        }
    }

    const POINT_KML: &str = r#"<kml><Document>
        <Placemark><Point><coordinates>2.2945,48.8584,0</coordinates></Point></Placemark>
    </Document></kml>"#;

    const LINE_KML: &str = r#"<kml><Document>
        <Placemark><LineString><coordinates>
            0.0,10.0,0 5.0,15.0,0 10.0,20.0,0
        </coordinates></LineString></Placemark>
    </Document></kml>"#;

    #[test]
    fn test_extract_point_coordinates() {
        let coords = extract_coordinates(POINT_KML);
        assert_eq!(coords, vec![coord(48.8584, 2.2945)]);
    }

    #[test]
    fn test_extract_line_fallback() {
        let coords = extract_coordinates(LINE_KML);
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], coord(10.0, 0.0));
        assert_eq!(coords[2], coord(20.0, 10.0));
    }

    #[test]
    fn test_points_win_over_lists() {
        let mixed = format!(
            "{}{}",
            POINT_KML.trim_end_matches("</Document></kml>"),
            "<Placemark><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark></Document></kml>"
        );
        let coords = extract_coordinates(&mixed);
        assert_eq!(coords, vec![coord(48.8584, 2.2945)]);
    }

    #[test]
    fn test_malformed_tuples_skipped() {
        let kml = "<kml><LineString><coordinates>abc 1.0,2.0 5.0</coordinates></LineString></kml>";
        let coords = extract_coordinates(kml);
        assert_eq!(coords, vec![coord(2.0, 1.0)]);
    }

    #[test]
    fn test_center_is_bounding_box_midpoint() {
        let coords = vec![coord(10.0, 10.0), coord(20.0, 20.0)];
        assert_eq!(calculate_center(&coords), coord(15.0, 15.0));

        // Uneven density must not move the center
        let dense = vec![
            coord(10.0, 10.0),
            coord(11.0, 11.0),
            coord(11.5, 11.5),
            coord(20.0, 20.0),
        ];
        assert_eq!(calculate_center(&dense), coord(15.0, 15.0));
    }

    #[test]
    fn test_center_empty_is_zero() {
        assert_eq!(calculate_center(&[]), coord(0.0, 0.0));
    }

    #[test]
    fn test_range_single_point_default() {
        assert_eq!(calculate_range(&[coord(48.0, 2.0)]), SINGLE_POINT_RANGE_M);
        assert_eq!(calculate_range(&[]), SINGLE_POINT_RANGE_M);
    }

    #[test]
    fn test_range_clamped_and_monotonic() {
        let mut previous = 0.0;
        for spread in [0.001, 0.1, 1.0, 10.0, 90.0, 300.0] {
            let coords = vec![coord(0.0, 0.0), coord(0.0, spread)];
            let range = calculate_range(&coords);
            assert!(range >= MIN_RANGE_M && range <= MAX_RANGE_M);
            assert!(range >= previous, "range must not shrink as spread grows");
            previous = range;
        }

        // Tiny spread hits the floor, continental spread hits the ceiling
        let tiny = vec![coord(0.0, 0.0), coord(0.0, 0.0001)];
        assert_eq!(calculate_range(&tiny), MIN_RANGE_M);
        let huge = vec![coord(-80.0, -170.0), coord(80.0, 170.0)];
        assert_eq!(calculate_range(&huge), MAX_RANGE_M);
    }
}
