//! Display-cluster wire protocol
//!
//! The display nodes poll a small set of fixed files instead of listening
//! for events. Command names, file paths, and the `key=value` vocabulary
//! below belong to the display-node software we do not control and must be
//! reproduced verbatim.

use crate::error::{RigError, RigResult};
use super::geometry::Coordinate;

/// Single-line command channel polled by the display process
pub const QUERY_FILE: &str = "/tmp/query.txt";
/// List of KML URLs the cluster renders
pub const KML_LIST_FILE: &str = "/var/www/html/kmls.txt";
/// Shared static-content directory fronted by the control node
pub const CONTENT_DIR: &str = "/var/www/html";
/// Per-node overlay documents live here as slave_{n}.kml
pub const NODE_KML_DIR: &str = "/var/www/html/kml";
/// Base URL under which the content directory is served cluster-internally
pub const CONTENT_BASE_URL: &str = "http://lg1:81";

/// Camera tilt used for generated fly-to views (degrees)
pub const DEFAULT_TILT: f64 = 45.0;
/// Camera heading used for generated fly-to views (degrees)
pub const DEFAULT_HEADING: f64 = 0.0;

/// One `key=value` write into the query file
fn query_command(key: &str, value: &str) -> String {
    format!("echo \"{key}={value}\" > {QUERY_FILE}")
}

/// Stop any running tour
pub fn exit_tour_command() -> String {
    query_command("exittour", "true")
}

/// (Re)load the KML list and autoplay any embedded tour
pub fn play_tour_command() -> String {
    query_command("playtour", "true")
}

/// Move the camera to a pre-built view string
pub fn fly_to_command(camera_view: &str) -> String {
    query_command("flytoview", camera_view)
}

/// Build a LookAt camera view from center, range and fixed orientation
pub fn look_at(center: Coordinate, range_m: f64, tilt: f64, heading: f64) -> String {
    format!(
        "<LookAt><longitude>{:.6}</longitude><latitude>{:.6}</latitude><altitude>0</altitude><range>{:.0}</range><tilt>{tilt}</tilt><heading>{heading}</heading></LookAt>",
        center.longitude, center.latitude, range_m
    )
}

/// Reject a camera-view string before anything reaches the wire: it must
/// be a single LookAt or Camera element.
pub fn check_camera_view(view: &str) -> RigResult<()> {
    let trimmed = view.trim();
    let ok = (trimmed.starts_with("<LookAt") && trimmed.ends_with("</LookAt>"))
        || (trimmed.starts_with("<Camera") && trimmed.ends_with("</Camera>"));
    if ok {
        Ok(())
    } else {
        Err(RigError::Command(format!(
            "malformed camera view (must be a LookAt or Camera element): {trimmed}"
        )))
    }
}

/// Truncate the KML list
pub fn clear_kml_list_command() -> String {
    format!("echo \"\" > {KML_LIST_FILE}")
}

/// Append one content URL to the KML list
pub fn append_kml_url_command(url: &str) -> String {
    format!("echo \"{url}\" >> {KML_LIST_FILE}")
}

/// URL under which an uploaded content file is reachable cluster-wide
pub fn content_url(filename: &str) -> String {
    format!("{CONTENT_BASE_URL}/{}", urlencoding::encode(filename))
}

/// Remote path of one node's overlay document
pub fn node_kml_path(node: usize) -> String {
    format!("{NODE_KML_DIR}/slave_{node}.kml")
}

/// Write an overlay document to one node's slave file
pub fn write_node_kml_command(node: usize, kml: &str) -> String {
    format!("echo '{kml}' > {}", node_kml_path(node))
}

/// Default mapping from node count to the logo-bearing node: the leftmost
/// screen in the standard ring layout. Injectable on the session because
/// rig topologies disagree on this.
pub fn default_logo_node(node_count: usize) -> usize {
    node_count / 2 + 2
}

/// Fixed-position logo overlay document for one node
pub fn logo_overlay_kml(logo_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <ScreenOverlay>
    <name>Logo</name>
    <Icon><href>{logo_url}</href></Icon>
    <overlayXY x="0" y="1" xunits="fraction" yunits="fraction"/>
    <screenXY x="0.02" y="0.98" xunits="fraction" yunits="fraction"/>
    <size x="0.3" y="0" xunits="fraction" yunits="fraction"/>
  </ScreenOverlay>
</kml>"#
    )
}

/// Empty document that clears a node's overlay
pub fn empty_overlay_kml() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\"></kml>"
        .to_string()
}

/// Pipe the session secret into an elevated restart on the control node
pub fn reboot_command(secret: &str) -> String {
    format!("echo \"{secret}\" | sudo -S reboot")
}

/// Markers in command output that mean sudo refused the elevation
pub fn is_sudo_rejection(output: &str) -> bool {
    output.contains("Sorry, try again")
        || output.contains("incorrect password")
        || output.contains("is not in the sudoers file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_commands_verbatim() {
        assert_eq!(
            exit_tour_command(),
            "echo \"exittour=true\" > /tmp/query.txt"
        );
        assert_eq!(
            play_tour_command(),
            "echo \"playtour=true\" > /tmp/query.txt"
        );
        assert!(fly_to_command("<LookAt></LookAt>")
            .starts_with("echo \"flytoview=<LookAt></LookAt>\""));
    }

    #[test]
    fn test_look_at_shape() {
        let view = look_at(
            Coordinate {
                latitude: 48.8584,
                longitude: 2.2945,
            },
            500_000.0,
            DEFAULT_TILT,
            DEFAULT_HEADING,
        );
        assert!(view.starts_with("<LookAt>"));
        assert!(view.ends_with("</LookAt>"));
        assert!(view.contains("<range>500000</range>"));
        assert!(check_camera_view(&view).is_ok());
    }

    #[test]
    fn test_check_camera_view_rejects_garbage() {
        assert!(check_camera_view("<LookAt><range>1</range></LookAt>").is_ok());
        assert!(check_camera_view("<Camera></Camera>").is_ok());
        assert!(check_camera_view("fly somewhere").is_err());
        assert!(check_camera_view("<LookAt><range>1</range>").is_err());
    }

    #[test]
    fn test_content_url_encodes_filename() {
        assert_eq!(
            content_url("tour of paris.kml"),
            "http://lg1:81/tour%20of%20paris.kml"
        );
    }

    #[test]
    fn test_node_paths() {
        assert_eq!(node_kml_path(3), "/var/www/html/kml/slave_3.kml");
    }

    #[test]
    fn test_default_logo_node() {
        // 5-screen rig: nodes 1..=5, leftmost screen is node 4
        assert_eq!(default_logo_node(5), 4);
        assert_eq!(default_logo_node(3), 3);
    }

    #[test]
    fn test_sudo_rejection_markers() {
        assert!(is_sudo_rejection("sudo: Sorry, try again"));
        assert!(is_sudo_rejection("lg is not in the sudoers file"));
        assert!(!is_sudo_rejection(""));
    }
}
