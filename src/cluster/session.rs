//! Cluster session engine
//!
//! Owns the one live transport to the control node and sequences the
//! display actions over it. The remote display process polls its command
//! files, so every composite sequence interleaves fixed delays between
//! steps; skipping one is a correctness bug, not an optimization.
//!
//! Commands execute strictly sequentially. Callers must not run two
//! composite sequences concurrently on the same session; one in-flight
//! voice command at a time is the documented contract.

use crate::cluster::geometry::{self, Coordinate};
use crate::cluster::protocol;
use crate::cluster::transport::{ClusterTransport, Ssh2Transport};
use crate::config::ClusterConfig;
use crate::error::{RigError, RigResult};
use crate::markup::MarkupDocument;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Inter-step delays required by the file-polling display protocol
#[derive(Debug, Clone)]
pub struct Delays {
    /// Between consecutive query-file writes
    pub step: Duration,
    /// After a content refresh, before the next command
    pub refresh: Duration,
    /// After a fly-to, letting the camera settle before content loads
    pub fly_settle: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(500),
            refresh: Duration::from_secs(1),
            fly_settle: Duration::from_secs(3),
        }
    }
}

impl Delays {
    /// Zero delays, for tests driving a fake transport
    pub fn none() -> Self {
        Self {
            step: Duration::ZERO,
            refresh: Duration::ZERO,
            fly_settle: Duration::ZERO,
        }
    }
}

/// Remote filename of the uploaded logo asset
const LOGO_REMOTE_NAME: &str = "rigvoice_logo.png";

/// Persistent session to the display cluster
pub struct ClusterSession {
    config: ClusterConfig,
    state: SessionState,
    transport: Option<Box<dyn ClusterTransport>>,
    delays: Delays,
    /// Run the logo-overlay sequence automatically on entering Connected
    logo_on_connect: bool,
    /// Maps total node count to the logo-bearing node; rig topologies
    /// disagree on this, so it is injectable
    logo_node_fn: fn(usize) -> usize,
    /// Local logo image asset
    logo_path: PathBuf,
}

impl ClusterSession {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            transport: None,
            delays: Delays::default(),
            logo_on_connect: true,
            logo_node_fn: protocol::default_logo_node,
            logo_path: PathBuf::from("assets/logo.png"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn set_delays(&mut self, delays: Delays) {
        self.delays = delays;
    }

    pub fn set_logo_on_connect(&mut self, enabled: bool) {
        self.logo_on_connect = enabled;
    }

    pub fn set_logo_node_fn(&mut self, f: fn(usize) -> usize) {
        self.logo_node_fn = f;
    }

    pub fn set_logo_path(&mut self, path: PathBuf) {
        self.logo_path = path;
    }

    /// Open the SSH session to the control node.
    ///
    /// Fails fast on incomplete configuration. On success the logo-overlay
    /// sequence runs as a post-connect hook (disable with
    /// `set_logo_on_connect(false)`).
    pub fn connect(&mut self) -> RigResult<()> {
        if !self.config.is_complete() {
            return Err(RigError::Config(
                "cluster connection details are incomplete".into(),
            ));
        }

        self.disconnect();
        self.state = SessionState::Connecting;

        let transport = match Ssh2Transport::connect(&self.config) {
            Ok(t) => Box::new(t),
            Err(e) => {
                self.state = SessionState::Disconnected;
                return Err(e);
            }
        };
        self.attach(transport)
    }

    /// Enter Connected over an already-open transport (also the test seam)
    pub fn attach(&mut self, transport: Box<dyn ClusterTransport>) -> RigResult<()> {
        if !self.config.is_complete() {
            return Err(RigError::Config(
                "cluster connection details are incomplete".into(),
            ));
        }

        // At most one live handle per session
        if let Some(mut old) = self.transport.take() {
            old.close();
        }
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        info!("Cluster session established ({} nodes)", self.config.node_count);

        if self.logo_on_connect {
            // A missing logo asset should not take the session down
            if let Err(e) = self.set_logo() {
                warn!("Post-connect logo upload failed: {}", e);
            }
        }
        Ok(())
    }

    /// Tear down the transport unconditionally; no-op when already down
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!("Cluster session closed");
        }
        self.state = SessionState::Disconnected;
    }

    /// Replace connection details. A live session must not silently
    /// diverge from its configuration, so this forces a disconnect.
    pub fn update_config(&mut self, config: ClusterConfig) {
        if self.state == SessionState::Connected {
            self.disconnect();
        }
        self.config = config;
    }

    fn transport(&mut self) -> RigResult<&mut Box<dyn ClusterTransport>> {
        match self.state {
            SessionState::Connected => self.transport.as_mut().ok_or(RigError::NotConnected),
            _ => Err(RigError::NotConnected),
        }
    }

    /// Execute one command on the control node
    pub fn run(&mut self, command: &str) -> RigResult<String> {
        debug!("run: {}", command);
        let result = self.transport()?.exec(command);
        if result.is_err() {
            // Transport failure invalidates the session
            self.disconnect();
        }
        result
    }

    /// Transfer a local file to the control node.
    ///
    /// A local-side failure (missing or unreadable file) leaves the session
    /// up; only transport failures invalidate it.
    pub fn upload_file(&mut self, local: &Path, remote: &str) -> RigResult<u64> {
        self.transport()?;
        let mut source = std::fs::File::open(local)
            .map_err(|e| RigError::Upload(format!("open {}: {e}", local.display())))?;

        let result = self.transport()?.upload(&mut source, remote);
        if result.is_err() {
            self.disconnect();
        }
        result
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    /// Display a markup document across the cluster.
    ///
    /// Starts from a deterministic camera position: when the document
    /// carries coordinates, the camera flies to their bounding box before
    /// the content loads, rather than staying wherever the rig last looked.
    pub fn send_markup(&mut self, document: &MarkupDocument) -> RigResult<()> {
        let coords = geometry::extract_coordinates(&document.kml);
        info!(
            "Sending markup ({} bytes, {} coordinates)",
            document.kml.len(),
            coords.len()
        );

        self.run(&protocol::clear_kml_list_command())?;
        self.run(&protocol::exit_tour_command())?;
        self.pause(self.delays.step);

        if !coords.is_empty() {
            let center = geometry::calculate_center(&coords);
            let range = geometry::calculate_range(&coords);
            let view = protocol::look_at(
                center,
                range,
                protocol::DEFAULT_TILT,
                protocol::DEFAULT_HEADING,
            );
            self.run(&protocol::fly_to_command(&view))?;
            self.pause(self.delays.fly_settle);
        }

        // Stage locally, then hand the file to the cluster's content server
        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(document.kml.as_bytes())?;
        staged.flush()?;

        let filename = format!("rigvoice_{}.kml", chrono::Utc::now().timestamp());
        let remote = format!("{}/{}", protocol::CONTENT_DIR, filename);
        self.upload_file(staged.path(), &remote)?;

        self.run(&protocol::append_kml_url_command(&protocol::content_url(
            &filename,
        )))?;
        self.pause(self.delays.refresh);
        self.run(&protocol::play_tour_command())?;
        self.pause(self.delays.refresh);
        self.run(&protocol::exit_tour_command())?;
        Ok(())
    }

    /// Clear all displayed markup
    pub fn clear_markup(&mut self) -> RigResult<()> {
        self.run(&protocol::exit_tour_command())?;
        self.pause(self.delays.step);
        self.run(&protocol::clear_kml_list_command())?;
        self.run(&protocol::play_tour_command())?;
        self.pause(self.delays.refresh);
        Ok(())
    }

    /// (Re)start the embedded tour. The display software treats a reload
    /// as "play", so play and refresh are the same primitive.
    pub fn play_tour(&mut self) -> RigResult<()> {
        self.run(&protocol::play_tour_command()).map(|_| ())
    }

    /// Stop the running tour
    pub fn exit_tour(&mut self) -> RigResult<()> {
        self.run(&protocol::exit_tour_command()).map(|_| ())
    }

    /// Fly the camera to a pre-built LookAt/Camera view string
    pub fn fly_to_view(&mut self, camera_view: &str) -> RigResult<()> {
        protocol::check_camera_view(camera_view)?;
        self.run(&protocol::exit_tour_command())?;
        self.pause(self.delays.step);
        self.run(&protocol::fly_to_command(camera_view.trim()))
            .map(|_| ())
    }

    /// Fly the camera to a single coordinate at the default range
    pub fn fly_to_coordinate(&mut self, coordinate: Coordinate) -> RigResult<()> {
        let view = protocol::look_at(
            coordinate,
            geometry::SINGLE_POINT_RANGE_M,
            protocol::DEFAULT_TILT,
            protocol::DEFAULT_HEADING,
        );
        self.fly_to_view(&view)
    }

    /// Upload the logo asset and overlay it on the logo-bearing node
    pub fn set_logo(&mut self) -> RigResult<()> {
        let node = (self.logo_node_fn)(self.config.node_count);
        let local = self.logo_path.clone();
        let remote = format!("{}/{}", protocol::CONTENT_DIR, LOGO_REMOTE_NAME);
        self.upload_file(&local, &remote)?;

        let overlay = protocol::logo_overlay_kml(&protocol::content_url(LOGO_REMOTE_NAME));
        self.run(&protocol::write_node_kml_command(node, &overlay))
            .map(|_| ())
    }

    /// Remove the logo overlay from the logo-bearing node
    pub fn clear_logo(&mut self) -> RigResult<()> {
        let node = (self.logo_node_fn)(self.config.node_count);
        self.run(&protocol::write_node_kml_command(
            node,
            &protocol::empty_overlay_kml(),
        ))
        .map(|_| ())
    }

    /// Reboot the cluster via the control node.
    ///
    /// The remote side drops the transport once the restart begins, so the
    /// session is marked Disconnected immediately; a rejected elevation is
    /// reported distinctly from transport failures.
    pub fn reboot(&mut self) -> RigResult<()> {
        let command = protocol::reboot_command(&self.config.secret);
        let result = self.run(&command);
        self.disconnect();

        match result {
            Ok(output) if protocol::is_sudo_rejection(&output) => Err(RigError::Command(
                "reboot refused: elevation rejected on the control node".into(),
            )),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
