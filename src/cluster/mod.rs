//! Display Cluster Engine
//!
//! Everything needed to drive the rig over one persistent SSH session:
//! - geometry: coordinate extraction and camera math (pure)
//! - protocol: the fixed file-polling command vocabulary
//! - transport: the SSH seam (swappable for tests)
//! - session: the state machine and composite command sequences

pub mod geometry;
pub mod protocol;
pub mod session;
pub mod transport;

pub use geometry::{calculate_center, calculate_range, extract_coordinates, Coordinate};
pub use session::{ClusterSession, Delays, SessionState};
pub use transport::ClusterTransport;
