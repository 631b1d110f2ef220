pub mod mock_model;
pub mod mock_transport;

use rigvoice::config::ClusterConfig;

/// Complete cluster configuration for a 5-screen rig
pub fn test_cluster_config() -> ClusterConfig {
    ClusterConfig {
        host: "10.0.0.10".into(),
        port: 22,
        username: "lg".into(),
        secret: "hunter2".into(),
        node_count: 5,
    }
}
