//! Cluster transport
//!
//! The session engine talks to the control node through this trait so the
//! command sequences can be exercised against a recording fake in tests.
//! The production implementation is an ssh2 session (exec channels for
//! commands, SFTP for file transfer).

use crate::config::ClusterConfig;
use crate::error::{RigError, RigResult};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use tracing::{debug, info};

/// Upload chunk size; the whole file is never held in memory
const UPLOAD_CHUNK: usize = 32 * 1024;

/// One live connection to the control node.
///
/// Local-side I/O stays with the caller: an upload source is an already
/// open reader, so a missing local file never counts as a transport
/// failure.
pub trait ClusterTransport: Send {
    /// Execute one shell line and return its decoded output
    fn exec(&mut self, command: &str) -> RigResult<String>;

    /// Stream `source` to a remote path; returns bytes written
    fn upload(&mut self, source: &mut dyn Read, remote: &str) -> RigResult<u64>;

    /// Tear the connection down; called at most once
    fn close(&mut self);
}

/// ssh2-backed transport
pub struct Ssh2Transport {
    session: Session,
}

impl Ssh2Transport {
    /// Open a TCP connection, handshake and authenticate
    pub fn connect(config: &ClusterConfig) -> RigResult<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let tcp = TcpStream::connect(&addr)
            .map_err(|e| RigError::Command(format!("connect to {addr}: {e}")))?;

        let mut session =
            Session::new().map_err(|e| RigError::Command(format!("session init: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| RigError::Command(format!("handshake with {addr}: {e}")))?;
        session
            .userauth_password(&config.username, &config.secret)
            .map_err(|e| RigError::Command(format!("authentication failed: {e}")))?;

        info!("Connected to control node {}", addr);
        Ok(Self { session })
    }
}

impl ClusterTransport for Ssh2Transport {
    fn exec(&mut self, command: &str) -> RigResult<String> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| RigError::Command(format!("channel open: {e}")))?;
        channel
            .exec(command)
            .map_err(|e| RigError::Command(format!("exec '{command}': {e}")))?;

        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| RigError::Command(format!("read output of '{command}': {e}")))?;
        // Stderr matters for sudo rejection detection
        let mut errout = String::new();
        let _ = channel.stderr().read_to_string(&mut errout);
        output.push_str(&errout);

        let _ = channel.wait_close();
        debug!("exec '{}' -> {} bytes", command, output.len());
        Ok(output)
    }

    fn upload(&mut self, source: &mut dyn Read, remote: &str) -> RigResult<u64> {
        let sftp = self
            .session
            .sftp()
            .map_err(|e| RigError::Upload(format!("sftp channel: {e}")))?;
        let mut target = sftp
            .create(Path::new(remote))
            .map_err(|e| RigError::Upload(format!("create {remote}: {e}")))?;

        // The remote handle closes on every exit path when it drops
        let mut chunk = vec![0u8; UPLOAD_CHUNK];
        let mut written: u64 = 0;
        loop {
            let n = source
                .read(&mut chunk)
                .map_err(|e| RigError::Upload(format!("read upload source: {e}")))?;
            if n == 0 {
                break;
            }
            target
                .write_all(&chunk[..n])
                .map_err(|e| RigError::Upload(format!("write {remote}: {e}")))?;
            written += n as u64;
            debug!("upload {}: {} bytes so far", remote, written);
        }

        info!("Uploaded {} bytes -> {}", written, remote);
        Ok(written)
    }

    fn close(&mut self) {
        let _ = self.session.disconnect(None, "rigvoice disconnect", None);
    }
}
