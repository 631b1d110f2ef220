use rigvoice::cluster::ClusterTransport;
use rigvoice::error::RigResult;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// Transport fake that records every operation in order
pub struct RecordingTransport {
    pub log: Arc<Mutex<Vec<String>>>,
    /// Output returned by every exec call
    pub exec_output: String,
    pub closed: Arc<Mutex<bool>>,
}

impl RecordingTransport {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            log: Arc::clone(&log),
            exec_output: String::new(),
            closed: Arc::new(Mutex::new(false)),
        };
        (transport, log)
    }

    pub fn with_exec_output(output: impl Into<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let (mut transport, log) = Self::new();
        transport.exec_output = output.into();
        (transport, log)
    }
}

impl ClusterTransport for RecordingTransport {
    fn exec(&mut self, command: &str) -> RigResult<String> {
        self.log.lock().unwrap().push(format!("exec: {command}"));
        Ok(self.exec_output.clone())
    }

    fn upload(&mut self, source: &mut dyn Read, remote: &str) -> RigResult<u64> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        self.log
            .lock()
            .unwrap()
            .push(format!("upload: {remote} ({} bytes)", bytes.len()));
        Ok(bytes.len() as u64)
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}
