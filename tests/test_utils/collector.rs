//! In-process stand-in for a Fluentd forward collector.
//!
//! Accepts connections on an ephemeral port and decodes each MessagePack
//! forward entry into a `(tag, seconds, record)` tuple delivered over a
//! channel.

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use fluent_forwarder::LogRecord;

/// A decoded forward entry.
pub type Entry = (String, u64, LogRecord);

pub struct Collector {
    port: u16,
    rx: mpsc::Receiver<Entry>,
}

impl Collector {
    /// Listen on `127.0.0.1` and serve every connection until the test ends.
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind collector");
        let port = listener.local_addr().expect("collector address").port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let tx = tx.clone();
                thread::spawn(move || read_entries(stream, &tx));
            }
        });
        Self { port, rx }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn next(&self) -> Entry {
        self.rx
            .recv_timeout(Duration::from_secs(5))
            .expect("collector received an entry")
    }

    #[allow(dead_code)]
    pub fn try_next(&self, timeout: Duration) -> Option<Entry> {
        self.rx.recv_timeout(timeout).ok()
    }
}

fn read_entries(mut stream: TcpStream, tx: &mpsc::Sender<Entry>) {
    while let Ok(entry) = rmp_serde::from_read::<_, Entry>(&mut stream) {
        if tx.send(entry).is_err() {
            break;
        }
    }
}

/// A local port with nothing listening on it.
#[allow(dead_code)]
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    listener.local_addr().expect("listener address").port()
}
