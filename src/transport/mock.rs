//! In-memory [`TransportAdapter`] for integration tests: feed inbound
//! packets with [`MockTransport::push`], read what the core sent back
//! with [`MockTransport::sent_dms`] / [`MockTransport::sent_broadcasts`].

use super::{GatewayError, Packet, TransportAdapter};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub struct MockTransport {
    connected: AtomicBool,
    inbound_tx: mpsc::Sender<(String, Packet)>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<(String, Packet)>>,
    dms: Mutex<Vec<(String, String)>>,
    broadcasts: Mutex<Vec<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel(64);
        MockTransport {
            connected: AtomicBool::new(true),
            inbound_tx: tx,
            inbound_rx: tokio::sync::Mutex::new(rx),
            dms: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, node_id: impl Into<String>, packet: Packet) {
        let _ = self.inbound_tx.send((node_id.into(), packet)).await;
    }

    pub fn sent_dms(&self) -> Vec<(String, String)> {
        self.dms.lock().unwrap().clone()
    }

    pub fn sent_broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn start(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn recv(&self) -> Option<(String, Packet)> {
        self.inbound_rx.lock().await.recv().await
    }

    async fn send_dm(&self, node_id: &str, text: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.dms.lock().unwrap().push((node_id.to_string(), text.to_string()));
        true
    }

    async fn send_broadcast(&self, text: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.broadcasts.lock().unwrap().push(text.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TextPacket;

    #[tokio::test]
    async fn push_then_recv_round_trips() {
        let t = MockTransport::new();
        t.push(
            "!a1b2c3d4",
            Packet::Text(TextPacket {
                node_id: "!a1b2c3d4".to_string(),
                text: "#osmhelp".to_string(),
                device_uptime: None,
                position: None,
            }),
        )
        .await;
        let (node, _) = t.recv().await.unwrap();
        assert_eq!(node, "!a1b2c3d4");
    }

    #[tokio::test]
    async fn disconnected_transport_drops_sends() {
        let t = MockTransport::new();
        t.set_connected(false);
        assert!(!t.send_dm("!a1b2c3d4", "hi").await);
        assert!(t.sent_dms().is_empty());
    }
}
