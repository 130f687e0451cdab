//! Line-oriented USB serial transport, grounded on the teacher crate's
//! `mbus/serial.rs::MBusDeviceHandle::connect` (open, configure, retry) and
//! on `original_source/src/gateway/meshtastic_serial.py`'s auto-reconnect
//! reader thread and `DM|node|text` / `BC|text` outbound wire format.

use super::{decode_line, GatewayError, Packet, TransportAdapter};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio_serial::SerialPortBuilderExt;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_BAUD_RATE: u32 = 9600;

pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    writer: Arc<Mutex<Option<tokio::io::WriteHalf<tokio_serial::SerialStream>>>>,
    inbound_rx: Mutex<mpsc::Receiver<(String, Packet)>>,
    inbound_tx: mpsc::Sender<(String, Packet)>,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_baud_rate(port_name, DEFAULT_BAUD_RATE)
    }

    pub fn with_baud_rate(port_name: impl Into<String>, baud_rate: u32) -> Self {
        let (tx, rx) = mpsc::channel(256);
        SerialTransport {
            port_name: port_name.into(),
            baud_rate,
            connected: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            writer: Arc::new(Mutex::new(None)),
            inbound_rx: Mutex::new(rx),
            inbound_tx: tx,
        }
    }

    fn spawn_reader(&self) {
        let port_name = self.port_name.clone();
        let baud_rate = self.baud_rate;
        let connected = self.connected.clone();
        let running = self.running.clone();
        let writer = self.writer.clone();
        let tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let stream = tokio_serial::new(&port_name, baud_rate)
                    .data_bits(tokio_serial::DataBits::Eight)
                    .parity(tokio_serial::Parity::None)
                    .stop_bits(tokio_serial::StopBits::One)
                    .open_native_async();

                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        crate::logging::log_warn(&format!(
                            "serial connect to {port_name} failed: {e}, retrying in {}s",
                            RECONNECT_DELAY.as_secs()
                        ));
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };
                crate::logging::log_info(&format!("connected to {port_name} at {baud_rate} baud"));
                connected.store(true, Ordering::SeqCst);

                let (read_half, write_half) = tokio::io::split(stream);
                *writer.lock().await = Some(write_half);

                let mut lines = BufReader::new(read_half).lines();
                loop {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            if let Some((node_id, packet)) = decode_line(&line) {
                                if tx.send((node_id, packet)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            crate::logging::log_warn(&format!("serial read error: {e}"));
                            break;
                        }
                    }
                }

                connected.store(false, Ordering::SeqCst);
                *writer.lock().await = None;
                if running.load(Ordering::SeqCst) {
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        });
    }
}

#[async_trait]
impl TransportAdapter for SerialTransport {
    async fn start(&self) -> Result<(), GatewayError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.spawn_reader();
        Ok(())
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        self.running.store(false, Ordering::SeqCst);
        *self.writer.lock().await = None;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn recv(&self) -> Option<(String, Packet)> {
        self.inbound_rx.lock().await.recv().await
    }

    async fn send_dm(&self, node_id: &str, text: &str) -> bool {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            crate::logging::log_warn("serial not connected, dropping DM");
            return false;
        };
        let line = format!("DM|{node_id}|{text}\n");
        writer.write_all(line.as_bytes()).await.is_ok()
    }

    async fn send_broadcast(&self, text: &str) -> bool {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            crate::logging::log_warn("serial not connected, dropping broadcast");
            return false;
        };
        let line = format!("BC|{text}\n");
        writer.write_all(line.as_bytes()).await.is_ok()
    }
}
