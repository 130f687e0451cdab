//! # Transport Adapter
//!
//! The boundary between the mesh radio and the core (spec.md §4.8). Raw,
//! dynamically-shaped packet records are normalized here into the strict
//! tagged union [`Packet`] before anything downstream sees them, per the
//! design note in spec.md §9.
//!
//! [`TransportAdapter`] is the trait the core depends on; [`serial`]
//! provides a concrete implementation over a line-oriented USB serial
//! link, and [`mock`] provides an in-memory one for tests.

pub mod mock;
pub mod serial;

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;

/// A decoded inbound mesh packet, normalized at the transport boundary.
#[derive(Debug, Clone)]
pub enum Packet {
    Text(TextPacket),
    Position(PositionPacket),
    Telemetry(TelemetryPacket),
    Other,
}

#[derive(Debug, Clone)]
pub struct TextPacket {
    pub node_id: String,
    pub text: String,
    pub device_uptime: Option<f64>,
    /// A GPS fix riding along with the same packet, if the device fused one in.
    pub position: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionPacket {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct TelemetryPacket {
    pub node_id: String,
    pub battery_percent: Option<f64>,
}

/// Environment collaborator the core depends on (spec.md §4.8).
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    async fn start(&self) -> Result<(), GatewayError>;
    async fn stop(&self) -> Result<(), GatewayError>;
    fn is_connected(&self) -> bool;
    /// Awaits the next decoded packet along with its originating node id.
    /// Returns `None` once the transport has been stopped and drained.
    async fn recv(&self) -> Option<(String, Packet)>;
    async fn send_dm(&self, node_id: &str, text: &str) -> bool;
    async fn send_broadcast(&self, text: &str) -> bool;
}

/// `"!" + hex(u32, lower, 8)` per spec.md §4.8.
pub fn canonicalize_node_id(from: u32) -> String {
    format!("!{from:08x}")
}

/// Scales a raw Meshtastic-style integer degree value by `1e-7`.
pub fn scale_position_integer(raw: i64) -> f64 {
    raw as f64 * 1e-7
}

fn normalize_node_token(token: &str) -> String {
    let token = token.trim();
    if let Some(stripped) = token.strip_prefix('!') {
        if u32::from_str_radix(stripped, 16).is_ok() {
            return token.to_string();
        }
    }
    token
        .parse::<u32>()
        .map(canonicalize_node_id)
        .unwrap_or_else(|_| token.to_string())
}

fn extract_node_id(v: &Value) -> String {
    match v.get("from") {
        Some(Value::Number(n)) => canonicalize_node_id(n.as_u64().unwrap_or(0) as u32),
        Some(Value::String(s)) => normalize_node_token(s),
        _ => "!00000000".to_string(),
    }
}

/// Decodes a single text line into a [`Packet`] plus the node it came from,
/// accepting either the JSON-object or pipe-separated MVP wire formats
/// (grounded on `original_source/src/gateway/meshtastic_serial.py::_parse_message`).
pub fn decode_line(line: &str) -> Option<(String, Packet)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') {
        decode_json(trimmed)
    } else {
        decode_pipe(trimmed)
    }
}

fn decode_json(s: &str) -> Option<(String, Packet)> {
    let v: Value = serde_json::from_str(s).ok()?;
    let node_id = extract_node_id(&v);

    let text = v.get("text").and_then(|t| t.as_str()).filter(|t| !t.is_empty());
    let lat = v
        .get("lat")
        .and_then(|x| x.as_f64())
        .or_else(|| v.get("lat_i").and_then(|x| x.as_i64()).map(scale_position_integer));
    let lon = v
        .get("lon")
        .and_then(|x| x.as_f64())
        .or_else(|| v.get("lon_i").and_then(|x| x.as_i64()).map(scale_position_integer));
    let uptime = v.get("uptime").and_then(|x| x.as_f64());
    let battery = v.get("battery").and_then(|x| x.as_f64());

    let packet = if let Some(text) = text {
        Packet::Text(TextPacket {
            node_id: node_id.clone(),
            text: text.to_string(),
            device_uptime: uptime,
            position: lat.zip(lon),
        })
    } else if let (Some(lat), Some(lon)) = (lat, lon) {
        Packet::Position(PositionPacket { lat, lon })
    } else if battery.is_some() {
        Packet::Telemetry(TelemetryPacket {
            node_id: node_id.clone(),
            battery_percent: battery,
        })
    } else {
        Packet::Other
    };
    Some((node_id, packet))
}

fn decode_pipe(s: &str) -> Option<(String, Packet)> {
    let parts: Vec<&str> = s.splitn(4, '|').collect();
    if parts.len() < 2 {
        return None;
    }
    let node_id = normalize_node_token(parts[0]);
    let lat = parts.get(1).filter(|p| !p.is_empty()).and_then(|p| p.parse::<f64>().ok());
    let lon = parts.get(2).filter(|p| !p.is_empty()).and_then(|p| p.parse::<f64>().ok());
    let text = parts.get(3).copied().unwrap_or("");

    let packet = if !text.is_empty() {
        Packet::Text(TextPacket {
            node_id: node_id.clone(),
            text: text.to_string(),
            device_uptime: None,
            position: lat.zip(lon),
        })
    } else if let (Some(lat), Some(lon)) = (lat, lon) {
        Packet::Position(PositionPacket { lat, lon })
    } else {
        return None;
    };
    Some((node_id, packet))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_node_addresses() {
        assert_eq!(canonicalize_node_id(0xa1b2c3d4), "!a1b2c3d4");
        assert_eq!(canonicalize_node_id(1), "!00000001");
    }

    #[test]
    fn scales_integer_degrees() {
        assert!((scale_position_integer(46_097_000) - 4.6097).abs() < 1e-6);
    }

    #[test]
    fn decodes_json_text_packet_with_embedded_position() {
        let line = r##"{"from": 2712847316, "lat": 4.6097, "lon": -74.0817, "text": "#osmnote hola"}"##;
        let (node, packet) = decode_line(line).unwrap();
        assert_eq!(node, "!a1b2c3d4");
        match packet {
            Packet::Text(t) => {
                assert_eq!(t.text, "#osmnote hola");
                assert_eq!(t.position, Some((4.6097, -74.0817)));
            }
            _ => panic!("expected text packet"),
        }
    }

    #[test]
    fn decodes_json_position_only_packet() {
        let line = r#"{"from": "!a1b2c3d4", "lat_i": 46097000, "lon_i": -740817000}"#;
        let (node, packet) = decode_line(line).unwrap();
        assert_eq!(node, "!a1b2c3d4");
        assert!(matches!(packet, Packet::Position(_)));
    }

    #[test]
    fn decodes_pipe_format() {
        let (node, packet) = decode_line("!a1b2c3d4|4.6097|-74.0817|hello there").unwrap();
        assert_eq!(node, "!a1b2c3d4");
        match packet {
            Packet::Text(t) => assert_eq!(t.text, "hello there"),
            _ => panic!("expected text packet"),
        }
    }

    #[test]
    fn decodes_pipe_format_without_position() {
        let (_, packet) = decode_line("!a1b2c3d4|||hello").unwrap();
        assert!(matches!(packet, Packet::Text(_)));
    }

    #[test]
    fn blank_line_decodes_to_nothing() {
        assert!(decode_line("   ").is_none());
    }
}
