//! Static port-to-protocol classification.

/// Well-known service hint for a port.
pub fn hint_for(port: u16) -> &'static str {
    match port {
        22 => "SSH",
        80 => "HTTP",
        443 => "HTTPS",
        1883 => "MQTT",
        502 => "MODBUS",
        _ => "UNKNOWN",
    }
}

/// One hint per open port, in the same order as the input.
pub fn protocol_hints(open_ports: &[u16]) -> Vec<String> {
    open_ports.iter().map(|p| hint_for(*p).to_string()).collect()
}
