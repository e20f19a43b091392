use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink::{self, NetworkInterface};
use tracing::debug;

/// Resolves the address the advisory listeners bind to when `--interface`
/// is not given: the first loopback address found, else the unspecified address.
pub fn default_bind_interface() -> IpAddr {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    match first_loopback_address(&interfaces) {
        Some(addr) => {
            debug!("Binding listeners to loopback address {addr}");
            addr
        }
        None => {
            debug!("No loopback address found, binding listeners to all interfaces");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}

fn first_loopback_address(interfaces: &[NetworkInterface]) -> Option<IpAddr> {
    interfaces
        .iter()
        .flat_map(|interface| interface.ips.iter())
        .map(|net| net.ip())
        .find(|ip| ip.is_loopback())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
