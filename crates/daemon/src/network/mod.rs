//! Local address discovery for the startup banner.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Public address used only to pick an outbound interface. No packet is sent.
const PROBE_ADDR: &str = "8.8.8.8:80";

/// Best guess at this machine's LAN IPv4 address.
///
/// Connecting a UDP socket makes the OS choose a source address without
/// sending anything. Returns `None` when there is no route or the chosen
/// address is loopback.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(PROBE_ADDR).ok()?;

    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) => usable(*addr.ip()),
        SocketAddr::V6(_) => None,
    }
}

fn usable(ip: Ipv4Addr) -> Option<Ipv4Addr> {
    if ip.is_loopback() || ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

/// URLs a user can open to reach the server, most local first.
///
/// A wildcard bind is reachable on localhost and on the LAN address, if one
/// is known. A specific bind is reachable only on that address.
pub fn display_urls(bind: IpAddr, port: u16, lan: Option<Ipv4Addr>) -> Vec<String> {
    if bind.is_unspecified() {
        let mut urls = vec![format!("http://localhost:{}/", port)];
        if let Some(ip) = lan {
            urls.push(format!("http://{}:{}/", ip, port));
        }
        urls
    } else {
        vec![format!("http://{}/", SocketAddr::new(bind, port))]
    }
}
