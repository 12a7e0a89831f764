use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Any routable address will do, nothing is sent.
const PROBE_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 1);

/// Finds the address other devices on the local network can use to reach this machine, so it
/// can be printed for the user.
///
/// A UDP socket is "connected" to a public address, which makes the OS pick the outbound
/// interface without sending any packets. If that fails for any reason this returns `127.0.0.1`.
pub async fn local_ip() -> IpAddr {
    match probe(PROBE_ADDR).await {
        Ok(ip) => ip,
        Err(e) => {
            debug!("Unable to determine the local network address: {e}");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn probe(target: SocketAddr) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(target).await?;
    Ok(socket.local_addr()?.ip())
}
