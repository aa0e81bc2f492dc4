use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::elev_data::ElevData;
use crate::order::Order;

/// Network identity of a node, learned from the source address of received
/// datagrams.
pub type Address = IpAddr;

/// Periodic report from a slave: its physical state plus every locally
/// observed press or completion not yet acknowledged in a master snapshot.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct SlaveMessage {
    pub elev_data: ElevData,
    pub requests: Vec<Order>,
}

/// Master-side record of one slave. The alive timer belongs to the liveness
/// task, not to this record, so the record itself travels on the wire.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Slave {
    pub address: Address,
    pub elev_data: ElevData,
    pub has_timed_out: bool,
}

/// The full authoritative state, broadcast every tick and persisted to the
/// backup file.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct MasterData {
    pub assigned_backup: Address,
    pub orders: Vec<Order>,
    pub slaves: HashMap<Address, Slave>,
}

/// Role tag carried by every datagram. Receivers keep the variant addressed
/// to them and drop the other.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub enum Message {
    ToMaster(SlaveMessage),
    ToSlaves(MasterData),
}

/// The address the rest of the fleet will see for this node. Falls back to
/// localhost when no route is available.
pub fn local_ip() -> Address {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:53")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
