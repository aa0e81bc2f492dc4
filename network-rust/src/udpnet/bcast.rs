use cbc::RecvError;
use cbc::SendError;
use crossbeam_channel as cbc;
use log::warn;
use serde::Deserialize;
use socket2::{SockAddr, Socket};

use std::error;
use std::io;
use std::net;
use std::net::IpAddr;
use std::str;

#[path = "./sock.rs"]
mod sock;

#[derive(Debug)]
pub enum BcError<T> {
    IOError(io::Error),
    CBCSendError(SendError<T>),
    CBCRecvError(RecvError),
}

impl<T> From<io::Error> for BcError<T> {
    fn from(e: io::Error) -> Self {
        BcError::IOError(e)
    }
}

impl<T> From<SendError<T>> for BcError<T> {
    fn from(e: SendError<T>) -> Self {
        BcError::CBCSendError(e)
    }
}

impl<T> From<RecvError> for BcError<T> {
    fn from(e: RecvError) -> Self {
        BcError::CBCRecvError(e)
    }
}

/// Sends each channel item as one JSON datagram on `port`, to the given
/// address when one is known and to the broadcast address otherwise.
///
/// Returns `Err` when creating the socket fails. Send failures are logged
/// and dropped; the next periodic message carries the full state anyway.
pub fn tx<T: serde::Serialize>(
    port: u16,
    ch: cbc::Receiver<(Option<IpAddr>, T)>,
) -> Result<(), BcError<(Option<IpAddr>, T)>> {
    let (s, bcast_addr) = sock::new_tx(port, false)?;
    loop {
        let (target, data) = ch.recv()?;
        let serialized = serde_json::to_string(&data).unwrap();
        let addr: SockAddr = match target {
            Some(ip) => net::SocketAddr::from((ip, port)).into(),
            None => bcast_addr.into(),
        };
        if let Err(e) = s.send_to(serialized.as_bytes(), &addr) {
            warn!("Unable to send packet, {}", e);
        }
    }
}

/// Forwards every decodable datagram arriving on `port` together with its
/// source address. Addresses are learned here, never configured.
///
/// Returns `Err` when creating the socket fails. Undecodable datagrams are
/// logged and dropped.
pub fn rx<T: serde::de::DeserializeOwned>(
    port: u16,
    ch: cbc::Sender<(IpAddr, T)>,
) -> Result<(), BcError<(IpAddr, T)>> {
    let s = sock::new_rx(port)?;

    let mut buf = [0; 16384];

    loop {
        match parse_packet(&s, &mut buf) {
            Ok(d) => ch.send(d)?,
            Err(e) => warn!("Received bad package got error: {}", e),
        }
    }
}

fn parse_packet<'a, T: Deserialize<'a>>(
    s: &'_ Socket,
    buf: &'a mut [u8; 16384],
) -> Result<(IpAddr, T), Box<dyn error::Error>> {
    let (n, source) = s.recv_from(buf)?;
    let source = if let Some(v4) = source.as_inet() {
        IpAddr::V4(*v4.ip())
    } else if let Some(v6) = source.as_inet6() {
        IpAddr::V6(*v6.ip())
    } else {
        return Err("unknown source address family".into());
    };
    let msg = str::from_utf8(&buf[..n])?;
    let data = serde_json::from_str::<T>(msg)?;
    Ok((source, data))
}
