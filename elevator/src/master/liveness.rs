use std::collections::HashMap;
use std::thread::spawn;
use std::time::{Duration, Instant};

use crossbeam_channel as cbc;
use crossbeam_channel::{unbounded, Receiver, Sender};

use shared_resources::config::{LIVENESS_POLL_PERIOD, SLAVE_TIMEOUT_PERIOD};
use shared_resources::message::Address;

/// Starts the liveness task. Send an address on the first channel whenever a
/// message from it arrives; every address that then stays silent for the
/// timeout period comes back exactly once on the second channel.
pub fn init() -> (Sender<Address>, Receiver<Address>) {
    let (alive_tx, alive_rx) = unbounded();
    let (timeout_tx, timeout_rx) = unbounded();
    spawn(move || main(alive_rx, timeout_tx, SLAVE_TIMEOUT_PERIOD, LIVENESS_POLL_PERIOD));
    (alive_tx, timeout_rx)
}

fn main(
    alive_rx: Receiver<Address>,
    timeout_tx: Sender<Address>,
    timeout: Duration,
    poll_period: Duration,
) {
    let mut last_seen: HashMap<Address, Instant> = HashMap::new();

    loop {
        cbc::select! {
            recv(alive_rx) -> msg => {
                match msg {
                    Ok(address) => {
                        last_seen.insert(address, Instant::now());
                    }
                    // owner is gone, wind down
                    Err(_) => return,
                }
            },
            default(poll_period) => {
                let now = Instant::now();
                let mut lost: Vec<Address> = last_seen
                    .iter()
                    .filter(|(_, seen)| now - **seen > timeout)
                    .map(|(address, _)| *address)
                    .collect();
                lost.sort();
                for address in lost {
                    last_seen.remove(&address);
                    if timeout_tx.send(address).is_err() {
                        return;
                    }
                }
            },
        }
    }
}
