/// ----- MASTER MODULE -----
/// Holds the authoritative order set. Waits for a backup to hold its state,
/// then delegates hall calls across live slaves, broadcasts the full state
/// every tick and persists it for cold-start recovery. Returns to the
/// waiting phase when the backup disappears, and stands down entirely when
/// a competing master with a lower address shows up.

pub mod backup;
pub mod delegation;
pub mod liveness;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::thread;

use crossbeam_channel::{after, select, tick, unbounded, Receiver, Sender};
use log::{info, warn};

use network_rust::udpnet::bcast;
use network_rust::udpnet::bcast::BcError;

use shared_resources::call::Call;
use shared_resources::config::{self, NodeConfig};
use shared_resources::message::{self, Address, MasterData, Message, Slave, SlaveMessage};
use shared_resources::order::Order;

enum Exit {
    Handover,
    Yield,
}

pub fn main(
    config: NodeConfig,
    initial_orders: Option<Vec<Order>>,
    initial_slaves: Option<HashMap<Address, Slave>>,
    foreign_master_rx: Receiver<(Address, Message)>,
) {
    let my_addr = message::local_ip();

    let (to_slaves_tx, to_slaves_rx) = unbounded::<(Option<Address>, Message)>();
    {
        let port = config.network.master_port;
        thread::spawn(move || match bcast::tx(port, to_slaves_rx) {
            Err(BcError::IOError(_)) => {
                panic!("Could not establish sending connection with slaves. Port {} already in use?", port)
            }
            _ => (),
        });
    }

    let (from_slaves_tx, from_slaves_rx) = unbounded::<(Address, Message)>();
    {
        let port = config.network.slave_port;
        thread::spawn(move || match bcast::rx(port, from_slaves_tx) {
            Err(BcError::IOError(_)) => {
                panic!("Could not establish receiving connection from slaves. Port {} already in use?", port)
            }
            _ => (),
        });
    }

    let (alive_tx, timeout_rx) = liveness::init();

    // a promotion can leave snapshots from the master that just died queued
    // on the shared channel, only traffic observed from now on counts
    while foreign_master_rx.try_recv().is_ok() {}

    let (mut orders, mut slaves) = match (initial_orders, initial_slaves) {
        (Some(orders), Some(slaves)) => (orders, slaves),
        _ => match backup::load() {
            Some(data) => {
                info!(
                    "recovered {} orders and {} slaves from {}",
                    data.orders.len(),
                    data.slaves.len(),
                    config::BACKUP_FILE
                );
                (data.orders, data.slaves)
            }
            None => (Vec::new(), HashMap::new()),
        },
    };

    loop {
        // PHASE A: field slave traffic, delegate nothing until a backup
        // holds the state
        let mut self_acceptable = config.self_as_backup;
        let backup_deadline = after(config::BACKUP_DEADLINE);
        info!("waiting for backup");
        let backup = 'waiting: loop {
            select! {
                recv(backup_deadline) -> _ => {
                    info!("not contacted by external slave within deadline, can now use self as backup");
                    self_acceptable = true;
                },
                recv(from_slaves_rx) -> msg => {
                    let (source, message) = msg.unwrap();
                    if let Message::ToMaster(slave_message) = message {
                        alive_tx.send(source).unwrap();
                        handle_slave_message(&mut orders, &mut slaves, source, &slave_message);
                        if source != my_addr || self_acceptable {
                            break 'waiting source;
                        }
                    }
                },
                recv(timeout_rx) -> msg => {
                    mark_timed_out(&mut slaves, msg.unwrap());
                },
                recv(foreign_master_rx) -> msg => {
                    let (source, message) = msg.unwrap();
                    if yields_to(my_addr, source, &message) {
                        info!("another master is active on {}, standing down", source);
                        return;
                    }
                },
            }
        };

        info!("initiating master with backup {}", backup);
        let exit = active(
            my_addr,
            backup,
            &mut orders,
            &mut slaves,
            &from_slaves_rx,
            &to_slaves_tx,
            &timeout_rx,
            &foreign_master_rx,
            &alive_tx,
        );
        match exit {
            Exit::Handover => info!("lost backup, waiting for a new one"),
            Exit::Yield => return,
        }
    }
}

/// PHASE B: the delegating loop. Returns `Handover` when the backup times
/// out and `Yield` when a lower-addressed master is observed.
fn active(
    my_addr: Address,
    assigned_backup: Address,
    orders: &mut Vec<Order>,
    slaves: &mut HashMap<Address, Slave>,
    from_slaves_rx: &Receiver<(Address, Message)>,
    to_slaves_tx: &Sender<(Option<Address>, Message)>,
    timeout_rx: &Receiver<Address>,
    foreign_master_rx: &Receiver<(Address, Message)>,
    alive_tx: &Sender<Address>,
) -> Exit {
    let send_ticker = tick(config::SEND_INTERVAL);
    let mut backup = assigned_backup;

    loop {
        select! {
            recv(from_slaves_rx) -> msg => {
                let (source, message) = msg.unwrap();
                let slave_message = match message {
                    Message::ToMaster(slave_message) => slave_message,
                    _ => continue,
                };
                if backup == my_addr && source != my_addr {
                    info!("changed backup to remote machine {}", source);
                    backup = source;
                }
                alive_tx.send(source).unwrap();
                handle_slave_message(orders, slaves, source, &slave_message);
            },
            recv(send_ticker) -> _ => {
                if let Err(e) = delegation::delegate_work(slaves, orders) {
                    warn!("{}", e);
                }
                let data = MasterData {
                    assigned_backup: backup,
                    orders: orders.clone(),
                    slaves: slaves.clone(),
                };
                to_slaves_tx.send((None, Message::ToSlaves(data.clone()))).unwrap();
                if let Err(e) = backup::save(&data) {
                    warn!("unable to write {}: {}", config::BACKUP_FILE, e);
                }
            },
            recv(timeout_rx) -> msg => {
                let address = msg.unwrap();
                info!("slave {} timed out", address);
                if mark_timed_out(slaves, address) {
                    if let Err(e) = delegation::delegate_work(slaves, orders) {
                        warn!("{}", e);
                    }
                }
                if address == backup {
                    return Exit::Handover;
                }
            },
            recv(foreign_master_rx) -> msg => {
                let (source, message) = msg.unwrap();
                if yields_to(my_addr, source, &message) {
                    info!("yielding to master {}", source);
                    return Exit::Yield;
                }
            },
        }
    }
}

fn yields_to(my_addr: Address, source: Address, message: &Message) -> bool {
    matches!(message, Message::ToSlaves(_)) && source != my_addr && source < my_addr
}

fn handle_slave_message(
    orders: &mut Vec<Order>,
    slaves: &mut HashMap<Address, Slave>,
    source: Address,
    message: &SlaveMessage,
) {
    match slaves.get_mut(&source) {
        Some(slave) => {
            slave.elev_data = message.elev_data.clone();
            slave.has_timed_out = false;
        }
        None => {
            info!("adding new slave {}", source);
            slaves.insert(
                source,
                Slave {
                    address: source,
                    elev_data: message.elev_data.clone(),
                    has_timed_out: false,
                },
            );
        }
    }
    update_orders(orders, &message.requests, source);
}

fn update_orders(orders: &mut Vec<Order>, requests: &[Order], sender: Address) {
    add_new_orders(orders, requests, sender);
    remove_done_orders(orders, requests);
}

fn add_new_orders(orders: &mut Vec<Order>, requests: &[Order], sender: Address) {
    for request in requests {
        let mut request = request.clone();
        request.taken_by = if request.button.call == Call::Cabin {
            Some(sender)
        } else {
            None
        };
        if Order::is_new(&request, orders) {
            orders.push(request);
        }
    }
}

fn remove_done_orders(orders: &mut Vec<Order>, requests: &[Order]) {
    for order in orders.iter_mut() {
        if requests.iter().any(|request| request.done && request.same_button(order)) {
            order.done = true;
        }
    }
    orders.retain(|order| !order.done);
}

/// Timed-out slaves are kept, so their cabin calls survive a reconnect.
fn mark_timed_out(slaves: &mut HashMap<Address, Slave>, address: Address) -> bool {
    match slaves.get_mut(&address) {
        Some(slave) => {
            slave.has_timed_out = true;
            true
        }
        None => false,
    }
}
