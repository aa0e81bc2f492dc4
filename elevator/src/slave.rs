/// ----- SLAVE MODULE -----
/// The role every node runs. Aggregates local button presses and cabin
/// state, reports them to the master every tick, executes the work the
/// latest snapshot delegates to this node, and resurrects the master role
/// when this node is the designated backup of a master that went silent.

use std::thread;
use std::time::Instant;

use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use log::{error, info};

use network_rust::udpnet::bcast;
use network_rust::udpnet::bcast::BcError;

use shared_resources::call::Call;
use shared_resources::config::{self, NodeConfig};
use shared_resources::direction::Direction;
use shared_resources::elev_data::ElevData;
use shared_resources::message::{self, Address, MasterData, Message, SlaveMessage};
use shared_resources::order::Order;
use shared_resources::request_buffer::RequestBuffer;

use crate::elevio::poll::CallButton;
use crate::master;

pub fn main(
    config: NodeConfig,
    call_button_rx: Receiver<CallButton>,
    floor_reached_rx: Receiver<u8>,
    completed_floor_rx: Receiver<u8>,
    missed_deadline_rx: Receiver<()>,
    target_floor_tx: Sender<u8>,
    button_light_tx: Sender<(u8, u8, bool)>,
    foreign_master_tx: Sender<(Address, Message)>,
    foreign_master_rx: Receiver<(Address, Message)>,
) {
    let my_addr = message::local_ip();
    let num_floors = config.elevator.num_floors;

    let (to_master_tx, to_master_rx) = unbounded::<(Option<Address>, Message)>();
    {
        let port = config.network.slave_port;
        thread::spawn(move || match bcast::tx(port, to_master_rx) {
            Err(BcError::IOError(_)) => {
                panic!("Could not establish sending connection with master. Port {} already in use?", port)
            }
            _ => (),
        });
    }

    let (from_master_tx, from_master_rx) = unbounded::<(Address, Message)>();
    {
        let port = config.network.master_port;
        thread::spawn(move || match bcast::rx(port, from_master_tx) {
            Err(BcError::IOError(_)) => {
                panic!("Could not establish receiving connection with master. Port {} already in use?", port)
            }
            _ => (),
        });
    }

    let send_ticker = tick(config::SEND_INTERVAL);

    let mut pending = RequestBuffer::new();
    let mut my_orders: Vec<Order> = Vec::new();
    let mut target_floor: Option<u8> = None;
    let mut elev_data = ElevData::new();
    let mut current_master: Option<Address> = None;
    let mut last_snapshot: Option<MasterData> = None;
    let mut master_seen_at = Instant::now();
    let mut promoted = false;
    let mut cabin_failed = false;

    loop {
        select! {
            recv(call_button_rx) -> msg => {
                let button = msg.unwrap();
                if let Some(call) = Call::from_button_index(button.call) {
                    if call == Call::Cabin {
                        elev_data.cabin_calls.insert(button.floor);
                        button_light_tx.send((button.floor, button.call, true)).unwrap();
                    }
                    pending.insert_request(Order::new_request(call, button.floor, my_addr));
                }
            },
            recv(floor_reached_rx) -> msg => {
                let floor = msg.unwrap();
                let previous = elev_data.floor;
                elev_data.floor = floor;
                // keep the arrival leg when this floor is the target, the
                // stop policy needs to know how the cabin came in
                elev_data.direction = match target_floor {
                    Some(target) if target != floor => Direction::towards(floor, target),
                    _ => Direction::towards(previous, floor),
                };
                cabin_failed = false;
            },
            recv(completed_floor_rx) -> msg => {
                let floor = msg.unwrap();
                let arrival = elev_data.direction;
                elev_data.direction = Direction::Stopped;
                elev_data.cabin_calls.remove(&floor);
                target_floor = None;
                for order in &my_orders {
                    if order.button.floor == floor
                        && served_by_stop(order.button.call, floor, arrival, num_floors)
                    {
                        pending.insert_request(Order { done: true, ..order.clone() });
                    }
                }
                cabin_failed = false;
            },
            recv(missed_deadline_rx) -> _ => {
                error!("cabin failed to reach its target, going quiet until it recovers");
                cabin_failed = true;
            },
            recv(from_master_rx) -> msg => {
                let (source, message) = msg.unwrap();
                let data = match message {
                    Message::ToSlaves(data) => data,
                    _ => continue,
                };
                // the in-process master role watches for competitors through
                // this node's one receiver on the master port
                let _ = foreign_master_tx.try_send((source, Message::ToSlaves(data.clone())));
                current_master = Some(source);
                master_seen_at = Instant::now();
                promoted = false;

                my_orders = data
                    .orders
                    .iter()
                    .filter(|order| order.taken_by == Some(my_addr))
                    .cloned()
                    .collect();
                // a crashed and recovered cabin gets its calls back from the
                // snapshot, except the ones it just reported served
                for order in &my_orders {
                    if order.button.call == Call::Cabin && !pending.has_done(&order.button) {
                        elev_data.cabin_calls.insert(order.button.floor);
                    }
                }
                pending.reconcile(&data.orders);
                set_lamps(&data.orders, &elev_data, num_floors, &button_light_tx);
                if let Some(target) = choose_target(&my_orders, &pending, &elev_data) {
                    if target_floor != Some(target) {
                        target_floor = Some(target);
                        target_floor_tx.send(target).unwrap();
                    }
                }
                last_snapshot = Some(data);
            },
            recv(send_ticker) -> _ => {
                if master_seen_at.elapsed() > config::MASTER_TIMEOUT {
                    // the master is gone, fall back to broadcasting so its
                    // successor can hear the fleet
                    current_master = None;
                    if !promoted {
                        if let Some(snapshot) = &last_snapshot {
                            if snapshot.assigned_backup == my_addr {
                                info!("master went silent, taking over as {}", my_addr);
                                promoted = true;
                                let master_config = config.clone();
                                let initial_orders = snapshot.orders.clone();
                                let initial_slaves = snapshot.slaves.clone();
                                let foreign_master_rx = foreign_master_rx.clone();
                                thread::spawn(move || {
                                    master::main(
                                        master_config,
                                        Some(initial_orders),
                                        Some(initial_slaves),
                                        foreign_master_rx,
                                    )
                                });
                            }
                        }
                    }
                }
                if !cabin_failed {
                    let message = SlaveMessage {
                        elev_data: elev_data.clone(),
                        requests: pending.requests(),
                    };
                    to_master_tx.send((current_master, Message::ToMaster(message))).unwrap();
                }
            },
        }
    }
}

/// Which buttons a stop at `floor` honors, given the direction the cabin
/// arrived with.
fn served_by_stop(call: Call, floor: u8, arrival: Direction, num_floors: u8) -> bool {
    match call {
        Call::Cabin => true,
        Call::HallUp => arrival != Direction::Down || floor == 0,
        Call::HallDown => arrival != Direction::Up || floor + 1 == num_floors,
    }
}

/// Nearest floor with work for this elevator, lower floor on a tie.
/// Completions still waiting for acknowledgement do not count as work.
fn choose_target(my_orders: &[Order], pending: &RequestBuffer, elev_data: &ElevData) -> Option<u8> {
    let here = elev_data.floor;
    my_orders
        .iter()
        .filter(|order| !pending.has_done(&order.button))
        .map(|order| order.button.floor)
        .chain(elev_data.cabin_calls.iter().copied())
        .min_by_key(|floor| (floor.abs_diff(here), *floor))
}

/// Hall lamps mirror the fleet-wide order set, cabin lamps the local calls.
fn set_lamps(
    orders: &[Order],
    elev_data: &ElevData,
    num_floors: u8,
    button_light_tx: &Sender<(u8, u8, bool)>,
) {
    for floor in 0..num_floors {
        for call in Call::iter_hall() {
            let on = orders
                .iter()
                .any(|order| order.button.floor == floor && order.button.call == call);
            button_light_tx.send((floor, call.as_button_index(), on)).unwrap();
        }
        let on = elev_data.cabin_calls.contains(&floor);
        button_light_tx.send((floor, Call::Cabin.as_button_index(), on)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn addr() -> Address {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    #[test]
    fn stops_honor_buttons_matching_the_arrival_direction() {
        assert!(served_by_stop(Call::Cabin, 2, Direction::Up, 4));
        assert!(served_by_stop(Call::HallUp, 2, Direction::Up, 4));
        assert!(!served_by_stop(Call::HallDown, 2, Direction::Up, 4));
        assert!(served_by_stop(Call::HallDown, 2, Direction::Down, 4));
        assert!(!served_by_stop(Call::HallUp, 2, Direction::Down, 4));
    }

    #[test]
    fn terminal_floors_honor_both_hall_buttons() {
        assert!(served_by_stop(Call::HallUp, 0, Direction::Down, 4));
        assert!(served_by_stop(Call::HallDown, 3, Direction::Up, 4));
    }

    #[test]
    fn arriving_stopped_honors_everything_at_the_floor() {
        for call in Call::iter() {
            assert!(served_by_stop(call, 2, Direction::Stopped, 4));
        }
    }

    #[test]
    fn target_is_the_nearest_work_lower_floor_on_ties() {
        let mut elev_data = ElevData::new();
        elev_data.floor = 2;
        let my_orders = vec![
            Order::new_request(Call::HallUp, 0, addr()),
            Order::new_request(Call::HallDown, 3, addr()),
        ];
        let pending = RequestBuffer::new();
        assert_eq!(choose_target(&my_orders, &pending, &elev_data), Some(3));

        elev_data.floor = 1;
        assert_eq!(choose_target(&my_orders, &pending, &elev_data), Some(0));

        let tied = vec![
            Order::new_request(Call::HallUp, 1, addr()),
            Order::new_request(Call::HallDown, 3, addr()),
        ];
        elev_data.floor = 2;
        assert_eq!(choose_target(&tied, &pending, &elev_data), Some(1));
    }

    #[test]
    fn cabin_calls_count_as_work() {
        let mut elev_data = ElevData::new();
        elev_data.floor = 1;
        elev_data.cabin_calls.insert(2);
        let pending = RequestBuffer::new();
        assert_eq!(choose_target(&[], &pending, &elev_data), Some(2));
    }

    #[test]
    fn served_but_unacknowledged_orders_are_not_retargeted() {
        let mut elev_data = ElevData::new();
        elev_data.floor = 1;
        let order = Order::new_request(Call::HallUp, 1, addr());
        let mut pending = RequestBuffer::new();
        pending.insert_request(Order { done: true, ..order.clone() });
        assert_eq!(choose_target(&[order], &pending, &elev_data), None);
    }
}
