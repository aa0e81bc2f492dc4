use std::collections::HashMap;
use std::error;
use std::fmt;

use shared_resources::call::Call;
use shared_resources::direction::Direction;
use shared_resources::message::{Address, Slave};
use shared_resources::order::Order;

#[derive(Debug, PartialEq, Eq)]
pub enum DelegationError {
    NoLiveSlaves,
}

impl fmt::Display for DelegationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegationError::NoLiveSlaves => {
                write!(f, "no live slaves to delegate work to, keeping current assignments")
            }
        }
    }
}

impl error::Error for DelegationError {}

/// Assigns every hall order to exactly one live slave, in place. Cabin
/// orders belong to the slave that produced them and are never touched.
///
/// Orders are visited in set order and live slaves in address order, and the
/// cost is a function of the reported slave state alone, so two masters with
/// the same input produce the same assignment.
pub fn delegate_work(
    slaves: &HashMap<Address, Slave>,
    orders: &mut [Order],
) -> Result<(), DelegationError> {
    let mut live: Vec<&Slave> = slaves.values().filter(|slave| !slave.has_timed_out).collect();
    if live.is_empty() {
        return Err(DelegationError::NoLiveSlaves);
    }
    live.sort_by_key(|slave| slave.address);

    let mut load: HashMap<Address, u32> = HashMap::new();
    for order in orders.iter_mut() {
        if order.button.call == Call::Cabin {
            continue;
        }
        let (_, address) = live
            .iter()
            .map(|slave| {
                let busy = load.get(&slave.address).copied().unwrap_or(0);
                (cost(slave, order.button.floor) + busy, slave.address)
            })
            .min()
            .unwrap();
        order.taken_by = Some(address);
        *load.entry(address).or_insert(0) += 1;
    }
    Ok(())
}

/// A slave standing still at the order's floor costs nothing; distance and
/// moving away from the order both cost extra.
fn cost(slave: &Slave, floor: u8) -> u32 {
    let here = slave.elev_data.floor;
    let distance = here.abs_diff(floor) as u32;
    let penalty = match slave.elev_data.direction {
        Direction::Stopped => 0,
        direction if direction == Direction::towards(here, floor) => 1,
        _ => 6,
    };
    2 * distance + penalty
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use shared_resources::elev_data::ElevData;

    use super::*;

    fn addr(last: u8) -> Address {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn slave(last: u8, floor: u8, direction: Direction, has_timed_out: bool) -> (Address, Slave) {
        let address = addr(last);
        let elev_data = ElevData {
            floor,
            direction,
            ..ElevData::new()
        };
        (
            address,
            Slave {
                address,
                elev_data,
                has_timed_out,
            },
        )
    }

    fn press(call: Call, floor: u8) -> Order {
        Order::new_request(call, floor, addr(99))
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let slaves: HashMap<_, _> = [
            slave(2, 0, Direction::Stopped, false),
            slave(1, 3, Direction::Down, false),
        ]
        .into_iter()
        .collect();
        let orders = vec![press(Call::HallUp, 0), press(Call::HallDown, 3)];

        let mut first = orders.clone();
        let mut second = orders;
        delegate_work(&slaves, &mut first).unwrap();
        delegate_work(&slaves, &mut second).unwrap();

        let taken: Vec<_> = first.iter().map(|order| order.taken_by).collect();
        assert_eq!(taken, second.iter().map(|order| order.taken_by).collect::<Vec<_>>());
        assert!(taken.iter().all(|taken_by| taken_by.is_some()));
    }

    #[test]
    fn no_live_slaves_keeps_current_assignments() {
        let slaves: HashMap<_, _> = [slave(1, 0, Direction::Stopped, true)].into_iter().collect();
        let mut orders = vec![press(Call::HallUp, 2)];
        orders[0].taken_by = Some(addr(1));

        let result = delegate_work(&slaves, &mut orders);
        assert_eq!(result, Err(DelegationError::NoLiveSlaves));
        assert_eq!(orders[0].taken_by, Some(addr(1)));
    }

    #[test]
    fn cabin_orders_are_never_reassigned() {
        let slaves: HashMap<_, _> = [slave(1, 0, Direction::Stopped, false)].into_iter().collect();
        let mut orders = vec![press(Call::Cabin, 2)];
        orders[0].taken_by = Some(addr(5));

        delegate_work(&slaves, &mut orders).unwrap();
        assert_eq!(orders[0].taken_by, Some(addr(5)));
    }

    #[test]
    fn timed_out_slaves_lose_their_hall_orders() {
        let slaves: HashMap<_, _> = [
            slave(1, 2, Direction::Stopped, true),
            slave(2, 0, Direction::Stopped, false),
        ]
        .into_iter()
        .collect();
        let mut orders = vec![press(Call::HallDown, 2)];
        orders[0].taken_by = Some(addr(1));

        delegate_work(&slaves, &mut orders).unwrap();
        assert_eq!(orders[0].taken_by, Some(addr(2)));
    }

    #[test]
    fn standing_at_the_floor_beats_being_floors_away() {
        let slaves: HashMap<_, _> = [
            slave(1, 0, Direction::Stopped, false),
            slave(2, 2, Direction::Stopped, false),
        ]
        .into_iter()
        .collect();
        let mut orders = vec![press(Call::HallUp, 2)];

        delegate_work(&slaves, &mut orders).unwrap();
        assert_eq!(orders[0].taken_by, Some(addr(2)));
    }

    #[test]
    fn equal_costs_break_ties_by_address_and_load_spreads_work() {
        let slaves: HashMap<_, _> = [
            slave(2, 1, Direction::Stopped, false),
            slave(1, 1, Direction::Stopped, false),
        ]
        .into_iter()
        .collect();
        let mut orders = vec![press(Call::HallUp, 1), press(Call::HallDown, 1)];

        delegate_work(&slaves, &mut orders).unwrap();
        assert_eq!(orders[0].taken_by, Some(addr(1)));
        assert_eq!(orders[1].taken_by, Some(addr(2)));
    }
}
