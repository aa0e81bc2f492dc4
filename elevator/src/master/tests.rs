use std::net::{IpAddr, Ipv4Addr};

use shared_resources::elev_data::ElevData;

use super::*;

fn addr(last: u8) -> Address {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn press(call: Call, floor: u8) -> Order {
    Order::new_request(call, floor, addr(99))
}

fn done(order: &Order) -> Order {
    Order {
        done: true,
        ..order.clone()
    }
}

fn message(requests: Vec<Order>) -> SlaveMessage {
    SlaveMessage {
        elev_data: ElevData::new(),
        requests,
    }
}

#[test]
fn applying_the_same_batch_twice_changes_nothing() {
    let batch = vec![press(Call::HallUp, 0), press(Call::HallDown, 3), press(Call::Cabin, 1)];
    let mut orders = Vec::new();

    update_orders(&mut orders, &batch, addr(1));
    let after_first: Vec<_> = orders.iter().map(|order| order.button).collect();

    update_orders(&mut orders, &batch, addr(1));
    let after_second: Vec<_> = orders.iter().map(|order| order.button).collect();

    assert_eq!(after_first.len(), 3);
    assert_eq!(after_first, after_second);
}

#[test]
fn cabin_requests_are_bound_to_the_sender() {
    let mut orders = Vec::new();
    update_orders(&mut orders, &[press(Call::Cabin, 2)], addr(4));
    assert_eq!(orders[0].taken_by, Some(addr(4)));
}

#[test]
fn hall_requests_arrive_unassigned() {
    let mut orders = Vec::new();
    let mut request = press(Call::HallUp, 2);
    request.taken_by = Some(addr(9));
    update_orders(&mut orders, &[request], addr(4));
    assert_eq!(orders[0].taken_by, None);
}

#[test]
fn done_requests_remove_their_orders() {
    let order = press(Call::HallUp, 2);
    let mut orders = Vec::new();
    update_orders(&mut orders, &[order.clone()], addr(1));
    assert_eq!(orders.len(), 1);

    update_orders(&mut orders, &[done(&order)], addr(1));
    assert!(orders.is_empty());
}

#[test]
fn replayed_done_request_does_not_resurrect_the_order() {
    let order = press(Call::HallDown, 1);
    let mut orders = Vec::new();
    update_orders(&mut orders, &[done(&order)], addr(1));
    assert!(orders.is_empty());
}

#[test]
fn resent_press_keeps_the_existing_assignment() {
    let mut orders = Vec::new();
    update_orders(&mut orders, &[press(Call::HallUp, 2)], addr(1));
    orders[0].taken_by = Some(addr(7));

    update_orders(&mut orders, &[press(Call::HallUp, 2)], addr(2));
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].taken_by, Some(addr(7)));
}

#[test]
fn slaves_are_recorded_on_first_contact_and_kept_after_timeout() {
    let mut orders = Vec::new();
    let mut slaves = HashMap::new();

    handle_slave_message(&mut orders, &mut slaves, addr(3), &message(vec![press(Call::Cabin, 1)]));
    assert!(slaves.contains_key(&addr(3)));
    assert!(!slaves[&addr(3)].has_timed_out);

    assert!(mark_timed_out(&mut slaves, addr(3)));
    assert!(slaves.contains_key(&addr(3)));
    assert!(slaves[&addr(3)].has_timed_out);
    assert_eq!(orders.len(), 1);

    // the slave coming back clears the flag
    handle_slave_message(&mut orders, &mut slaves, addr(3), &message(Vec::new()));
    assert!(!slaves[&addr(3)].has_timed_out);

    assert!(!mark_timed_out(&mut slaves, addr(8)));
}

#[test]
fn only_lower_addressed_masters_win_a_split_brain() {
    let snapshot = Message::ToSlaves(MasterData {
        assigned_backup: addr(1),
        orders: Vec::new(),
        slaves: HashMap::new(),
    });
    assert!(yields_to(addr(5), addr(2), &snapshot));
    assert!(!yields_to(addr(2), addr(5), &snapshot));
    assert!(!yields_to(addr(5), addr(5), &snapshot));

    let slave_traffic = Message::ToMaster(message(Vec::new()));
    assert!(!yields_to(addr(5), addr(2), &slave_traffic));
}
