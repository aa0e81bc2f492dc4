use crate::call::Call;
use crate::message::Address;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderButton {
    pub call: Call,
    pub floor: u8,
}

/// A single request known to the fleet. Two orders are the same order when
/// their buttons are equal; `taken_by` and `done` are bookkeeping that may
/// differ between copies of the same order.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Order {
    pub button: OrderButton,
    pub taken_by: Option<Address>,
    pub done: bool,
}

impl Order {
    pub fn new_request(call: Call, floor: u8, origin: Address) -> Self {
        Order {
            button: OrderButton { call, floor },
            taken_by: if call == Call::Cabin { Some(origin) } else { None },
            done: false,
        }
    }

    pub fn same_button(&self, other: &Order) -> bool {
        self.button == other.button
    }

    pub fn is_new(request: &Order, orders: &[Order]) -> bool {
        !orders.iter().any(|order| order.same_button(request))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn addr(last: u8) -> Address {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn identity_ignores_bookkeeping() {
        let a = Order::new_request(Call::HallUp, 2, addr(1));
        let mut b = Order::new_request(Call::HallUp, 2, addr(2));
        b.taken_by = Some(addr(3));
        b.done = true;
        assert!(a.same_button(&b));
    }

    #[test]
    fn different_floor_or_call_is_a_different_order() {
        let a = Order::new_request(Call::HallUp, 2, addr(1));
        let b = Order::new_request(Call::HallUp, 3, addr(1));
        let c = Order::new_request(Call::HallDown, 2, addr(1));
        assert!(!a.same_button(&b));
        assert!(!a.same_button(&c));
    }

    #[test]
    fn cabin_requests_are_bound_to_their_origin() {
        let order = Order::new_request(Call::Cabin, 1, addr(7));
        assert_eq!(order.taken_by, Some(addr(7)));
        let order = Order::new_request(Call::HallDown, 1, addr(7));
        assert_eq!(order.taken_by, None);
    }

    #[test]
    fn is_new_matches_on_button_only() {
        let orders = vec![Order::new_request(Call::HallUp, 2, addr(1))];
        let mut duplicate = Order::new_request(Call::HallUp, 2, addr(2));
        duplicate.done = true;
        assert!(!Order::is_new(&duplicate, &orders));
        let fresh = Order::new_request(Call::Cabin, 2, addr(2));
        assert!(Order::is_new(&fresh, &orders));
    }
}
