use crate::order::{Order, OrderButton};

/// Locally observed presses and completions that no master snapshot has
/// acknowledged yet. Entries leave the buffer only through `reconcile`, so
/// nothing is forgotten while the fleet has no reachable master.
#[derive(Debug, Clone)]
pub struct RequestBuffer {
    pending: Vec<Order>,
}

impl RequestBuffer {
    pub fn new() -> Self {
        RequestBuffer {
            pending: Vec::new(),
        }
    }

    pub fn insert_request(&mut self, request: Order) {
        let duplicate = self
            .pending
            .iter()
            .any(|pending| pending.same_button(&request) && pending.done == request.done);
        if !duplicate {
            self.pending.push(request);
        }
    }

    pub fn requests(&self) -> Vec<Order> {
        self.pending.clone()
    }

    pub fn has_done(&self, button: &OrderButton) -> bool {
        self.pending
            .iter()
            .any(|pending| pending.done && pending.button == *button)
    }

    /// Drops every press the master now carries and every completion the
    /// master has honored by removing the order.
    pub fn reconcile(&mut self, orders: &[Order]) {
        self.pending.retain(|pending| {
            let present = orders.iter().any(|order| order.same_button(pending));
            if pending.done {
                present
            } else {
                !present
            }
        });
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}
