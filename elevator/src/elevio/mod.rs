/// ----- ELEVATOR I/O -----
/// Driver for the elevator server (hardware or simulator) and the pollers
/// that turn its sampled inputs into channel events.

pub mod elev;
pub mod poll;
