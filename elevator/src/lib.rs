pub mod cabin;
pub mod elevio;
pub mod master;
pub mod slave;
