pub mod bcast;
