use std::process;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use log::info;

use elevator::cabin;
use elevator::elevio::{elev, poll};
use elevator::master;
use elevator::slave;
use shared_resources::config::{self, NodeConfig};
use shared_resources::message::{Address, Message};

fn main() -> std::io::Result<()> {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    // READ CONFIGURATION
    let config = NodeConfig::get();

    // CONNECT TO THE ELEVATOR SERVER
    let server_addr = "localhost:".to_owned() + &config.server.port.to_string();
    let elevator = elev::Elevator::init(server_addr.as_str(), config.elevator.num_floors)?;
    info!("connected to elevator server on {}", server_addr);

    // CLEAR ALL LIGHTS
    for floor in 0..config.elevator.num_floors {
        for call in elev::HALL_UP..=elev::CAB {
            elevator.call_button_light(floor, call, false);
        }
    }
    elevator.door_light(false);
    elevator.stop_button_light(false);

    // INITIALIZE CHANNELS
    let (call_button_tx, call_button_rx) = unbounded();
    let (floor_sensor_tx, floor_sensor_rx) = unbounded();
    let (stop_button_tx, stop_button_rx) = unbounded();
    let (obstruction_tx, obstruction_rx) = unbounded();
    let (button_light_tx, button_light_rx) = unbounded::<(u8, u8, bool)>();
    let (target_floor_tx, target_floor_rx) = unbounded();
    let (floor_reached_tx, floor_reached_rx) = unbounded();
    let (completed_floor_tx, completed_floor_rx) = unbounded();
    let (missed_deadline_tx, missed_deadline_rx) = unbounded();
    // the slave role owns the node's only receiver on the master port and
    // fans observed snapshots out to the in-process master role
    let (foreign_master_tx, foreign_master_rx) = bounded::<(Address, Message)>(1);

    // INITIALIZE INPUT POLLERS
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::call_buttons(elevator, call_button_tx, config::ELEV_POLL_PERIOD));
    }
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::floor_sensor(elevator, floor_sensor_tx, config::ELEV_POLL_PERIOD));
    }
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::stop_button(elevator, stop_button_tx, config::ELEV_POLL_PERIOD));
    }
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::obstruction(elevator, obstruction_tx, config::ELEV_POLL_PERIOD));
    }

    // A STOP PRESS TERMINATES THE NODE, THE FLEET ABSORBS IT AS A CRASH
    {
        let elevator = elevator.clone();
        thread::spawn(move || loop {
            if stop_button_rx.recv().unwrap() {
                elevator.stop_button_light(true);
                info!("stop button pressed, shutting down");
                process::exit(0);
            }
        });
    }

    // INITIALIZE LAMP WRITER
    {
        let elevator = elevator.clone();
        thread::spawn(move || loop {
            let (floor, call, on) = button_light_rx.recv().unwrap();
            elevator.call_button_light(floor, call, on);
        });
    }

    // INITIALIZE THREAD FOR THE CABIN CONTROLLER
    {
        let elevator = elevator.clone();
        thread::spawn(move || {
            cabin::main(
                elevator,
                target_floor_rx,
                floor_sensor_rx,
                obstruction_rx,
                floor_reached_tx,
                completed_floor_tx,
                missed_deadline_tx,
            )
        });
    }

    // START THE MASTER ROLE IF REQUESTED
    if config.start_as_master {
        let master_config = config.clone();
        let foreign_master_rx = foreign_master_rx.clone();
        thread::spawn(move || master::main(master_config, None, None, foreign_master_rx));
    }

    // THE SLAVE ROLE RUNS ON THE MAIN THREAD
    slave::main(
        config,
        call_button_rx,
        floor_reached_rx,
        completed_floor_rx,
        missed_deadline_rx,
        target_floor_tx,
        button_light_tx,
        foreign_master_tx,
        foreign_master_rx,
    );
    Ok(())
}
