/// ----- CABIN MODULE -----
/// Motion controller for the local cabin. Executes one commanded target
/// floor at a time: drives the motor, announces floors as they pass, holds
/// the doors at a served stop, and raises an alarm when a commanded move
/// produces no floor event in time.

use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use log::error;

use shared_resources::config::{DOOR_OPEN_TIME, MOVE_DEADLINE};
use shared_resources::direction::Direction;

use crate::elevio::elev::{self, Elevator};

#[derive(PartialEq, Debug)]
enum State {
    Idle,
    Moving,
    DoorOpen,
}

const CHECK_PERIOD: Duration = Duration::from_millis(50);

pub fn main(
    elevator: Elevator,
    target_floor_rx: Receiver<u8>,
    floor_sensor_rx: Receiver<u8>,
    obstruction_rx: Receiver<bool>,
    floor_reached_tx: Sender<u8>,
    completed_floor_tx: Sender<u8>,
    missed_deadline_tx: Sender<()>,
) {
    let mut floor: u8 = 0;
    let mut target: Option<u8> = None;
    let mut obstructed = false;
    let mut deadline = Instant::now() + MOVE_DEADLINE;
    let mut doors_close_at = Instant::now();
    let mut deadline_reported = false;

    // DRIVE TO A KNOWN FLOOR
    let mut state = match elevator.floor_sensor() {
        Some(f) => {
            floor = f;
            elevator.floor_indicator(f);
            State::Idle
        }
        None => {
            elevator.motor_direction(elev::DIRN_DOWN);
            State::Moving
        }
    };

    loop {
        select! {
            recv(target_floor_rx) -> msg => {
                let new_target = msg.unwrap();
                target = Some(new_target);
                if state == State::Idle {
                    if new_target == floor {
                        state = open_doors(&elevator, floor, &completed_floor_tx, &mut doors_close_at);
                        target = None;
                    } else {
                        state = start_move(&elevator, floor, new_target, &mut deadline);
                    }
                }
                // while moving, the new target takes effect at the next
                // floor; while the doors are open, when they close
            },
            recv(floor_sensor_rx) -> msg => {
                floor = msg.unwrap();
                elevator.floor_indicator(floor);
                deadline = Instant::now() + MOVE_DEADLINE;
                deadline_reported = false;
                floor_reached_tx.send(floor).unwrap();
                if state == State::Moving {
                    match target {
                        Some(t) if t == floor => {
                            state = open_doors(&elevator, floor, &completed_floor_tx, &mut doors_close_at);
                            target = None;
                        }
                        Some(t) => {
                            state = start_move(&elevator, floor, t, &mut deadline);
                        }
                        None => {
                            elevator.motor_direction(elev::DIRN_STOP);
                            state = State::Idle;
                        }
                    }
                }
            },
            recv(obstruction_rx) -> msg => {
                obstructed = msg.unwrap();
            },
            default(CHECK_PERIOD) => {
                match state {
                    State::DoorOpen => {
                        if obstructed {
                            doors_close_at = Instant::now() + DOOR_OPEN_TIME;
                        } else if Instant::now() >= doors_close_at {
                            elevator.door_light(false);
                            state = State::Idle;
                            if let Some(t) = target {
                                target = None;
                                if t == floor {
                                    state = open_doors(&elevator, floor, &completed_floor_tx, &mut doors_close_at);
                                } else {
                                    target = Some(t);
                                    state = start_move(&elevator, floor, t, &mut deadline);
                                }
                            }
                        }
                    }
                    State::Moving => {
                        if Instant::now() >= deadline && !deadline_reported {
                            error!("no floor reached within {:?}, reporting the move as failed", MOVE_DEADLINE);
                            deadline_reported = true;
                            missed_deadline_tx.send(()).unwrap();
                        }
                    }
                    State::Idle => (),
                }
            },
        }
    }
}

fn start_move(elevator: &Elevator, floor: u8, target: u8, deadline: &mut Instant) -> State {
    let dirn = match Direction::towards(floor, target) {
        Direction::Up => elev::DIRN_UP,
        Direction::Down => elev::DIRN_DOWN,
        Direction::Stopped => elev::DIRN_STOP,
    };
    elevator.motor_direction(dirn);
    *deadline = Instant::now() + MOVE_DEADLINE;
    State::Moving
}

fn open_doors(
    elevator: &Elevator,
    floor: u8,
    completed_floor_tx: &Sender<u8>,
    doors_close_at: &mut Instant,
) -> State {
    elevator.motor_direction(elev::DIRN_STOP);
    elevator.door_light(true);
    *doors_close_at = Instant::now() + DOOR_OPEN_TIME;
    completed_floor_tx.send(floor).unwrap();
    State::DoorOpen
}
