use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

/// Master broadcast period, and the slave send period.
pub const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// A slave whose last message is older than this is no longer delegated to.
pub const SLAVE_TIMEOUT_PERIOD: Duration = Duration::from_secs(5);

/// How long a fresh master waits for a remote slave before its own address
/// becomes acceptable as backup.
pub const BACKUP_DEADLINE: Duration = Duration::from_secs(10);

/// No master broadcast for this long makes the designated backup promote.
pub const MASTER_TIMEOUT: Duration = Duration::from_secs(1);

/// Scan period of the master's liveness task.
pub const LIVENESS_POLL_PERIOD: Duration = Duration::from_millis(100);

/// How long the cabin holds its doors open at a served floor.
pub const DOOR_OPEN_TIME: Duration = Duration::from_secs(3);

/// A commanded move that has not produced a floor event within this window
/// is reported as a missed deadline.
pub const MOVE_DEADLINE: Duration = Duration::from_secs(10);

/// Poll period for the elevator server inputs.
pub const ELEV_POLL_PERIOD: Duration = Duration::from_millis(25);

/// Latest master snapshot, written every tick, read on cold start.
pub const BACKUP_FILE: &str = "backupData.json";

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub network: HashMap<String, u16>,
    pub elevator: HashMap<String, u8>,
    pub server: HashMap<String, u16>,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub master_port: u16,
    pub slave_port: u16,
}

#[derive(Debug, Clone)]
pub struct ElevatorConfig {
    pub num_floors: u8,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub start_as_master: bool,
    pub self_as_backup: bool,
    pub network: NetworkConfig,
    pub elevator: ElevatorConfig,
    pub server: ServerConfig,
}

const DEFAULT_CONFIG: &str = r#"{
    "network": { "master_port": 19738, "slave_port": 19739 },
    "elevator": { "num_floors": 4 },
    "server": { "port": 15657 }
}"#;

fn read_config_file() -> Result<ConfigFile, serde_json::Error> {
    let candidates = [
        "config.json",
        "../config.json",
        "_config.json",
        "../_config.json",
    ];
    for path in candidates {
        if let Ok(contents) = fs::read_to_string(path) {
            return serde_json::from_str(&contents);
        }
    }
    println!("No configuration file provided, using default settings...");
    serde_json::from_str(DEFAULT_CONFIG)
}

fn parse_flags() -> (bool, bool) {
    let (mut start_as_master, mut self_as_backup) = (false, false);
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--master" => start_as_master = true,
            "--self-as-backup" => self_as_backup = true,
            other => {
                println!("illegal argument {}, skipping...", other);
            }
        }
    }
    (start_as_master, self_as_backup)
}

impl NodeConfig {
    pub fn get() -> Self {
        let config_file = read_config_file().unwrap();
        let (start_as_master, self_as_backup) = parse_flags();
        Self::from_file(config_file, start_as_master, self_as_backup)
    }

    pub fn from_file(config_file: ConfigFile, start_as_master: bool, self_as_backup: bool) -> Self {
        NodeConfig {
            start_as_master,
            self_as_backup,
            network: NetworkConfig {
                master_port: config_file.network["master_port"],
                slave_port: config_file.network["slave_port"],
            },
            elevator: ElevatorConfig {
                num_floors: config_file.elevator["num_floors"],
            },
            server: ServerConfig {
                port: config_file.server["port"],
            },
        }
    }
}
