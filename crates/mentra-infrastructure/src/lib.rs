//! File-backed repositories, configuration loading and the simulated
//! phone used when the shell runs on a desktop.

pub mod config_service;
pub mod paths;
pub mod simulated;
pub mod storage;
pub mod toml_alias_repository;
pub mod toml_contact_directory;

pub use crate::config_service::ConfigService;
pub use crate::paths::{MentraPaths, PathError};
pub use crate::simulated::{
    SimulatedCarrier, SimulatedDevice, SimulatedDeviceInfo, SimulatedMessageStore,
};
pub use crate::toml_alias_repository::TomlContactAliasRepository;
pub use crate::toml_contact_directory::TomlContactDirectory;
