pub mod choose;
pub mod config_cmd;
pub mod pages;
pub mod rate;
pub mod terminal;
