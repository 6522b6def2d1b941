//! Reads BaseStation (SBS) aircraft messages from a dump1090 feed, keeps the
//! latest state of every aircraft and periodically exports it to InfluxDB.

pub mod aircraft_cache;
pub mod cli;
pub mod config;
pub mod exporter;
pub mod ingestor;
pub mod logging;
pub mod parser;
pub mod sink;
pub mod thread_manager;
