//! Charge port arbitration
//!
//! Producers report available power per (supplier, port) through [`service::context::Context`], the
//! [`service::Service`] picks the single port to charge from and applies it through the board.
#![no_std]

// This must come first so the macros are visible
pub(crate) mod fmt;

pub mod config;
pub mod selection;
pub mod service;
pub mod source_current;
pub mod state;
pub mod table;

pub use config::{Config, MAX_CHARGE_PORTS, PortLayout, SourceCurrentConfig};

/// Raw mutex used by every shared structure in this crate
pub type GlobalRawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
