#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod dump;
pub mod host;
pub mod id;
pub mod io_driver;
