//! Core trait definitions

mod device;

pub use device::DeviceSource;
