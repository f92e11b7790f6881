//! Handlers 模块

pub mod alerts;
pub mod devices;
pub mod locations;
pub mod readings;
pub mod system;
pub mod vehicles;

pub use alerts::*;
pub use devices::*;
pub use locations::*;
pub use readings::*;
pub use system::*;
pub use vehicles::*;
