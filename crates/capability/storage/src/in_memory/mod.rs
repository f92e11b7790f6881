//! 内存存储实现模块
//!
//! 用于本地演示、测试以及单进程部署。
//!
//! 包含以下实现：
//! - AddressStore: InMemoryAddressStore
//! - UserStore: InMemoryUserStore
//! - ZoneStore: InMemoryZoneStore
//! - VehicleStore: InMemoryVehicleStore
//! - DeviceStore: InMemoryDeviceStore
//! - UsageStore: InMemoryUsageStore
//! - ReadingStore + AlertStore: InMemoryEventLedger

pub mod address;
pub mod device;
pub mod ledger;
pub mod table;
pub mod usage;
pub mod user;
pub mod vehicle;
pub mod zone;

pub use address::*;
pub use device::*;
pub use ledger::*;
pub use table::*;
pub use usage::*;
pub use user::*;
pub use vehicle::*;
pub use zone::*;
