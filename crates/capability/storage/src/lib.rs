//! # Fleet Storage 模块
//!
//! 实体存储抽象层：主数据、资产、用车记录以及读数 / 事件 / 告警账本。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：所有资源存储的异步 Trait 接口
//! 2. **数据模型层** (`models.rs`)：写入结果、接入提交单元、告警过滤条件
//! 3. **验证辅助层** (`validation.rs`)：写入前字段校验
//! 4. **实现层** (`in_memory/`)：`RwLock` 保护的内存实现
//!
//! ## 一致性约定
//!
//! - 单条记录整体替换，读者只会看到完整记录
//! - 不可变字段（地址全部字段、设备类型、车辆底盘号 / 发动机号、用户出生日期）
//!   变化时返回 `Conflict`，原记录保持不变
//! - 读数、事件、告警从不删除；一次接入通过 `commit_ingest` 原子落盘
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use fleet_storage::{InMemoryVehicleStore, VehicleStore};
//!
//! let store = InMemoryVehicleStore::new();
//! let vehicle = store.find_vehicle("abc1234").await?;
//! ```

pub mod in_memory;
pub mod models;
pub mod traits;
pub mod validation;

pub use models::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::{
    EntityTable, InMemoryAddressStore, InMemoryDeviceStore, InMemoryEventLedger,
    InMemoryUsageStore, InMemoryUserStore, InMemoryVehicleStore, InMemoryZoneStore,
};
