//! 位置索引
//!
//! - 分区索引：分区编码 → 该分区内的实体集合
//! - 坐标索引：R-tree 按经纬度包围盒粗筛，再用球面距离精确过滤
//! - `LocationIndex`：并发读写封装，支持后台全量重建（日志回放 + 整体替换）

pub mod distance;
pub mod index;
pub mod live;

pub use distance::{EARTH_RADIUS_M, haversine_m};
pub use index::{GeoIndex, NearbyHit, Placement};
pub use live::{IndexOp, LocationIndex};
