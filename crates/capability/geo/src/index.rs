//! 纯内存位置索引（非线程安全，由 `LocationIndex` 负责并发）。

use crate::distance::{bounding_box, haversine_m};
use domain::{EntityRef, FleetError, GeoPoint};
use rstar::{AABB, RTree, RTreeObject};
use std::collections::{BTreeSet, HashMap};

/// 实体当前所在位置。
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub zone: String,
    pub point: Option<GeoPoint>,
}

/// 邻近查询命中项。
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyHit {
    pub entity: EntityRef,
    pub point: GeoPoint,
    pub distance_m: f64,
}

/// R-tree 中的条目（坐标为 `[lon, lat]`）。
#[derive(Debug, Clone, PartialEq)]
struct GeoEntry {
    entity: EntityRef,
    position: [f64; 2],
}

impl RTreeObject for GeoEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

#[derive(Default)]
pub struct GeoIndex {
    placements: HashMap<EntityRef, Placement>,
    zones: HashMap<String, BTreeSet<EntityRef>>,
    tree: RTree<GeoEntry>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或移动实体；旧的分区与坐标条目先被移除。
    pub fn upsert(&mut self, entity: EntityRef, placement: Placement) {
        if self.placements.get(&entity) == Some(&placement) {
            return;
        }
        self.remove(&entity);
        self.zones
            .entry(placement.zone.clone())
            .or_default()
            .insert(entity.clone());
        if let Some(point) = placement.point {
            self.tree.insert(GeoEntry {
                entity: entity.clone(),
                position: [point.longitude, point.latitude],
            });
        }
        self.placements.insert(entity, placement);
    }

    pub fn remove(&mut self, entity: &EntityRef) -> bool {
        let Some(previous) = self.placements.remove(entity) else {
            return false;
        };
        if let Some(members) = self.zones.get_mut(&previous.zone) {
            members.remove(entity);
            if members.is_empty() {
                self.zones.remove(&previous.zone);
            }
        }
        if let Some(point) = previous.point {
            self.tree.remove(&GeoEntry {
                entity: entity.clone(),
                position: [point.longitude, point.latitude],
            });
        }
        true
    }

    pub fn placement(&self, entity: &EntityRef) -> Option<&Placement> {
        self.placements.get(entity)
    }

    /// 分区内的实体（有序）。
    pub fn by_zone(&self, zone: &str) -> Vec<EntityRef> {
        self.zones
            .get(zone)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 半径内的实体，按距离升序，距离相同按实体引用排序。
    pub fn nearby(&self, center: &GeoPoint, radius_m: f64) -> Result<Vec<NearbyHit>, FleetError> {
        center.validate()?;
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(FleetError::validation(format!(
                "radius must be a non-negative number: {radius_m}"
            )));
        }
        let candidates: Vec<&GeoEntry> = match bounding_box(center, radius_m) {
            Some((min, max)) => self
                .tree
                .locate_in_envelope(&AABB::from_corners(min, max))
                .collect(),
            None => self.tree.iter().collect(),
        };
        let mut hits: Vec<NearbyHit> = candidates
            .into_iter()
            .filter_map(|entry| {
                let point = GeoPoint::new(entry.position[1], entry.position[0]);
                let distance_m = haversine_m(center, &point);
                (distance_m <= radius_m).then(|| NearbyHit {
                    entity: entry.entity.clone(),
                    point,
                    distance_m,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn zones(&self) -> Vec<String> {
        let mut zones: Vec<String> = self.zones.keys().cloned().collect();
        zones.sort();
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(zone: &str, lat: f64, lon: f64) -> Placement {
        Placement {
            zone: zone.to_string(),
            point: Some(GeoPoint::new(lat, lon)),
        }
    }

    #[test]
    fn move_between_zones_updates_both() {
        let mut index = GeoIndex::new();
        let plate = EntityRef::vehicle("ABC1234");
        index.upsert(plate.clone(), at("A1", -23.5505, -46.6333));
        index.upsert(plate.clone(), at("B1", -23.5510, -46.6340));

        assert!(index.by_zone("A1").is_empty());
        assert_eq!(index.by_zone("B1"), vec![plate.clone()]);
        assert_eq!(index.zones(), vec!["B1".to_string()]);

        let hits = index
            .nearby(&GeoPoint::new(-23.5505, -46.6333), 50.0)
            .expect("nearby");
        assert!(hits.is_empty());
    }

    #[test]
    fn remove_drops_coordinates() {
        let mut index = GeoIndex::new();
        let device = EntityRef::device("SENSOR001");
        index.upsert(device.clone(), at("A1", -23.5505, -46.6333));
        assert!(index.remove(&device));
        assert!(!index.remove(&device));
        let hits = index
            .nearby(&GeoPoint::new(-23.5505, -46.6333), 10.0)
            .expect("nearby");
        assert!(hits.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn ties_are_ordered_by_entity() {
        let mut index = GeoIndex::new();
        index.upsert(EntityRef::vehicle("ZZZ9999"), at("A1", -23.5505, -46.6333));
        index.upsert(EntityRef::vehicle("AAA0001"), at("A1", -23.5505, -46.6333));
        let hits = index
            .nearby(&GeoPoint::new(-23.5505, -46.6333), 1.0)
            .expect("nearby");
        let ids: Vec<&str> = hits.iter().map(|hit| hit.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["AAA0001", "ZZZ9999"]);
    }

    #[test]
    fn negative_radius_is_rejected() {
        let index = GeoIndex::new();
        assert!(index.nearby(&GeoPoint::new(0.0, 0.0), -1.0).is_err());
    }
}
