//! 演示数据（分区、地址、用户、设备、车辆）。

use crate::Registry;
use domain::{
    Address, Device, DeviceLocation, DeviceStatus, DeviceType, FleetError, GeoPoint,
    RequestContext, User, UserRole, Vehicle, VehicleDocuments, VehicleLocation, VehicleStatus,
    Zone,
};
use fleet_storage::UpsertOutcome;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub zones: Vec<Zone>,
    pub addresses: Vec<Address>,
    pub users: Vec<User>,
    pub devices: Vec<Device>,
    pub vehicles: Vec<Vehicle>,
}

/// 每类实体新写入的条数（重复应用时为零）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub zones: usize,
    pub addresses: usize,
    pub users: usize,
    pub devices: usize,
    pub vehicles: usize,
}

impl SeedData {
    pub fn demo() -> Self {
        Self {
            zones: vec![
                zone("A1", "Setor A - Zona 1"),
                zone("A2", "Setor A - Zona 2"),
                zone("B1", "Setor B - Zona 1"),
                zone("ENTRADA", "Entrada principal"),
            ],
            addresses: vec![
                Address {
                    postal_code: "01310100".to_string(),
                    country: "Brasil".to_string(),
                    state: "SP".to_string(),
                    city: "São Paulo".to_string(),
                    district: "Bela Vista".to_string(),
                    street: "Avenida Paulista".to_string(),
                    number: "123".to_string(),
                    complement: Some("Próximo ao MASP".to_string()),
                },
                Address {
                    postal_code: "04038001".to_string(),
                    country: "Brasil".to_string(),
                    state: "SP".to_string(),
                    city: "São Paulo".to_string(),
                    district: "Vila Olímpia".to_string(),
                    street: "Rua Funchal".to_string(),
                    number: "456".to_string(),
                    complement: Some("Edifício Comercial".to_string()),
                },
            ],
            users: vec![
                user("12345678901", "João Silva", "1990-05-15", "01310100", "ABC1234"),
                user("98765432109", "Maria Santos", "1985-08-22", "04038001", "DEF5678"),
            ],
            devices: vec![
                device(
                    "SENSOR001",
                    "Sensor de Movimento A1",
                    DeviceType::MotionSensor,
                    "A1",
                    GeoPoint::new(-23.5505, -46.6333),
                    [
                        ("sensitivity", json!("high")),
                        ("detection_range", json!(10)),
                        ("alert_threshold", json!(0.8)),
                        ("operating_hours", json!("24/7")),
                    ],
                ),
                device(
                    "CAMERA001",
                    "Câmera Principal",
                    DeviceType::Camera,
                    "ENTRADA",
                    GeoPoint::new(-23.5500, -46.6330),
                    [
                        ("resolution", json!("1080p")),
                        ("fps", json!(30)),
                        ("night_vision", json!(true)),
                        ("motion_detection", json!(true)),
                        ("recording", json!("continuous")),
                    ],
                ),
                device(
                    "LOCK001",
                    "Trava Inteligente A1",
                    DeviceType::LockActuator,
                    "A1",
                    GeoPoint::new(-23.5505, -46.6333),
                    [
                        ("auto_lock", json!(true)),
                        ("unlock_method", json!(["rfid", "mobile_app"])),
                        ("timeout", json!(300)),
                        ("force_threshold", json!(50)),
                    ],
                ),
            ],
            vehicles: vec![
                Vehicle {
                    plate: "ABC1234".to_string(),
                    model: "Honda CG 160".to_string(),
                    owner_id: Some("12345678901".to_string()),
                    documents: VehicleDocuments {
                        chassis: Some("9BWZZZ377VT004251".to_string()),
                        engine: Some("JH2PC4001LM200001".to_string()),
                        registration: Some("123456789".to_string()),
                        reference_price: Some(15000.0),
                    },
                    location: VehicleLocation {
                        point: Some(GeoPoint::new(-23.5505, -46.6333)),
                        slot: Some("A1-001".to_string()),
                        sector: Some("Setor A".to_string()),
                        floor: Some(1),
                        ..VehicleLocation::in_zone("A1")
                    },
                    status: VehicleStatus::Available,
                    battery_level: 95,
                    current_user: None,
                    retired: false,
                    updated_at_ms: 0,
                },
                Vehicle {
                    plate: "DEF5678".to_string(),
                    model: "Yamaha Factor".to_string(),
                    owner_id: Some("98765432109".to_string()),
                    documents: VehicleDocuments {
                        chassis: Some("9C2JC3110LR123456".to_string()),
                        engine: Some("JH2PC4002LM200002".to_string()),
                        registration: Some("987654321".to_string()),
                        reference_price: Some(18000.0),
                    },
                    location: VehicleLocation {
                        point: Some(GeoPoint::new(-23.5515, -46.6343)),
                        slot: Some("A2-005".to_string()),
                        sector: Some("Setor A".to_string()),
                        floor: Some(1),
                        ..VehicleLocation::in_zone("A2")
                    },
                    status: VehicleStatus::InUse,
                    battery_level: 78,
                    current_user: Some("12345678901".to_string()),
                    retired: false,
                    updated_at_ms: 0,
                },
            ],
        }
    }
}

fn zone(code: &str, name: &str) -> Zone {
    Zone {
        code: code.to_string(),
        name: name.to_string(),
        description: None,
    }
}

fn user(person_id: &str, name: &str, birth_date: &str, postal_code: &str, plate: &str) -> User {
    User {
        person_id: person_id.to_string(),
        name: name.to_string(),
        birth_date: Some(birth_date.to_string()),
        postal_code: Some(postal_code.to_string()),
        vehicle_plate: Some(plate.to_string()),
        role: UserRole::User,
        active: true,
    }
}

fn device<const N: usize>(
    device_id: &str,
    name: &str,
    device_type: DeviceType,
    zone: &str,
    point: GeoPoint,
    config: [(&str, Value); N],
) -> Device {
    Device {
        device_id: device_id.to_string(),
        name: name.to_string(),
        device_type,
        status: DeviceStatus::Online,
        location: DeviceLocation {
            zone: zone.to_string(),
            point: Some(point),
            description: None,
        },
        config: config
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect::<BTreeMap<_, _>>(),
        last_communication_ms: None,
        retired: false,
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

fn written(outcome: UpsertOutcome) -> usize {
    usize::from(outcome != UpsertOutcome::Unchanged)
}

impl Registry {
    /// 按依赖顺序写入：分区、地址、用户、设备、车辆。
    pub async fn apply_seed(
        &self,
        ctx: &RequestContext,
        seed: &SeedData,
    ) -> Result<SeedReport, FleetError> {
        let mut report = SeedReport::default();
        for zone in &seed.zones {
            report.zones += written(self.define_zone(ctx, zone.clone()).await?);
        }
        for address in &seed.addresses {
            report.addresses += written(self.upsert_address(ctx, address.clone()).await?);
        }
        for user in &seed.users {
            report.users += written(self.upsert_user(ctx, user.clone()).await?);
        }
        for device in &seed.devices {
            report.devices += written(self.upsert_device(ctx, device.clone()).await?);
        }
        for vehicle in &seed.vehicles {
            report.vehicles += written(self.upsert_vehicle(ctx, vehicle.clone()).await?);
        }
        info!(
            target: "fleet.registry",
            zones = report.zones,
            addresses = report.addresses,
            users = report.users,
            devices = report.devices,
            vehicles = report.vehicles,
            "seed_applied"
        );
        Ok(report)
    }
}
