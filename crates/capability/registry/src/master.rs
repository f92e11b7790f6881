//! 地址、用户与分区。

use crate::Registry;
use domain::{Address, EntityKind, EntityRef, FleetError, RequestContext, User, Zone};
use fleet_storage::UpsertOutcome;
use tracing::info;

impl Registry {
    pub async fn define_zone(
        &self,
        ctx: &RequestContext,
        zone: Zone,
    ) -> Result<UpsertOutcome, FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::new(EntityKind::Zone, zone.code.clone()))
            .await?;
        let _gate = self.write_gate(ctx).await?;
        let code = zone.code.clone();
        let outcome = self.stores().zones.upsert_zone(zone).await?;
        info!(target: "fleet.registry", zone = %code, outcome = ?outcome, "zone_defined");
        Ok(outcome)
    }

    pub async fn list_zones(&self, ctx: &RequestContext) -> Result<Vec<Zone>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.stores().zones.list_zones().await
    }

    pub async fn upsert_address(
        &self,
        ctx: &RequestContext,
        address: Address,
    ) -> Result<UpsertOutcome, FleetError> {
        let _lock = self
            .locks()
            .acquire(
                ctx,
                &EntityRef::new(EntityKind::Address, address.postal_code.clone()),
            )
            .await?;
        let _gate = self.write_gate(ctx).await?;
        self.stores().addresses.upsert_address(address).await
    }

    pub async fn get_address(
        &self,
        ctx: &RequestContext,
        postal_code: &str,
    ) -> Result<Address, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.stores()
            .addresses
            .find_address(postal_code)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Address, postal_code))
    }

    pub async fn delete_address(
        &self,
        ctx: &RequestContext,
        postal_code: &str,
    ) -> Result<(), FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::new(EntityKind::Address, postal_code))
            .await?;
        let _gate = self.write_gate(ctx).await?;
        if !self.stores().addresses.delete_address(postal_code).await? {
            return Err(FleetError::not_found(EntityKind::Address, postal_code));
        }
        Ok(())
    }

    pub async fn upsert_user(
        &self,
        ctx: &RequestContext,
        user: User,
    ) -> Result<UpsertOutcome, FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::new(EntityKind::User, user.person_id.clone()))
            .await?;
        let _gate = self.write_gate(ctx).await?;
        self.stores().users.upsert_user(user).await
    }

    pub async fn get_user(&self, ctx: &RequestContext, person_id: &str) -> Result<User, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.stores()
            .users
            .find_user(person_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::User, person_id))
    }

    pub async fn delete_user(&self, ctx: &RequestContext, person_id: &str) -> Result<(), FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::new(EntityKind::User, person_id))
            .await?;
        let _gate = self.write_gate(ctx).await?;
        if !self.stores().users.delete_user(person_id).await? {
            return Err(FleetError::not_found(EntityKind::User, person_id));
        }
        info!(target: "fleet.registry", person_id, "user_deleted");
        Ok(())
    }
}
