use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::Device;
use crate::store::DeviceStore;

/// Business operations over the device collection.
///
/// Each call is a full load, mutate, save cycle against the store. Cycles
/// are serialized through `cycle` so concurrent requests on one service
/// cannot interleave and drop each other's writes. Writers in other
/// processes are not coordinated with.
pub struct DeviceService {
    store: DeviceStore,
    cycle: Mutex<()>,
}

impl DeviceService {
    pub fn new(store: DeviceStore) -> Self {
        Self {
            store,
            cycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub async fn list(&self) -> AppResult<Vec<Device>> {
        let _guard = self.cycle.lock().await;
        self.store.load_all().await
    }

    pub async fn get(&self, id: i64) -> AppResult<Device> {
        let _guard = self.cycle.lock().await;
        let devices = self.store.load_all().await?;

        debug!(id, "Looking up device");
        devices
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, device: Device) -> AppResult<()> {
        let _guard = self.cycle.lock().await;
        let mut devices = self.store.load_all().await?;

        if devices.iter().any(|d| d.id == device.id) {
            return Err(AppError::DuplicateId(device.id));
        }

        let id = device.id;
        devices.push(device);
        self.store.save_all(&devices).await?;

        debug!(id, count = devices.len(), "Appended device");
        Ok(())
    }

    /// Replaces the first device with `id` in place. The replacement's own
    /// id is stored as given, even when it differs from `id`.
    pub async fn update(&self, id: i64, device: Device) -> AppResult<()> {
        let _guard = self.cycle.lock().await;
        let mut devices = self.store.load_all().await?;

        let slot = position_of(&devices, id).ok_or_else(|| not_found(id))?;
        let new_id = device.id;
        devices[slot] = device;
        self.store.save_all(&devices).await?;

        debug!(id, new_id, "Replaced device");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let _guard = self.cycle.lock().await;
        let mut devices = self.store.load_all().await?;

        let slot = position_of(&devices, id).ok_or_else(|| not_found(id))?;
        devices.remove(slot);
        self.store.save_all(&devices).await?;

        debug!(id, count = devices.len(), "Removed device");
        Ok(())
    }

    /// Moves a device to another warehouse. No other field changes.
    pub async fn transfer(&self, id: i64, warehouse: &str) -> AppResult<()> {
        let _guard = self.cycle.lock().await;
        let mut devices = self.store.load_all().await?;

        let slot = position_of(&devices, id).ok_or_else(|| not_found(id))?;
        let from = std::mem::replace(&mut devices[slot].warehouse, warehouse.to_string());
        self.store.save_all(&devices).await?;

        debug!(id, from = %from, to = %warehouse, "Moved device");
        Ok(())
    }
}

// First match wins if ids were ever duplicated through `update`.
fn position_of(devices: &[Device], id: i64) -> Option<usize> {
    devices.iter().position(|d| d.id == id)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Device {} not found", id))
}
