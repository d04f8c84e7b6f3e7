use serde::{Deserialize, Serialize};

/// One appliance held in stock. Field order here is the element order
/// written to the XML document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub category: String,
    /// Warehouse the device is currently stored in.
    pub warehouse: String,
}

/// Root of the persisted document: `<inventory>` holding zero or more
/// `<device>` elements in collection order.
#[derive(Debug, Default, Serialize)]
#[serde(rename = "inventory")]
pub struct Inventory {
    #[serde(rename = "device")]
    pub devices: Vec<Device>,
}

impl From<Vec<Device>> for Inventory {
    fn from(devices: Vec<Device>) -> Self {
        Self { devices }
    }
}
