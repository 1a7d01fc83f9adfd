//! BLE characteristic UUIDs used by the shelf labels.

use uuid::Uuid;

/// Serial-port style characteristic the labels accept price payloads on (Write).
pub const PRICE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_ffe1_0000_1000_8000_00805f9b34fb);
