//! First-run shape of the vehicle state document.

use serde_json::{json, Map, Value};

/// The defaults template. Stored documents are merged onto it on load, so
/// fields added here show up in existing installs.
pub fn default_state() -> Map<String, Value> {
    let Value::Object(state) = default_state_value() else {
        return Map::new();
    };
    state
}

fn default_state_value() -> Value {
    json!({
        "units": { "system": "metric" },
        "ac": { "power": false, "temperature_c": 22 },
        "seat_heating": { "driver_level": 0, "passenger_level": 0 },
        "seat_cooling": { "driver_level": 0, "passenger_level": 0 },
        "tacc": { "enabled": false, "car_speed_kph": 88, "follow_distance": 2 },
        "wipers": { "mode": "auto", "frequency_level": 1 },
        "infotainment": {
            "power": true,
            "volume": 18,
            "active_app": "Radio",
            "radio_band": "FM",
            "bluetooth_connected": false,
            "screencast_active": false,
            "local_game": "Elden Ring"
        }
    })
}
