//! Build script for kestrel-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates panel.toml at compile time

use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pin keys of the `[panel]` section
const PIN_KEYS: [&str; 7] = [
    "cs_pin",
    "rst_pin",
    "dc_pin",
    "encoder_a_pin",
    "encoder_b_pin",
    "click_pin",
    "back_pin",
];

/// Keys accepted in each section
const KNOWN_KEYS: [(&str, &[&str]); 3] = [
    (
        "panel",
        &[
            "spi_channel",
            "spi_frequency",
            "cs_pin",
            "rst_pin",
            "dc_pin",
            "rotation",
            "col_start",
            "row_start",
            "width",
            "height",
            "encoder_a_pin",
            "encoder_b_pin",
            "click_pin",
            "back_pin",
            "encoder_resolution",
            "refresh_hz",
        ],
    ),
    ("about", &["machine_name", "make", "model"]),
    ("flow_sensor", &["enable", "gear_diameter", "direction"]),
];

/// Lines reserved for fixed peripherals: SPI0, SPI1 (SCK, MOSI, MISO) and
/// the flow sensor's I2C1 (SDA, SCL)
const RESERVED_PINS: [(u8, &str); 8] = [
    (18, "SPI0"),
    (19, "SPI0"),
    (16, "SPI0"),
    (10, "SPI1"),
    (11, "SPI1"),
    (12, "SPI1"),
    (26, "flow sensor I2C"),
    (27, "flow sensor I2C"),
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate panel.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=panel.toml");

    let config_path = Path::new("panel.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: panel.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a panel.toml configuration file.          ║\n\
            ║  Please create one in the kestrel-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read panel.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in panel.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                error_msg
                    .lines()
                    .map(|l| format!("║  {:<64} ║", l))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_panel(&config, &mut errors);
    validate_flow_sensor(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid panel configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}

/// Only known sections, each a table
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        errors.push("top level must be a table".into());
        return;
    };
    for (name, value) in root {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(section, _)| *section == name.as_str()) else {
            errors.push(format!("unknown section [{}]", name));
            continue;
        };
        let Some(table) = value.as_table() else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", name, key));
            }
        }
    }
}

/// Ranges, pin syntax and pin conflicts in `[panel]`
fn validate_panel(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(panel) = config.get("panel").and_then(|p| p.as_table()) else {
        return;
    };

    if let Some(value) = panel.get("spi_channel") {
        if !matches!(value, toml::Value::Integer(ch) if (0..=1).contains(ch)) {
            errors.push("[panel] spi_channel must be 0 or 1".into());
        }
    }

    if let Some(value) = panel.get("rotation") {
        if !matches!(value, toml::Value::Integer(r) if (0..=3).contains(r)) {
            errors.push("[panel] rotation must be 0-3".into());
        }
    }

    for key in ["width", "height"] {
        if let Some(value) = panel.get(key) {
            if !matches!(value, toml::Value::Integer(n) if (1..=320).contains(n)) {
                errors.push(format!("[panel] {} must be 1-320", key));
            }
        }
    }

    if let Some(value) = panel.get("encoder_resolution") {
        if !matches!(value, toml::Value::Integer(n) if (1..=255).contains(n)) {
            errors.push("[panel] encoder_resolution must be 1-255".into());
        }
    }

    let mut reserved: BTreeMap<u8, String> = RESERVED_PINS
        .iter()
        .map(|(pin, owner)| (*pin, owner.to_string()))
        .collect();

    for key in PIN_KEYS {
        let Some(value) = panel.get(key) else {
            continue;
        };
        let Some(text) = value.as_str() else {
            errors.push(format!("[panel] {} must be a string", key));
            continue;
        };
        match parse_pin(text) {
            Ok(Some(pin)) => {
                if let Some(owner) = reserved.insert(pin, key.to_string()) {
                    errors.push(format!("[panel] {} gpio{} already used by {}", key, pin, owner));
                }
            }
            Ok(None) => {}
            Err(msg) => errors.push(format!("[panel] {}: {}", key, msg)),
        }
    }
}

/// `[flow_sensor]` values
fn validate_flow_sensor(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(flow) = config.get("flow_sensor").and_then(|f| f.as_table()) else {
        return;
    };

    if let Some(value) = flow.get("gear_diameter") {
        let diameter = match value {
            toml::Value::Float(d) => Some(*d),
            toml::Value::Integer(d) => Some(*d as f64),
            _ => None,
        };
        if !matches!(diameter, Some(d) if d > 0.0) {
            errors.push("[flow_sensor] gear_diameter must be a positive number".into());
        }
    }

    for key in ["enable", "direction"] {
        if let Some(value) = flow.get(key) {
            if !value.is_bool() {
                errors.push(format!("[flow_sensor] {} must be true or false", key));
            }
        }
    }
}

/// Pin number of "gpioN" with optional "!" and "^" prefixes; `None` for "nc"
fn parse_pin(text: &str) -> Result<Option<u8>, String> {
    if text.eq_ignore_ascii_case("nc") {
        return Ok(None);
    }
    let name = text.trim_start_matches(['!', '^']);
    let number = name
        .strip_prefix("gpio")
        .ok_or_else(|| format!("'{}' is not a gpio pin", text))?;
    match number.parse::<u8>() {
        Ok(pin) if pin <= 29 => Ok(Some(pin)),
        _ => Err(format!("'{}' is not a valid RP2040 pin", text)),
    }
}
