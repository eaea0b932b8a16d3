//! Minimal TOML reader for the panel configuration
//!
//! Handles only the subset the panel config uses. It does NOT support the
//! full TOML spec.
//!
//! Supported features:
//! - `[panel]`, `[about]`, `[flow_sensor]` section headers
//! - Key = value pairs (string, integer, float, boolean)
//! - Comments (# ...), including trailing comments after values
//!
//! Missing keys keep their defaults. Unknown sections and keys are errors so
//! a typo does not silently fall back to a default pin.

use heapless::String;

use super::types::{HmiConfig, PinConfig, MAX_LABEL_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// Key not valid in its section
    UnknownKey,
    /// Line is neither a header nor `key = value`
    Syntax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Panel,
    About,
    FlowSensor,
}

/// Parse the configuration text
pub fn parse_config(input: &str) -> Result<HmiConfig, ParseError> {
    let mut config = HmiConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();

        // Skip empty lines and comments
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(ParseError::Syntax)?;
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::Root => return Err(ParseError::UnknownKey),
            Section::Panel => apply_panel(&mut config, key, value)?,
            Section::About => apply_about(&mut config, key, value)?,
            Section::FlowSensor => apply_flow_sensor(&mut config, key, value)?,
        }
    }

    Ok(config)
}

fn parse_section_header(name: &str) -> Result<Section, ParseError> {
    match name.trim() {
        "panel" => Ok(Section::Panel),
        "about" => Ok(Section::About),
        "flow_sensor" => Ok(Section::FlowSensor),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_panel(config: &mut HmiConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let panel = &mut config.panel;
    match key {
        "spi_channel" => {
            let channel: u8 = parse_int(value)?;
            if channel > 1 {
                return Err(ParseError::InvalidValue);
            }
            panel.spi_channel = channel;
        }
        "spi_frequency" => panel.spi_frequency = parse_int(value)?,
        "cs_pin" => panel.cs_pin = parse_optional_pin(value)?,
        "rst_pin" => panel.rst_pin = parse_optional_pin(value)?,
        "dc_pin" => panel.dc_pin = parse_optional_pin(value)?,
        "rotation" => {
            let rotation: u8 = parse_int(value)?;
            if rotation > 3 {
                return Err(ParseError::InvalidValue);
            }
            panel.rotation = rotation;
        }
        "col_start" => panel.col_start = parse_int(value)?,
        "row_start" => panel.row_start = parse_int(value)?,
        "width" => panel.width = parse_int(value)?,
        "height" => panel.height = parse_int(value)?,
        "encoder_a_pin" => panel.encoder_a_pin = parse_optional_pin(value)?,
        "encoder_b_pin" => panel.encoder_b_pin = parse_optional_pin(value)?,
        "click_pin" => panel.click_pin = parse_optional_pin(value)?,
        "back_pin" => panel.back_pin = parse_optional_pin(value)?,
        "encoder_resolution" => {
            let resolution: u8 = parse_int(value)?;
            if resolution == 0 {
                return Err(ParseError::InvalidValue);
            }
            panel.encoder_resolution = resolution;
        }
        "refresh_hz" => {
            let hz: u8 = parse_int(value)?;
            if hz == 0 {
                return Err(ParseError::InvalidValue);
            }
            panel.refresh_hz = hz;
        }
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_about(config: &mut HmiConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let about = &mut config.about;
    match key {
        "machine_name" => about.machine_name = parse_label(value)?,
        "make" => about.make = parse_label(value)?,
        "model" => about.model = parse_label(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_flow_sensor(config: &mut HmiConfig, key: &str, value: &str) -> Result<(), ParseError> {
    let flow = &mut config.flow_sensor;
    match key {
        "enable" => flow.enable = parse_bool(value)?,
        "gear_diameter" => {
            let diameter: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
            if diameter.is_nan() || diameter <= 0.0 {
                return Err(ParseError::InvalidValue);
            }
            flow.gear_diameter_mm = diameter;
        }
        "direction" => flow.direction = parse_bool(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

/// Drop a `#` comment that is not inside a quoted string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Parse a string value (quotes optional)
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_label(value: &str) -> Result<String<MAX_LABEL_LEN>, ParseError> {
    let mut label = String::new();
    label
        .push_str(parse_string(value))
        .map_err(|_| ParseError::InvalidValue)?;
    Ok(label)
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a pin string like "gpio11", "!gpio12", "^gpio4", or "nc"
pub fn parse_optional_pin(value: &str) -> Result<Option<PinConfig>, ParseError> {
    let value = parse_string(value);
    if value.eq_ignore_ascii_case("nc") {
        return Ok(None);
    }

    let mut inverted = false;
    let mut pull_up = false;
    let mut s = value;

    // Check for modifiers
    while let Some(c) = s.chars().next() {
        match c {
            '!' => inverted = true,
            '^' => pull_up = true,
            _ => break,
        }
        s = &s[1..];
    }

    let number = s.strip_prefix("gpio").ok_or(ParseError::InvalidPin)?;
    let pin: u8 = number.parse().map_err(|_| ParseError::InvalidPin)?;
    if pin > 29 {
        return Err(ParseError::InvalidPin);
    }

    Ok(Some(PinConfig {
        pin,
        inverted,
        pull_up,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Front panel
[panel]
spi_channel = 1
spi_frequency = 20000000
cs_pin = "gpio9"
rst_pin = "nc"
dc_pin = "gpio8"     # data/command
rotation = 1
col_start = 35
row_start = 0
encoder_a_pin = "^gpio2"
encoder_b_pin = "^gpio3"
click_pin = "!^gpio4"
encoder_resolution = 2

[about]
machine_name = "Bench #2"
make = "Acme"
model = "Mill 300"

[flow_sensor]
enable = true
gear_diameter = 11.0
direction = false
"#;

    #[test]
    fn test_parse_full_sample() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.panel.spi_channel, 1);
        assert_eq!(config.panel.spi_frequency, 20_000_000);
        assert_eq!(config.panel.cs_pin, Some(PinConfig::new(9)));
        assert_eq!(config.panel.rst_pin, None);
        assert_eq!(config.panel.dc_pin, Some(PinConfig::new(8)));
        assert_eq!(config.panel.rotation, 1);
        assert_eq!(config.panel.col_start, 35);
        assert_eq!(config.panel.click_pin, Some(PinConfig::button(4)));
        assert_eq!(config.panel.encoder_resolution, 2);

        assert_eq!(config.about.machine_name.as_str(), "Bench #2");
        assert_eq!(config.about.model.as_str(), "Mill 300");

        assert!(config.flow_sensor.enable);
        assert!(!config.flow_sensor.direction);
        assert_eq!(config.flow_sensor.gear_diameter_mm, 11.0);
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config, HmiConfig::default());
        assert_eq!(config.panel.rotation, 3);
        assert_eq!(config.panel.encoder_resolution, 4);
        assert_eq!(config.panel.spi_frequency, 16_000_000);
    }

    #[test]
    fn test_pin_modifiers() {
        let pin = parse_optional_pin("\"!^gpio12\"").unwrap().unwrap();
        assert_eq!(pin.pin, 12);
        assert!(pin.inverted);
        assert!(pin.pull_up);

        assert_eq!(parse_optional_pin("NC"), Ok(None));
        assert_eq!(parse_optional_pin("pin12"), Err(ParseError::InvalidPin));
        assert_eq!(parse_optional_pin("gpio30"), Err(ParseError::InvalidPin));
    }

    #[test]
    fn test_rejects_unknown_section() {
        assert_eq!(
            parse_config("[stepper spin]\n"),
            Err(ParseError::InvalidSection)
        );
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert_eq!(
            parse_config("[panel]\nbacklight = 3\n"),
            Err(ParseError::UnknownKey)
        );
        assert_eq!(parse_config("rotation = 1\n"), Err(ParseError::UnknownKey));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            parse_config("[panel]\nrotation = 4\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[panel]\nspi_channel = 2\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[panel]\nencoder_resolution = 0\n"),
            Err(ParseError::InvalidValue)
        );
    }

    #[test]
    fn test_rejects_garbage_line() {
        assert_eq!(parse_config("[panel]\nrotation\n"), Err(ParseError::Syntax));
    }
}
