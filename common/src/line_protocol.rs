//! InfluxDB line protocol encoding of a [`Reading`].

use core::fmt::Write;

use crate::reading::Reading;

pub const MEASUREMENT: &str = "sensor";

/// Encodes the temperature, humidity and pressure of `reading` as one line each, tagged with
/// `location`. The gas resistance is not part of the payload.
pub fn encode(reading: &Reading, location: &str) -> String {
    let location = escape_tag_value(location);
    let mut payload = String::with_capacity(3 * (MEASUREMENT.len() + location.len() + 32));

    for (field, value) in [
        ("temperature", reading.temperature),
        ("humidity", reading.humidity),
        ("pressure", reading.pressure),
    ] {
        // Writing into a String cannot fail.
        let _ = writeln!(payload, "{MEASUREMENT},location={location} {field}={value:.2}");
    }

    payload
}

/// Escapes commas, equal signs and spaces in a tag value.
pub fn escape_tag_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[test]
fn test_encode_reading() {
    let reading = Reading::new(21.34, 45.67, 1013.20, 12000.0);

    assert_eq!(
        encode(&reading, "office"),
        "sensor,location=office temperature=21.34\n\
         sensor,location=office humidity=45.67\n\
         sensor,location=office pressure=1013.20\n"
    );
}

#[test]
fn test_encode_is_idempotent() {
    let reading = Reading::new(-3.456, 99.999, 987.654, 0.0);

    let first = encode(&reading, "office");
    assert_eq!(first.as_bytes(), encode(&reading, "office").as_bytes());
    assert!(!first.contains("gas"));
    assert!(first.contains("temperature=-3.46\n"));
}

#[test]
fn test_escape_tag_value() {
    assert_eq!(escape_tag_value("office"), "office");
    assert_eq!(escape_tag_value("main office"), "main\\ office");
    assert_eq!(escape_tag_value("a,b=c"), "a\\,b\\=c");

    let payload = encode(&Reading::new(1.0, 2.0, 3.0, 4.0), "living room");
    assert!(payload.starts_with("sensor,location=living\\ room temperature=1.00\n"));
}
