//! Prefixed text encoding shared by UDP datagrams and recording files
//!
//! Every message is `prefix:field,field,...`:
//!
//! | prefix | fields |
//! |--------|--------|
//! | `pos`  | `x,y,heading` |
//! | `cir`  | `radius,heading` |
//! | `line` | `name,x1,y1,x2,y2,style` |
//! | `txt`  | remainder of the message, commas included |
//! | `kv`   | `key,value` where the value keeps any further commas |
//!
//! Floats are written with three decimals, which is also the precision a
//! round trip through this format preserves.
//!
//! Line names and keys cannot carry commas. The encoder writes any comma in
//! them as a space so the rest of the message still decodes.

use std::borrow::Cow;

use crate::error::ParseError;
use crate::types::TelemetryEvent;

/// Decode one message into an event.
pub fn parse_payload(message: &str) -> Result<TelemetryEvent, ParseError> {
    let message = message.trim_end_matches(['\r', '\n', '\0']);
    if message.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let Some((prefix, body)) = message.split_once(':') else {
        return Err(ParseError::UnknownPrefix(message.to_string()));
    };

    match prefix.trim() {
        "pos" => {
            let fields = split_exact(body, "pos", 3)?;
            Ok(TelemetryEvent::Position {
                x: parse_f64("x", fields[0])?,
                y: parse_f64("y", fields[1])?,
                heading: parse_f64("heading", fields[2])?,
            })
        }
        "cir" => {
            let fields = split_exact(body, "cir", 2)?;
            Ok(TelemetryEvent::Circle {
                radius: parse_f64("radius", fields[0])?,
                heading: parse_f64("heading", fields[1])?,
            })
        }
        "line" => {
            let fields: Vec<&str> = body.splitn(6, ',').collect();
            if fields.len() != 6 {
                return Err(ParseError::FieldCount {
                    prefix: "line",
                    expected: 6,
                    found: fields.len(),
                });
            }
            let style = fields[5]
                .trim()
                .parse::<i32>()
                .map_err(|_| ParseError::InvalidNumber {
                    field: "style",
                    value: fields[5].to_string(),
                })?;
            Ok(TelemetryEvent::Line {
                name: fields[0].trim().to_string(),
                x1: parse_f64("x1", fields[1])?,
                y1: parse_f64("y1", fields[2])?,
                x2: parse_f64("x2", fields[3])?,
                y2: parse_f64("y2", fields[4])?,
                style,
            })
        }
        "txt" => Ok(TelemetryEvent::Text {
            text: body.to_string(),
        }),
        "kv" => match body.split_once(',') {
            Some((key, value)) => Ok(TelemetryEvent::KeyValue {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            None => Err(ParseError::FieldCount {
                prefix: "kv",
                expected: 2,
                found: 1,
            }),
        },
        other => Err(ParseError::UnknownPrefix(other.to_string())),
    }
}

/// Encode an event in the prefixed form accepted by [`parse_payload`].
pub fn format_payload(event: &TelemetryEvent) -> String {
    match event {
        TelemetryEvent::Position { x, y, heading } => {
            format!("pos:{:.3},{:.3},{:.3}", x, y, heading)
        }
        TelemetryEvent::Circle { radius, heading } => {
            format!("cir:{:.3},{:.3}", radius, heading)
        }
        TelemetryEvent::Line {
            name,
            x1,
            y1,
            x2,
            y2,
            style,
        } => format!(
            "line:{},{:.3},{:.3},{:.3},{:.3},{}",
            escape_field(name),
            x1,
            y1,
            x2,
            y2,
            style
        ),
        TelemetryEvent::Text { text } => format!("txt:{}", text),
        TelemetryEvent::KeyValue { key, value } => {
            format!("kv:{},{}", escape_field(key), value)
        }
    }
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(',') {
        Cow::Owned(field.replace(',', " "))
    } else {
        Cow::Borrowed(field)
    }
}

fn split_exact<'a>(
    body: &'a str,
    prefix: &'static str,
    expected: usize,
) -> Result<Vec<&'a str>, ParseError> {
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() != expected {
        return Err(ParseError::FieldCount {
            prefix,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}
