//! Engine.IO v4 / Socket.IO text frames, the subset the push channel needs.

use serde_json::Value;

/// Sent once the transport is open to join the default namespace.
pub const CONNECT: &str = "40";
pub const PONG: &str = "3";

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Transport handshake (`0{...}`), carrying the session parameters.
    Open(Value),
    Close,
    Ping,
    Pong,
    /// Namespace joined (`40`).
    Connected,
    /// Namespace left (`41`).
    Disconnected,
    /// Namespace refused (`44`).
    ConnectError(String),
    /// `42["name", payload]`.
    Event { name: String, payload: Value },
    Noop,
    Unknown(String),
}

pub fn parse(raw: &str) -> Frame {
    let mut chars = raw.chars();
    let Some(kind) = chars.next() else {
        return Frame::Unknown(String::new());
    };
    let rest = chars.as_str();

    match kind {
        '0' => Frame::Open(serde_json::from_str(rest).unwrap_or(Value::Null)),
        '1' => Frame::Close,
        '2' => Frame::Ping,
        '3' => Frame::Pong,
        '4' => parse_message(raw, rest),
        '6' => Frame::Noop,
        _ => Frame::Unknown(raw.to_string()),
    }
}

fn parse_message(raw: &str, body: &str) -> Frame {
    let mut chars = body.chars();
    let Some(kind) = chars.next() else {
        return Frame::Unknown(raw.to_string());
    };
    let rest = skip_namespace(chars.as_str());

    match kind {
        '0' => Frame::Connected,
        '1' => Frame::Disconnected,
        '2' => parse_event(raw, rest),
        '4' => Frame::ConnectError(rest.to_string()),
        _ => Frame::Unknown(raw.to_string()),
    }
}

/// Drops a leading `/namespace,` if present.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(i) => &body[i + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn parse_event(raw: &str, body: &str) -> Frame {
    // Optional ack id before the array.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    let Ok(Value::Array(mut items)) = serde_json::from_str::<Value>(body) else {
        return Frame::Unknown(raw.to_string());
    };
    if items.is_empty() {
        return Frame::Unknown(raw.to_string());
    }

    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return Frame::Unknown(raw.to_string()),
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };

    Frame::Event { name, payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_frames() {
        assert_eq!(parse("2"), Frame::Ping);
        assert_eq!(parse("3"), Frame::Pong);
        assert_eq!(parse("1"), Frame::Close);
        assert_eq!(parse("6"), Frame::Noop);
        match parse(r#"0{"sid":"abc","pingInterval":25000}"#) {
            Frame::Open(v) => assert_eq!(v["sid"], "abc"),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn namespace_frames() {
        assert_eq!(parse("40"), Frame::Connected);
        assert_eq!(parse(r#"40{"sid":"x"}"#), Frame::Connected);
        assert_eq!(parse("41"), Frame::Disconnected);
        assert_eq!(
            parse(r#"44{"message":"nope"}"#),
            Frame::ConnectError(r#"{"message":"nope"}"#.into())
        );
    }

    #[test]
    fn event_with_payload() {
        assert_eq!(
            parse(r#"42["configUpdated:42",{"guild":"A"}]"#),
            Frame::Event {
                name: "configUpdated:42".into(),
                payload: json!({"guild": "A"}),
            }
        );
    }

    #[test]
    fn event_without_payload_namespace_and_ack() {
        assert_eq!(
            parse(r#"42/admin,17["configUpdated:1"]"#),
            Frame::Event {
                name: "configUpdated:1".into(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn garbage_is_unknown() {
        assert!(matches!(parse(""), Frame::Unknown(_)));
        assert!(matches!(parse("9"), Frame::Unknown(_)));
        assert!(matches!(parse("42not json"), Frame::Unknown(_)));
        assert!(matches!(parse("42[]"), Frame::Unknown(_)));
        assert!(matches!(parse("42[1,2]"), Frame::Unknown(_)));
    }
}
