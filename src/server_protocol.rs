use serde_json::Value;

use crate::types::{Direction, Intent, SessionState, SpeedPreference};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Key {
        key: String,
    },
    Direction {
        dir: Direction,
    },
    Pause,
    Start {
        cols: Option<i64>,
        rows: Option<i64>,
        viewport_width: Option<i64>,
        viewport_height: Option<i64>,
    },
    Speed {
        value: SpeedPreference,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "key" => {
            let key = object.get("key")?.as_str()?;
            if key.is_empty() || key.chars().count() > 32 {
                return None;
            }
            Some(ParsedClientMessage::Key {
                key: key.to_string(),
            })
        }
        "direction" => {
            let dir = Direction::parse(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Direction { dir })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "start" => Some(ParsedClientMessage::Start {
            cols: parse_optional_i64(object.get("cols"))?,
            rows: parse_optional_i64(object.get("rows"))?,
            viewport_width: parse_optional_i64(object.get("viewportWidth"))?,
            viewport_height: parse_optional_i64(object.get("viewportHeight"))?,
        }),
        "speed" => {
            let value = SpeedPreference::parse(object.get("value")?.as_str()?)?;
            Some(ParsedClientMessage::Speed { value })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

/// Maps a raw keyboard key to an intent for the current session state.
///
/// Any key starts a game from `Idle` or `Over`. Otherwise Space toggles pause
/// and arrows or WASD steer; everything else is dropped.
pub fn translate_key(key: &str, state: SessionState) -> Option<Intent> {
    if matches!(state, SessionState::Idle | SessionState::Over) {
        return Some(Intent::StartOrRestart);
    }
    if key == " " || key == "Spacebar" {
        return Some(Intent::PauseToggle);
    }
    let dir = match key {
        "ArrowUp" | "w" | "W" => Direction::Up,
        "ArrowDown" | "s" | "S" => Direction::Down,
        "ArrowLeft" | "a" | "A" => Direction::Left,
        "ArrowRight" | "d" | "D" => Direction::Right,
        _ => return None,
    };
    Some(Intent::Direction(dir))
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    let Some(value) = value else {
        return Some(None);
    };
    if value.is_null() {
        return Some(None);
    }
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() && number.abs() < 1e12 {
            return Some(Some(number.floor() as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_with_viewport() {
        let parsed = parse_client_message(
            r#"{"type":"start","viewportWidth":640.7,"viewportHeight":480}"#,
        )
        .expect("start message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                cols: None,
                rows: None,
                viewport_width: Some(640),
                viewport_height: Some(480),
            }
        );
    }

    #[test]
    fn parse_start_rejects_non_numeric_sizes() {
        assert!(parse_client_message(r#"{"type":"start","cols":"wide"}"#).is_none());
    }

    #[test]
    fn parse_direction_and_speed() {
        assert_eq!(
            parse_client_message(r#"{"type":"direction","dir":"left"}"#),
            Some(ParsedClientMessage::Direction {
                dir: Direction::Left
            })
        );
        assert!(parse_client_message(r#"{"type":"direction","dir":"north"}"#).is_none());
        assert_eq!(
            parse_client_message(r#"{"type":"speed","value":"fast"}"#),
            Some(ParsedClientMessage::Speed {
                value: SpeedPreference::Fast
            })
        );
    }

    #[test]
    fn parse_rejects_unknown_and_malformed() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"{"type":"teleport"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"key","key":""}"#).is_none());
        assert!(parse_client_message(r#"{"type":"ping","t":"now"}"#).is_none());
        assert_eq!(
            parse_client_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedClientMessage::Ping { t: 12.5 })
        );
    }

    #[test]
    fn any_key_starts_from_idle_or_over() {
        assert_eq!(
            translate_key("x", SessionState::Idle),
            Some(Intent::StartOrRestart)
        );
        assert_eq!(
            translate_key("ArrowUp", SessionState::Over),
            Some(Intent::StartOrRestart)
        );
    }

    #[test]
    fn running_keys_map_to_pause_and_directions() {
        assert_eq!(
            translate_key(" ", SessionState::Running),
            Some(Intent::PauseToggle)
        );
        assert_eq!(
            translate_key("a", SessionState::Running),
            Some(Intent::Direction(Direction::Left))
        );
        assert_eq!(
            translate_key("ArrowDown", SessionState::Paused),
            Some(Intent::Direction(Direction::Down))
        );
        assert_eq!(translate_key("q", SessionState::Running), None);
        assert_eq!(translate_key("Enter", SessionState::Countdown), None);
    }
}
