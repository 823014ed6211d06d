use super::*;
use serde_json::json;

#[test]
fn timecode_parses_common_forms() {
    assert_eq!(Timecode::parse("00:00").unwrap().as_secs(), 0.0);
    assert_eq!(Timecode::parse("00:07").unwrap().as_secs(), 7.0);
    assert_eq!(Timecode::parse("01:30").unwrap().as_secs(), 90.0);
    assert_eq!(Timecode::parse("1:02:03").unwrap().as_secs(), 3723.0);
    assert_eq!(Timecode::parse("00:02.5").unwrap().as_secs(), 2.5);
    assert_eq!(Timecode::parse("12").unwrap().as_secs(), 12.0);
    assert_eq!(Timecode::parse(" 00:04 ").unwrap().as_secs(), 4.0);
    // Minutes are unbounded without an hours field.
    assert_eq!(Timecode::parse("75:00").unwrap().as_secs(), 4500.0);
}

#[test]
fn timecode_rejects_malformed_input() {
    for bad in [
        "", ":", "00:", ":05", "00:60", "1:60:00", "a:05", "00:-1", "-3", "1:2:3:4", "inf",
        "00:0x",
    ] {
        assert!(Timecode::parse(bad).is_err(), "expected error for {bad:?}");
    }
    assert!(Timecode::from_secs(-0.5).is_err());
    assert!(Timecode::from_secs(f64::INFINITY).is_err());
}

#[test]
fn timecode_display_is_clock_style() {
    assert_eq!(Timecode::from_secs(7.0).unwrap().to_string(), "00:07");
    assert_eq!(Timecode::from_secs(2.5).unwrap().to_string(), "00:02.5");
    assert_eq!(Timecode::from_secs(3723.0).unwrap().to_string(), "01:02:03");
    assert_eq!(Timecode::ZERO.to_string(), "00:00");
}

#[test]
fn entry_deserializes_numbers_strings_and_aliases() {
    let e: StoryboardEntry =
        serde_json::from_value(json!({"start": "00:03", "end": 7, "file": "shot.jpg"})).unwrap();
    assert_eq!(e.start.unwrap().as_secs(), 3.0);
    assert_eq!(e.end.unwrap().as_secs(), 7.0);
    assert_eq!(e.media_ref, "shot.jpg");

    let e: StoryboardEntry = serde_json::from_value(json!({"media": "a"})).unwrap();
    assert_eq!(e, StoryboardEntry::untimed("a"));

    assert!(serde_json::from_value::<StoryboardEntry>(json!({"start": "x", "file": "a"})).is_err());
    assert!(serde_json::from_value::<StoryboardEntry>(json!({"start": -1, "file": "a"})).is_err());
}

#[test]
fn storyboard_accepts_media_alias_and_script() {
    let sb = Storyboard::from_json_str(
        r#"{
            "script": "Meet the lamp.",
            "media": [
                {"start": "00:00", "end": "00:02", "file": "a.jpg"},
                {"start": "00:02", "end": "00:04", "file": "b.jpg"}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(sb.entries.len(), 2);
    assert_eq!(sb.script.as_deref(), Some("Meet the lamp."));
    assert_eq!(sb.duration, None);
    assert_eq!(sb.target_duration_secs(3.0), 4.0);
}

#[test]
fn storyboard_rejects_invalid_declared_duration() {
    assert!(Storyboard::from_json_str(r#"{"entries": [], "duration": -2}"#).is_err());
    assert!(Storyboard::new(vec![]).with_duration(f64::NAN).validate().is_err());
    assert!(Storyboard::from_json_str("{not json").is_err());
}

#[test]
fn target_duration_resolution_order() {
    let timed = Storyboard::new(vec![
        StoryboardEntry::timed(0.0, 3.0, "a").unwrap(),
        StoryboardEntry::timed(5.0, 9.0, "b").unwrap(),
        StoryboardEntry::timed(2.0, 4.0, "c").unwrap(),
    ]);
    assert_eq!(timed.target_duration_secs(3.0), 9.0);
    assert_eq!(timed.clone().with_duration(12.0).target_duration_secs(3.0), 12.0);

    let untimed = Storyboard::new(vec![
        StoryboardEntry::untimed("a"),
        StoryboardEntry::untimed("b"),
    ]);
    assert_eq!(untimed.target_duration_secs(3.0), 6.0);

    assert_eq!(Storyboard::default().target_duration_secs(3.0), 0.0);
}

#[test]
fn storyboard_json_roundtrip_keeps_timecodes_readable() {
    let sb = Storyboard::new(vec![StoryboardEntry::timed(0.0, 2.5, "a").unwrap()]);
    let json = sb.to_json_pretty().unwrap();
    assert!(json.contains("\"00:02.5\""));
    assert_eq!(Storyboard::from_json_str(&json).unwrap(), sb);
}
