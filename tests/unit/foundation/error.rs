use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StoryreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StoryreelError::schedule("x")
            .to_string()
            .contains("schedule error:")
    );
    assert!(
        StoryreelError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        StoryreelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StoryreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
