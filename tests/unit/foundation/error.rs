use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CueError::invalid_duration("x")
            .to_string()
            .contains("invalid duration:")
    );
    assert!(
        CueError::invalid_tempo("x")
            .to_string()
            .contains("invalid tempo:")
    );
    assert!(
        CueError::composition("x")
            .to_string()
            .contains("composition mismatch:")
    );
    assert!(CueError::not_found("x").to_string().contains("not found:"));
    assert!(
        CueError::invalid_time("x")
            .to_string()
            .contains("invalid time argument:")
    );
    assert!(CueError::config("x").to_string().contains("config error:"));
    assert!(
        CueError::playback("x")
            .to_string()
            .contains("playback error:")
    );
    assert!(
        CueError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CueError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
