use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TexstageError::out_of_range("x")
            .to_string()
            .contains("out of range:")
    );
    assert!(
        TexstageError::backend("x")
            .to_string()
            .contains("backend error:")
    );
    assert!(
        TexstageError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        TexstageError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TexstageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
