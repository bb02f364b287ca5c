use sentinel_core::SentinelError;

/// Maps a raw `rusqlite::Error` onto the crate-wide taxonomy, applying the
/// transient-error policy: "locked"/"busy"/"timeout" are retryable,
/// everything else is fatal.
pub fn classify(err: rusqlite::Error) -> SentinelError {
    let text = err.to_string();
    if SentinelError::is_retryable_text(&text) {
        SentinelError::transient(text)
    } else {
        SentinelError::fatal(text)
    }
}

pub fn classify_pool(err: r2d2::Error) -> SentinelError {
    SentinelError::transient(err.to_string())
}
