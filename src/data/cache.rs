/// Key/value store for model responses.
///
/// Lookups that fail for any reason are reported as misses; a cache must
/// never turn into a source of pipeline errors.
pub trait Cache {
    /// Returns the stored response text for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing a previous entry.
    ///
    /// Storage failures are logged and swallowed.
    fn set(&self, key: &str, value: &str);
}
