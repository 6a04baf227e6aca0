use glob::Pattern;

use crate::schema::SettingsMap;

/// Query settings by glob patterns over key names (OR logic)
/// Returns the settings matching any of the provided patterns
pub fn query_settings(
    settings: &SettingsMap,
    patterns: &[&str],
) -> Result<SettingsMap, anyhow::Error> {
    // Compile all patterns first to fail fast on invalid patterns
    let compiled_patterns: Vec<Pattern> = patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| anyhow::anyhow!("Invalid query pattern '{}': {}", p, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Keep a setting if ANY pattern matches its key
    let queried: SettingsMap = settings
        .iter()
        .filter(|(key, _)| compiled_patterns.iter().any(|pattern| pattern.matches(key)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(queried)
}
