use anyhow::{Context, Result};
use reign_core::{EventCatalog, KingdomState, ResolutionConfig};
use std::path::Path;

fn read(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))
}

pub fn load_catalog(path: &Path) -> Result<EventCatalog> {
    log::info!("Loading event catalog from {:?}", path);
    let json = read(path, "event catalog")?;
    let catalog = EventCatalog::from_json(&json)
        .with_context(|| format!("Invalid event catalog {}", path.display()))?;
    log::info!("Loaded {} events", catalog.len());
    Ok(catalog)
}

pub fn load_kingdom(path: &Path) -> Result<KingdomState> {
    log::info!("Loading kingdom from {:?}", path);
    let json = read(path, "kingdom")?;
    let state: KingdomState = serde_json::from_str(&json)
        .with_context(|| format!("Invalid kingdom state {}", path.display()))?;
    log::debug!(
        "Kingdom on turn {}: {} factions, {} armies, {} structures, {} hexes",
        state.turn,
        state.factions.len(),
        state.armies.len(),
        state.structures.len(),
        state.hexes.len()
    );
    Ok(state)
}

/// Defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ResolutionConfig> {
    let Some(path) = path else {
        return Ok(ResolutionConfig::default());
    };
    let json = read(path, "resolution config")?;
    let config: ResolutionConfig = serde_json::from_str(&json)
        .with_context(|| format!("Invalid resolution config {}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid resolution config {}: {}", path.display(), e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn data(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
    }

    #[test]
    fn test_demo_data_loads() {
        let catalog = load_catalog(&data("events.json")).unwrap();
        assert!(catalog.get("bandit-activity").is_some());
        let kingdom = load_kingdom(&data("kingdom.json")).unwrap();
        assert_eq!(kingdom.turn, 4);
        assert!(!kingdom.hexes.is_empty());
    }

    #[test]
    fn test_config_defaults_and_validation() {
        assert_eq!(load_config(None).unwrap(), ResolutionConfig::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_condition_severity": 0}}"#).unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("max_condition_severity"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_catalog(Path::new("/nonexistent/events.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/events.json"));
    }
}
