use smartcut_pipeline::PipelineConfig;
use std::path::Path;

/// Load `path` if given, otherwise the defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p),
        None => Ok(PipelineConfig::default()),
    }
}

/// Execute `smartcut config [--config <file>]`
pub fn execute(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load(path)?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        assert_eq!(load(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn printed_yaml_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartcut.yaml");
        let mut config = PipelineConfig::default();
        config.concept.min_group = 4;
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
        assert_eq!(load(Some(&path)).unwrap(), config);
    }
}
