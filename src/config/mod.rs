use serde::{Deserialize, Serialize};

use crate::filetree::SortOrder;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log: LogConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub show_attributes: bool,
    /// "name" or "size".
    pub sort_order: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("layerbox").required(false))
            .add_source(config::Environment::with_prefix("LAYERBOX").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl RenderConfig {
    /// The configured ordering, falling back to by-name on bad input.
    pub fn resolved_sort_order(&self) -> SortOrder {
        self.sort_order.parse().unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig { filter: "layerbox=debug,info".to_string() },
            render: RenderConfig { show_attributes: true, sort_order: "name".to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.log.filter, "layerbox=debug,info");
        assert!(config.render.show_attributes);
        assert_eq!(config.render.sort_order, "name");
    }

    #[test]
    fn test_resolved_sort_order() {
        let mut render = Config::default().render;
        assert_eq!(render.resolved_sort_order(), SortOrder::ByName);

        render.sort_order = "size".to_string();
        assert_eq!(render.resolved_sort_order(), SortOrder::BySizeDesc);
    }

    #[test]
    fn test_resolved_sort_order_falls_back_on_bad_input() {
        let mut render = Config::default().render;
        render.sort_order = "bogus".to_string();
        assert_eq!(render.resolved_sort_order(), SortOrder::ByName);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config);
        assert!(json.is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "log": {"filter": "layerbox=trace"},
            "render": {"show_attributes": false, "sort_order": "size"}
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.log.filter, "layerbox=trace");
        assert!(!config.render.show_attributes);
        assert_eq!(config.render.resolved_sort_order(), SortOrder::BySizeDesc);
    }
}
