use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::Result;
use crate::plot::corner::CornerStyle;
use crate::trials::{ColumnSpec, TableSchema};

/// Declared layout of the parameter trial table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "SchemaConfig::default_columns")]
    pub columns: Vec<ColumnSpec>,
    #[serde(default = "SchemaConfig::default_skip")]
    pub skip: usize,
    #[serde(default)]
    pub allow_extra_columns: bool,
}

impl SchemaConfig {
    fn default_columns() -> Vec<ColumnSpec> {
        [
            ("chisquare", false),
            ("dof", false),
            ("nhabs", false),
            ("temp", false),
            ("abund", false),
            ("tau", true),
            ("pshnorm", true),
            ("plnorm", true),
            ("cons", false),
        ]
        .into_iter()
        .map(|(name, log)| ColumnSpec::new(name, "", log))
        .collect()
    }
    fn default_skip() -> usize {
        2
    }

    pub fn to_schema(&self) -> Result<TableSchema> {
        TableSchema::new(self.columns.clone(), self.skip, self.allow_extra_columns)
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            columns: Self::default_columns(),
            skip: Self::default_skip(),
            allow_extra_columns: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FtestConfig {
    /// Significance level for the detection rate in summaries.
    #[serde(default = "FtestConfig::default_alpha")]
    pub alpha: f64,
}

impl FtestConfig {
    fn default_alpha() -> f64 {
        0.0027
    }
}

impl Default for FtestConfig {
    fn default() -> Self {
        Self {
            alpha: Self::default_alpha(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub corner: CornerStyle,
    #[serde(default)]
    pub ftest: FtestConfig,
}

impl AnalysisConfig {
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults and return them.
        let default_cfg = Self::default();
        match default_cfg.commented_toml() {
            Ok(text) => {
                if let Err(err) = fs::write(path_obj, text) {
                    warn!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                warn!("Failed to serialize default config ({err}); continuing with defaults");
            }
        }
        default_cfg
    }

    /// Every section header live, every value commented out. Scalars come
    /// before `[[...]]` blocks so uncommenting keeps keys in their section.
    fn commented_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        let toml::Value::Table(sections) = toml::Value::try_from(self)? else {
            return Ok(String::new());
        };
        let mut out = String::new();
        for (section, body) in &sections {
            let toml::Value::Table(fields) = body else {
                continue;
            };
            out.push_str(&format!("[{section}]\n"));
            let is_table_array = |v: &toml::Value| {
                matches!(v, toml::Value::Array(items)
                    if !items.is_empty() && items.iter().all(toml::Value::is_table))
            };
            for (key, value) in fields.iter().filter(|(_, v)| !is_table_array(*v)) {
                out.push_str(&format!("# {key} = {value}\n"));
            }
            for (key, value) in fields.iter().filter(|(_, v)| is_table_array(*v)) {
                let toml::Value::Array(items) = value else {
                    continue;
                };
                for item in items.iter().filter_map(toml::Value::as_table) {
                    out.push_str(&format!("# [[{section}.{key}]]\n"));
                    for (k, v) in item {
                        out.push_str(&format!("# {k} = {v}\n"));
                    }
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}
