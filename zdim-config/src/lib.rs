use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ZDIM_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("ZDIM_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 演示输出使用的线性单位格式。
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoUnits {
    Decimal,
    Architectural,
    Engineering,
    Fractional,
    Scientific,
}

impl Default for DemoUnits {
    fn default() -> Self {
        DemoUnits::Decimal
    }
}

/// CLI 演示的标注参数。
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub units: DemoUnits,
    #[serde(default = "DemoConfig::default_decimal_places")]
    pub decimal_places: i16,
    #[serde(default = "DemoConfig::default_scale")]
    pub scale: f64,
    #[serde(default = "DemoConfig::default_style_name")]
    pub style_name: String,
}

impl DemoConfig {
    fn default_decimal_places() -> i16 {
        2
    }

    fn default_scale() -> f64 {
        1.0
    }

    fn default_style_name() -> String {
        "Standard".to_string()
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            units: DemoUnits::default(),
            decimal_places: Self::default_decimal_places(),
            scale: Self::default_scale(),
            style_name: Self::default_style_name(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert!(matches!(cfg.demo.units, DemoUnits::Decimal));
        assert_eq!(cfg.demo.decimal_places, 2);
        assert!((cfg.demo.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.demo.style_name, "Standard");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [demo]
            units = "architectural"
            decimal_places = 4
            scale = 2.0
            style_name = "ISO-25"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!(matches!(cfg.demo.units, DemoUnits::Architectural));
        assert_eq!(cfg.demo.decimal_places, 4);
        assert!((cfg.demo.scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.demo.style_name, "ISO-25");
    }

    #[test]
    fn parse_error_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "not valid toml [[").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
