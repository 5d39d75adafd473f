use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WebConfig {
    pub address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrometheusConfig {
    pub address: String,
    pub port: u16,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 9080,
        }
    }
}

/// Presence of this section enables account management.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccountsConfig {
    pub path: PathBuf,
}

/// Presence of this section enables the vulnerability report endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScannerConfig {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Configuration {
    /// Base URL of the registry, scheme included.
    pub registry: String,
    pub web: WebConfig,
    pub prometheus: PrometheusConfig,
    pub accounts: Option<AccountsConfig>,
    pub scanner: Option<ScannerConfig>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            registry: "".to_string(),
            web: WebConfig::default(),
            prometheus: PrometheusConfig::default(),
            accounts: None,
            scanner: None,
        }
    }
}

impl Configuration {
    pub fn figment(configs: Vec<PathBuf>) -> Figment {
        let fig = Figment::from(Serialized::defaults(Configuration::default()));

        let app_dirs = AppDirs::new(Some("registry-ui"), true).unwrap();
        let config_path = app_dirs.config_dir.join("config.yaml");

        let fig = match config_path.exists() {
            true => fig.admerge(Yaml::file(config_path)),
            false => fig,
        };

        let fig = configs.into_iter().fold(fig, |fig, config_path| {
            fig.admerge(Yaml::file(config_path))
        });

        fig.admerge(Env::prefixed("REGISTRY_UI_").split("_"))
    }

    pub fn config(figment: Figment) -> Result<Configuration> {
        let config: Configuration = figment.extract().context("Failed to load configuration")?;

        if config.registry.is_empty() {
            bail!("No registry url configured");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn startup_fails_without_a_registry() {
        figment::Jail::expect_with(|jail| {
            let dir = jail.directory().to_string_lossy().into_owned();
            jail.set_env("XDG_CONFIG_HOME", dir);

            assert!(Configuration::config(Configuration::figment(vec![])).is_err());

            Ok(())
        });
    }

    #[test]
    fn registry_from_environment() {
        figment::Jail::expect_with(|jail| {
            let dir = jail.directory().to_string_lossy().into_owned();
            jail.set_env("XDG_CONFIG_HOME", dir);
            jail.set_env("REGISTRY_UI_REGISTRY", "https://registry.example");

            let config = Configuration::config(Configuration::figment(vec![]))
                .expect("Configuration should be parseable");

            assert_eq!(config.registry, "https://registry.example");
            assert_eq!(config.web.port, 8080);
            assert!(config.accounts.is_none());
            assert!(config.scanner.is_none());

            Ok(())
        });
    }

    /// Config files stack, later files and the environment win.
    #[test]
    fn stacking() {
        figment::Jail::expect_with(|jail| {
            let dir = jail.directory().to_string_lossy().into_owned();
            jail.set_env("XDG_CONFIG_HOME", dir);
            jail.set_env("REGISTRY_UI_WEB_PORT", "9999");

            jail.create_file(
                "config.yaml",
                r#"
                {
                  "registry": "https://registry.example",
                  "web": {"address": "127.0.0.1", "port": 8081}
                }
                "#,
            )?;

            jail.create_file(
                "extras.yaml",
                r#"
                {
                  "scanner": {"url": "http://scanner:9999"},
                  "accounts": {"path": "/etc/auth/accounts.yml"}
                }
                "#,
            )?;

            let config = Configuration::config(Configuration::figment(vec![
                jail.directory().join("config.yaml"),
                jail.directory().join("extras.yaml"),
            ]))
            .expect("Configuration should be parseable");

            assert_eq!(config.registry, "https://registry.example");
            assert_eq!(config.web.address, "127.0.0.1");
            assert_eq!(config.web.port, 9999);
            assert_eq!(config.scanner.unwrap().url, "http://scanner:9999");
            assert_eq!(
                config.accounts.unwrap().path,
                PathBuf::from("/etc/auth/accounts.yml")
            );

            Ok(())
        });
    }
}
