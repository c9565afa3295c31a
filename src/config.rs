//! Load runtime configuration. Every field has a default, so `config.yaml` is optional.

use serde::Deserialize;
use std::{fs, net::SocketAddr, path::Path, path::PathBuf};

use anyhow::Context;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BundlerCfg {
    /// Project root; prompted for when unset and not given on the command line.
    pub project_path: Option<PathBuf>,
    /// Program + args; `--port <port>` is appended.
    pub command: Vec<String>,
    pub port: u16,
}

impl Default for BundlerCfg {
    fn default() -> Self {
        Self {
            project_path: None,
            command: vec!["npx".into(), "react-native".into(), "start".into()],
            port: 8081,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerCfg {
    pub static_port: u16,
    pub static_dir: PathBuf,
    pub viewer_page: String,
    pub ws_port: u16,
    pub open_browser: bool,
    pub open_delay_ms: u64,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            static_port: 8088,
            static_dir: PathBuf::from("."),
            viewer_page: "debugger.html".into(),
            ws_port: 8089,
            open_browser: true,
            open_delay_ms: 1000,
        }
    }
}

impl ServerCfg {
    /// Static files are reachable from the LAN, like a plain `http.server`.
    pub fn static_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.static_port))
    }

    /// The push channel stays on loopback.
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.ws_port))
    }

    pub fn viewer_url(&self) -> String {
        format!(
            "http://localhost:{}/{}",
            self.static_port,
            self.viewer_page.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bundler: BundlerCfg,
    pub server: ServerCfg,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Self =
            serde_yaml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Like [`AppConfig::load`], but a missing file means defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
