use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_ENV: &str = "FOLIO_ROOT";
pub const PORT_ENV: &str = "FOLIO_PORT";
pub const BIND_ENV: &str = "FOLIO_BIND";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub root: Root,
    pub browse: Browse,
    pub limits: Limits,
    pub extractors: Extractors,
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Root { pub root_dir: Option<PathBuf> }

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self { Self { bind_addr: "127.0.0.1".to_string(), port: 3000 } }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFilter {
    /// Every file whose name does not start with a dot.
    #[default]
    All,
    /// Only extensions the preview layer recognizes.
    Known,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Browse {
    /// Folder levels attached below a listed directory; 0 means unlimited.
    pub max_depth: usize,
    pub file_filter: FileFilter,
    pub excluded_dirs: Vec<String>,
    pub follow_symlinks: bool,
}

impl Default for Browse {
    fn default() -> Self {
        Self {
            max_depth: 3,
            file_filter: FileFilter::All,
            excluded_dirs: ["node_modules", "target", "dist", "build", "__pycache__", "vendor"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            follow_symlinks: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub max_request_kb: usize,
}

impl Default for Limits {
    fn default() -> Self { Self { max_request_kb: 16 } }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Extractors {
    pub enabled: bool,
    pub timeout_s: u64,
    pub max_output_kb: usize,
    /// argv templates; `{path}` is replaced by the file being extracted.
    pub pdf: Option<Vec<String>>,
    pub spreadsheet: Option<Vec<String>>,
    pub word: Option<Vec<String>>,
}

fn argv(parts: &[&str]) -> Option<Vec<String>> { Some(parts.iter().map(|s| s.to_string()).collect()) }

impl Default for Extractors {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_s: 10,
            max_output_kb: 512,
            pdf: argv(&["pdftotext", "-layout", "{path}", "-"]),
            spreadsheet: argv(&["xlsx2csv", "{path}"]),
            word: argv(&["pandoc", "-t", "plain", "{path}"]),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging { pub format: LogFormat }

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// Loads `path` when it exists, otherwise starts from defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() { Self::load(path) } else { Ok(Self::default()) }
    }

    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|k| std::env::var(k).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(root) = lookup(ROOT_ENV).filter(|v| !v.trim().is_empty()) {
            self.root.root_dir = Some(PathBuf::from(root.trim()));
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| anyhow::anyhow!("{PORT_ENV} is not a valid port: {port}"))?;
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.bind_addr = bind.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 { anyhow::bail!("port must be > 0"); }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        if self.extractors.timeout_s == 0 { anyhow::bail!("extractors.timeout_s must be > 0"); }
        if self.extractors.max_output_kb == 0 { anyhow::bail!("extractors.max_output_kb must be > 0"); }
        for (name, cmd) in [("pdf", &self.extractors.pdf), ("spreadsheet", &self.extractors.spreadsheet), ("word", &self.extractors.word)] {
            if matches!(cmd, Some(argv) if argv.is_empty() || argv[0].trim().is_empty()) {
                anyhow::bail!("extractors.{name} must name a program");
            }
        }
        if self.browse.follow_symlinks && self.browse.max_depth == 0 {
            anyhow::bail!("follow_symlinks requires a non-zero max_depth");
        }
        Ok(())
    }
}
