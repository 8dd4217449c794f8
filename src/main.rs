mod config;
mod content;
mod errors;
mod extract;
mod logging;
mod root;
mod security;
mod server;
mod tree;


use crate::config::Config;
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    root: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut out = Args::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let v = args.get(i).context("--config requires a path")?;
                out.config = Some(PathBuf::from(v));
            }
            "--root" => {
                i += 1;
                let v = args.get(i).context("--root requires a directory")?;
                out.root = Some(PathBuf::from(v));
            }
            other if !other.starts_with("--") && out.root.is_none() => out.root = Some(PathBuf::from(other)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
        i += 1;
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from("folio.toml"));
    let mut cfg = Config::load_or_default(&config_path).context("loading config")?;
    cfg.apply_env().context("reading environment")?;
    if let Some(root) = args.root {
        cfg.root.root_dir = Some(root);
    }
    cfg.validate().context("validating config")?;

    logging::init(cfg.logging.format);

    let root = root::RootHandle::new();
    if let Some(dir) = cfg.root.root_dir.clone() {
        root.set(&dir).await.with_context(|| format!("setting root {}", dir.display()))?;
    }

    let extractors = extract::Extractors::from_config(&cfg.extractors);
    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    let info = root.info().await;
    info!(
        addr = %addr,
        root = info.root_path.as_deref().unwrap_or("<unconfigured>"),
        extractors = ?extractors.available(),
        "folio ready"
    );

    server::serve(server::AppState::new(cfg, root, extractors)).await
}
