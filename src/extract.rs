use crate::config;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time::{timeout, Duration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Pdf,
    Spreadsheet,
    WordDoc,
}

#[async_trait]
pub trait TextExtractor {
    fn kind(&self) -> ExtractorKind;
    async fn extract(&self, path: &Path) -> anyhow::Result<String>;
}

pub type DynExtractor = Arc<dyn TextExtractor + Send + Sync + 'static>;

/// The extractors available to this process, one optional slot per kind.
#[derive(Clone, Default)]
pub struct Extractors {
    pdf: Option<DynExtractor>,
    spreadsheet: Option<DynExtractor>,
    word: Option<DynExtractor>,
}

impl Extractors {
    pub fn none() -> Self { Self::default() }

    /// Resolves each configured command; programs that cannot be found leave their slot empty.
    pub fn from_config(cfg: &config::Extractors) -> Self {
        let mut out = Self::none();
        if !cfg.enabled {
            return out;
        }
        let limits = CommandLimits { timeout_s: cfg.timeout_s, max_output_kb: cfg.max_output_kb };
        for (kind, argv) in [
            (ExtractorKind::Pdf, &cfg.pdf),
            (ExtractorKind::Spreadsheet, &cfg.spreadsheet),
            (ExtractorKind::WordDoc, &cfg.word),
        ] {
            let Some(argv) = argv else { continue };
            match CommandExtractor::resolve(kind, argv, limits) {
                Ok(ex) => {
                    tracing::info!(kind = ?kind, program = %ex.program.display(), "extractor available");
                    out.insert(Arc::new(ex));
                }
                Err(e) => tracing::info!(kind = ?kind, error = %e, "extractor unavailable"),
            }
        }
        out
    }

    pub fn insert(&mut self, ex: DynExtractor) {
        match ex.kind() {
            ExtractorKind::Pdf => self.pdf = Some(ex),
            ExtractorKind::Spreadsheet => self.spreadsheet = Some(ex),
            ExtractorKind::WordDoc => self.word = Some(ex),
        }
    }

    pub fn get(&self, kind: ExtractorKind) -> Option<DynExtractor> {
        match kind {
            ExtractorKind::Pdf => self.pdf.clone(),
            ExtractorKind::Spreadsheet => self.spreadsheet.clone(),
            ExtractorKind::WordDoc => self.word.clone(),
        }
    }

    pub fn available(&self) -> Vec<ExtractorKind> {
        [ExtractorKind::Pdf, ExtractorKind::Spreadsheet, ExtractorKind::WordDoc]
            .into_iter()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandLimits {
    pub timeout_s: u64,
    pub max_output_kb: usize,
}

/// Runs an external converter and takes its stdout as the document text.
pub struct CommandExtractor {
    kind: ExtractorKind,
    program: PathBuf,
    args: Vec<String>,
    limits: CommandLimits,
}

impl CommandExtractor {
    pub fn resolve(kind: ExtractorKind, argv: &[String], limits: CommandLimits) -> anyhow::Result<Self> {
        let (cmd, args) = argv.split_first().ok_or_else(|| anyhow::anyhow!("empty command"))?;
        let path = if cmd.contains('/') { PathBuf::from(cmd) } else { which::which(cmd)? };
        let program = dunce::canonicalize(path)?;
        Ok(Self { kind, program, args: args.to_vec(), limits })
    }

    fn args_for(&self, path: &Path) -> Vec<String> {
        let file = path.to_string_lossy();
        self.args.iter().map(|a| a.replace("{path}", &file)).collect()
    }
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    fn kind(&self) -> ExtractorKind { self.kind }

    async fn extract(&self, path: &Path) -> anyhow::Result<String> {
        let mut command = Command::new(&self.program);
        command.args(self.args_for(path));
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::null());
        command.env_clear();
        if let Ok(p) = std::env::var("PATH") {
            command.env("PATH", p);
        }
        command.kill_on_drop(true);

        let mut child = command.spawn()?;
        let mut stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("stdout not captured"))?;
        let max_bytes = self.limits.max_output_kb * 1024;

        let run = async {
            let (bytes, truncated) = read_capped(&mut stdout, max_bytes).await?;
            if truncated {
                let _ = child.kill().await;
            } else {
                let status = child.wait().await?;
                if !status.success() {
                    anyhow::bail!("{} exited with {}", self.program.display(), status);
                }
            }
            Ok::<_, anyhow::Error>(decode_capped(bytes, truncated))
        };

        let to = Duration::from_secs(self.limits.timeout_s);
        let outcome = timeout(to, run).await;
        match outcome {
            Ok(text) => text,
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("{} timed out after {}s", self.program.display(), self.limits.timeout_s)
            }
        }
    }
}

/// Reads at most `max_bytes`; the flag reports whether the stream had more.
async fn read_capped<R: AsyncRead + Unpin>(reader: &mut R, max_bytes: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok((out, false));
        }
        let room = max_bytes - out.len();
        out.extend_from_slice(&buf[..n.min(room)]);
        if n > room {
            return Ok((out, true));
        }
    }
}

/// Decodes converter output; a cut output drops the trailing partial character.
fn decode_capped(mut bytes: Vec<u8>, truncated: bool) -> String {
    if truncated {
        let tail = bytes.len().saturating_sub(4);
        if let Some(start) = (tail..bytes.len()).rev().find(|&i| bytes[i] & 0xC0 != 0x80) {
            if matches!(std::str::from_utf8(&bytes[start..]), Err(e) if e.error_len().is_none()) {
                bytes.truncate(start);
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}