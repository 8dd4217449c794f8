use crate::{
    errors::{AppError, AppResult},
    extract::{ExtractorKind, Extractors},
};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "js", "mjs", "ts", "jsx", "tsx", "html", "htm", "css", "scss", "json", "xml", "csv",
    "tsv", "log", "yaml", "yml", "toml", "ini", "conf", "cfg", "sh", "py", "rs", "go", "java", "c", "h", "cpp",
    "hpp", "sql",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Xlsx,
    Xls,
    Docx,
    Doc,
    Pptx,
    Ppt,
}

impl DocumentFormat {
    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Xlsx => "XLSX",
            DocumentFormat::Xls => "XLS",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Doc => "DOC",
            DocumentFormat::Pptx => "PPTX",
            DocumentFormat::Ppt => "PPT",
        }
    }

    pub fn extractor(self) -> Option<ExtractorKind> {
        match self {
            DocumentFormat::Pdf => Some(ExtractorKind::Pdf),
            DocumentFormat::Xlsx | DocumentFormat::Xls => Some(ExtractorKind::Spreadsheet),
            DocumentFormat::Docx | DocumentFormat::Doc => Some(ExtractorKind::WordDoc),
            DocumentFormat::Pptx | DocumentFormat::Ppt => None,
        }
    }

    pub fn placeholder(self) -> String {
        format!("{} file: preview is not available, download the file to view it.", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image(&'static str),
    Document(DocumentFormat),
    /// Unrecognized extension; previewed as text when it decodes.
    Other,
}

/// Lower-cased extension without the dot, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default()
}

pub fn classify(ext: &str) -> ContentKind {
    let image = match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "ico" => Some("image/x-icon"),
        _ => None,
    };
    if let Some(mime) = image {
        return ContentKind::Image(mime);
    }
    let doc = match ext {
        "pdf" => Some(DocumentFormat::Pdf),
        "xlsx" => Some(DocumentFormat::Xlsx),
        "xls" => Some(DocumentFormat::Xls),
        "docx" => Some(DocumentFormat::Docx),
        "doc" => Some(DocumentFormat::Doc),
        "pptx" => Some(DocumentFormat::Pptx),
        "ppt" => Some(DocumentFormat::Ppt),
        _ => None,
    };
    if let Some(format) = doc {
        return ContentKind::Document(format);
    }
    if TEXT_EXTENSIONS.contains(&ext) {
        ContentKind::Text
    } else {
        ContentKind::Other
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: Option<String>,
    pub extension: String,
    pub content: String,
    pub is_text: bool,
    pub is_image: bool,
    pub downloadable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the preview descriptor for a resolved file.
///
/// Only a metadata failure is an error; problems reading or converting the
/// content end up in `content` and `error` instead.
pub async fn read_content(path: &Path, rel: String, extractors: &Extractors) -> AppResult<FileDescriptor> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| AppError::from_io(&e))?;
    if meta.is_dir() {
        return Err(AppError::NotAFile);
    }
    let extension = extension_of(path);
    let mut desc = FileDescriptor {
        name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        path: rel,
        size: meta.len(),
        modified: meta.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true)),
        extension: extension.clone(),
        content: String::new(),
        is_text: false,
        is_image: false,
        downloadable: false,
        error: None,
    };

    match classify(&extension) {
        ContentKind::Text | ContentKind::Other => match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                desc.content = text;
                desc.is_text = true;
            }
            Err(e) => desc.fail(e.to_string()),
        },
        ContentKind::Image(mime) => match tokio::fs::read(path).await {
            Ok(bytes) => {
                let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
                desc.content = format!("data:{mime};base64,{b64}");
                desc.is_image = true;
            }
            Err(e) => desc.fail(e.to_string()),
        },
        ContentKind::Document(format) => {
            desc.downloadable = true;
            desc.content = match format.extractor().and_then(|k| extractors.get(k)) {
                Some(ex) => match ex.extract(path).await {
                    Ok(text) => {
                        desc.is_text = true;
                        text
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "extraction failed");
                        format.placeholder()
                    }
                },
                None => format.placeholder(),
            };
        }
    }
    Ok(desc)
}

impl FileDescriptor {
    fn fail(&mut self, message: String) {
        tracing::warn!(path = %self.path, error = %message, "preview read failed");
        self.content = format!("Unable to read file: {message}");
        self.error = Some(message);
        self.is_text = false;
        self.is_image = false;
        self.downloadable = true;
    }
}
