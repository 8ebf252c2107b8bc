//! Default metadata generator
//!
//! Derives the business columns of the document library from what is known
//! about a file without reading its content: extension-driven document type
//! and category, filename keywords, origin folder, timestamps and age.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::FieldMap;
use crate::ports::{GeneratorInput, IMetadataGenerator};

/// Extension used when a file name has none
pub const NO_EXTENSION: &str = "SEM_EXT";

/// Folder label used for files at the library root
pub const ROOT_FOLDER_LABEL: &str = "Raiz";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const MAX_KEYWORDS: usize = 8;
const MAX_EMAIL_KEYWORDS: usize = 5;

/// Generator keyed on file extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMetadataGenerator;

impl ExtensionMetadataGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IMetadataGenerator for ExtensionMetadataGenerator {
    fn generate(&self, input: &GeneratorInput) -> FieldMap {
        let name = input.file_name.as_str();
        let extension = extension_of(name);
        let is_email = is_email_extension(&extension);
        let folder = clean_parent_path(input.parent_path.as_deref());
        let age_days = age_in_days(input.created_at, input.now);

        let full_path = if folder == ROOT_FOLDER_LABEL {
            name.to_string()
        } else {
            format!("{folder}/{name}")
        };

        let mut fields = FieldMap::new();
        let mut put = |key: &str, value: Value| {
            fields.insert(key.to_string(), value);
        };

        put("TipoDocumento", document_type(&extension).into());
        put(
            "StatusProcessamento",
            if is_email { "Importado EML" } else { "Processado" }.into(),
        );
        put("PalavrasChaveIA", keywords(name, is_email).into());
        put("SubpastaOrigem", folder.into());
        put("DataProcessamentoIA", format_timestamp(input.now).into());
        put("CategoriaInteligente", category(&extension).into());
        put(
            "CriadoPor",
            input
                .created_by
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Sistema")
                .into(),
        );
        put(
            "DataModificacaoOriginal",
            format_timestamp(input.modified_at.unwrap_or(input.now)).into(),
        );
        put("CaminhoCompleto", full_path.into());
        put("NomeArquivoLimpo", stem_of(name).into());
        put("TamanhoBytes", input.size.into());
        put("ExtensaoArquivo", extension.to_uppercase().into());
        put(
            "DataCriacaoOriginal",
            format_timestamp(input.created_at.unwrap_or(input.now)).into(),
        );
        put("IdadeArquivoDias", age_days.into());
        put("IdadeArquivoDescricao", describe_age(age_days).into());

        fields
    }
}

/// Text after the last dot, or [`NO_EXTENSION`]
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() => file_name[idx + 1..].to_string(),
        _ => NO_EXTENSION.to_string(),
    }
}

fn stem_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

fn is_email_extension(extension: &str) -> bool {
    extension.eq_ignore_ascii_case("eml") || extension.eq_ignore_ascii_case("msg")
}

/// Document type label for an extension
pub fn document_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "Contrato",
        "docx" | "doc" => "Relatorio",
        "xlsx" | "xls" => "Planilha",
        "pptx" | "ppt" => "Apresentacao",
        "eml" | "msg" => "Email",
        "txt" | "rtf" => "Documento",
        "mp4" | "mov" => "Video",
        "jpg" | "jpeg" | "png" | "gif" => "Imagem",
        _ => "Outro",
    }
}

/// Category label for an extension
pub fn category(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "eml" | "msg" => "Comunicacao",
        "pdf" => "Documento Formal",
        "docx" | "doc" | "txt" | "rtf" => "Texto",
        "xlsx" | "xls" => "Financeiro",
        "pptx" | "ppt" => "Apresentacao",
        "mp4" | "mov" => "Midia - Video",
        "jpg" | "jpeg" | "png" | "gif" => "Midia - Imagem",
        _ => "Outros",
    }
}

/// Comma-separated keywords taken from the file name
///
/// Words shorter than three characters are ignored. Emails keep their first
/// five words (in order, duplicates allowed) and fall back to `email`;
/// everything else keeps the first eight distinct words.
pub fn keywords(file_name: &str, is_email: bool) -> String {
    let stem = stem_of(file_name);

    if is_email {
        let words: Vec<&str> = stem
            .split(|c: char| c == '-' || c == '_' || c == ' ')
            .filter(|w| w.chars().count() > 2)
            .take(MAX_EMAIL_KEYWORDS)
            .collect();
        return if words.is_empty() {
            "email".to_string()
        } else {
            words.join(", ")
        };
    }

    let mut seen: Vec<String> = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    for word in stem
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == ' ')
        .filter(|w| w.chars().count() > 2)
    {
        let folded = word.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            words.push(word);
        }
        if words.len() == MAX_KEYWORDS {
            break;
        }
    }
    words.join(", ")
}

/// Parent path without the drive-root prefix, [`ROOT_FOLDER_LABEL`] when empty
pub fn clean_parent_path(parent_path: Option<&str>) -> String {
    let raw = parent_path.unwrap_or_default().trim();

    let relative = if let Some(rest) = raw.strip_prefix("/drive/root:") {
        rest
    } else if let Some(rest) = raw.strip_prefix("/drives/") {
        rest.find("/root:")
            .map(|idx| &rest[idx + "/root:".len()..])
            .unwrap_or(raw)
    } else {
        raw
    };

    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        ROOT_FOLDER_LABEL.to_string()
    } else {
        relative.to_string()
    }
}

fn age_in_days(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    created_at
        .map(|created| (now - created).num_days().max(0))
        .unwrap_or(0)
}

/// Human-readable age: days under a month, months under a year, then years
pub fn describe_age(days: i64) -> String {
    if days < 30 {
        return if days == 1 {
            "1 dia".to_string()
        } else {
            format!("{days} dias")
        };
    }

    if days < 365 {
        let months = (days / 30).max(1);
        return if months == 1 {
            "1 mes".to_string()
        } else {
            format!("{months} meses")
        };
    }

    let years = (days / 365).max(1);
    if years == 1 {
        "1 ano".to_string()
    } else {
        format!("{years} anos")
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
