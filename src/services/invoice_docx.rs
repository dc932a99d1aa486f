//! Invoice documents rendered from a `.docx` template.
//!
//! A template is an ordinary Word package. Placeholders are written `{{ key }}` and may be
//! split across several runs of the same paragraph. Text values are applied outside of
//! tables, table values only inside them, and `{{ signature }}` is replaced by an inline
//! picture wherever it appears.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use time::Date;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::time::format_long_date;

pub(crate) const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const DOCUMENT_ENTRY: &str = "word/document.xml";
const DOCUMENT_RELS_ENTRY: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";
const PACKAGE_RELS_ENTRY: &str = "_rels/.rels";

const SIGNATURE_KEY: &str = "signature";
const SIGNATURE_REL_ID: &str = "rIdInvoiceSignature";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
/// 1.5 cm in English Metric Units.
const SIGNATURE_WIDTH_EMU: u64 = 540_000;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const EMPTY_DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const DEFAULT_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const DEFAULT_PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DEFAULT_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body>
<w:p><w:r><w:t xml:space="preserve">TAX INVOICE {{ year }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Date: {{ date }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">To: {{ school_name }}</w:t></w:r></w:p>
<w:p><w:r><w:t>{{ school_address }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Competition registration for {{ total_count }} students</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Total due: ${{ total_fees }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Account name: {{ account_name }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">BSB: {{ bsb }}</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Account number: {{ account_number }}</w:t></w:r></w:p>
<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="4800"/><w:gridCol w:w="4800"/></w:tblGrid><w:tr><w:tc><w:p><w:r><w:t>{{ address }}</w:t></w:r></w:p><w:p><w:r><w:t>{{ email }}</w:t></w:r></w:p><w:p><w:r><w:t>{{ website }}</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{{ signature }}</w:t></w:r></w:p><w:p><w:r><w:t>{{ chair_name }}</w:t></w:r></w:p><w:p><w:r><w:t>{{ chair_title }}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p/><w:sectPr/></w:body></w:document>"#;

#[derive(Debug, Error)]
pub(crate) enum InvoiceError {
    #[error("invalid invoice template: {0}")]
    Template(#[from] zip::result::ZipError),
    #[error("invoice template has no word/document.xml")]
    MissingDocument,
    #[error("invoice template part {0} is not valid UTF-8")]
    Encoding(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// School details printed on an invoice.
#[derive(Debug, Clone)]
pub(crate) struct InvoiceSchool {
    pub(crate) name: String,
    pub(crate) address: String,
    pub(crate) student_count: i64,
}

/// Placeholder values for one invoice.
#[derive(Debug, Clone)]
pub(crate) struct InvoiceValues {
    pub(crate) school_name: String,
    texts: Vec<(String, String)>,
    tables: Vec<(String, String)>,
    signature: Option<String>,
}

impl InvoiceValues {
    /// Builds the values from the `invoice` setting. Without a school, sample details are
    /// used so the template can be previewed.
    pub(crate) fn from_setting(setting: &Value, school: Option<&InvoiceSchool>, today: Date) -> Self {
        let (school_name, school_address, student_count) = match school {
            Some(school) => (school.name.clone(), school.address.clone(), school.student_count),
            None => ("Sample School Name".to_string(), "Sample Address1\nAddress2".to_string(), 1),
        };
        let total_fees = fee_amount(setting.get("fees")).saturating_mul(student_count);

        let texts = vec![
            ("year", today.year().to_string()),
            ("date", format_long_date(today)),
            ("school_name", school_name.clone()),
            ("school_address", school_address),
            ("total_count", student_count.to_string()),
            ("total_fees", total_fees.to_string()),
            ("account_name", setting_text(setting, "accountName")),
            ("bsb", setting_text(setting, "bsb")),
            ("account_number", setting_text(setting, "accountNumber")),
        ];
        let tables = vec![
            ("address", setting_text(setting, "address")),
            ("email", setting_text(setting, "email")),
            ("website", setting_text(setting, "website")),
            ("chair_name", setting_text(setting, "chairName")),
            ("chair_title", setting_text(setting, "chairTitle")),
        ];
        let signature = setting
            .get("signature")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Self {
            school_name,
            texts: with_placeholders(texts),
            tables: with_placeholders(tables),
            signature,
        }
    }

    pub(crate) fn file_name(&self) -> String {
        format!("{} Invoice.docx", self.school_name)
    }
}

fn placeholder(key: &str) -> String {
    format!("{{{{ {key} }}}}")
}

fn with_placeholders(values: Vec<(&str, String)>) -> Vec<(String, String)> {
    values.into_iter().map(|(key, value)| (placeholder(key), value)).collect()
}

fn setting_text(setting: &Value, key: &str) -> String {
    match setting.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn fee_amount(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(number)) => {
            number.as_i64().or_else(|| number.as_f64().map(|fee| fee as i64)).unwrap_or(0)
        }
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|fee| fee as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Reads the configured template, falling back to the built-in one.
pub(crate) async fn load_template(path: Option<&Path>) -> Result<Vec<u8>, InvoiceError> {
    if let Some(path) = path {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(tokio::fs::read(path).await?);
        }
        tracing::warn!(path = %path.display(), "Invoice template missing; using built-in template");
    }
    default_template()
}

pub(crate) fn default_template() -> Result<Vec<u8>, InvoiceError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in [
        (CONTENT_TYPES_ENTRY, DEFAULT_CONTENT_TYPES),
        (PACKAGE_RELS_ENTRY, DEFAULT_PACKAGE_RELS),
        (DOCUMENT_ENTRY, DEFAULT_DOCUMENT),
        (DOCUMENT_RELS_ENTRY, EMPTY_DOCUMENT_RELS),
    ] {
        writer.start_file(name, options)?;
        writer.write_all(body.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

struct Entry {
    name: String,
    is_dir: bool,
    data: Vec<u8>,
}

/// Produces the filled-in document from `template`.
pub(crate) fn render(template: &[u8], values: &InvoiceValues) -> Result<Vec<u8>, InvoiceError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut entries = Vec::with_capacity(archive.len() + 1);
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push(Entry { name, is_dir, data });
    }

    let image = values.signature.as_deref().and_then(|encoded| {
        SignatureImage::decode(encoded)
            .map_err(|reason| tracing::warn!(reason, "Ignoring invoice signature"))
            .ok()
    });

    let document = entries
        .iter_mut()
        .find(|entry| entry.name == DOCUMENT_ENTRY)
        .ok_or(InvoiceError::MissingDocument)?;
    let xml = entry_text(document)?;
    let drawing = image
        .as_ref()
        .map(|image| image.drawing_run(1000 + xml.matches("<wp:docPr").count()));
    let (xml, drawn) = rewrite_document(&xml, values, drawing.as_deref());
    document.data = xml.into_bytes();

    if let (Some(image), true) = (image, drawn) {
        match entries.iter_mut().find(|entry| entry.name == DOCUMENT_RELS_ENTRY) {
            Some(rels) => {
                let xml = entry_text(rels)?;
                rels.data = add_relationship(&xml, &image).into_bytes();
            }
            None => entries.push(Entry {
                name: DOCUMENT_RELS_ENTRY.to_string(),
                is_dir: false,
                data: add_relationship(EMPTY_DOCUMENT_RELS, &image).into_bytes(),
            }),
        }
        if let Some(types) = entries.iter_mut().find(|entry| entry.name == CONTENT_TYPES_ENTRY) {
            let xml = entry_text(types)?;
            types.data =
                ensure_default_content_type(&xml, image.extension, image.content_type).into_bytes();
        }
        entries.push(Entry { name: image.entry_name(), is_dir: false, data: image.bytes });
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in &entries {
        if entry.is_dir {
            writer.add_directory(entry.name.as_str(), options)?;
            continue;
        }
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }

    Ok(writer.finish()?.into_inner())
}

fn entry_text(entry: &Entry) -> Result<String, InvoiceError> {
    String::from_utf8(entry.data.clone()).map_err(|_| InvoiceError::Encoding(entry.name.clone()))
}

/// Rewrites every paragraph of `word/document.xml`. Returns whether a drawing was inserted.
fn rewrite_document(xml: &str, values: &InvoiceValues, drawing: Option<&str>) -> (String, bool) {
    let image_key = placeholder(SIGNATURE_KEY);
    let mut out = String::with_capacity(xml.len());
    let mut table_depth = 0usize;
    let mut drawn = false;
    let mut cursor = 0;

    while let Some((start, end)) = next_paragraph(xml, cursor) {
        let gap = &xml[cursor..start];
        let opened = gap.matches("<w:tbl>").count() + gap.matches("<w:tbl ").count();
        table_depth = (table_depth + opened).saturating_sub(gap.matches("</w:tbl>").count());
        out.push_str(gap);

        let replacements = if table_depth > 0 { &values.tables } else { &values.texts };
        let (paragraph, inserted) =
            rewrite_paragraph(&xml[start..end], replacements, &image_key, drawing);
        drawn |= inserted;
        out.push_str(&paragraph);
        cursor = end;
    }
    out.push_str(&xml[cursor..]);

    (out, drawn)
}

/// Byte range of the next non-empty `<w:p>` element at or after `from`.
fn next_paragraph(xml: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;
    loop {
        let start = search + xml[search..].find("<w:p")?;
        let tag_end = start + xml[start..].find('>')?;
        let is_paragraph = matches!(xml.as_bytes().get(start + 4), Some(b'>' | b' ' | b'/'));
        if !is_paragraph || xml.as_bytes()[tag_end - 1] == b'/' {
            search = tag_end + 1;
            continue;
        }
        let end = tag_end + xml[tag_end..].find("</w:p>")? + "</w:p>".len();
        return Some((start, end));
    }
}

struct TextNode {
    start: usize,
    end: usize,
    content_start: usize,
    content_end: usize,
}

fn text_nodes(paragraph: &str) -> Vec<TextNode> {
    let bytes = paragraph.as_bytes();
    let mut nodes = Vec::new();
    let mut search = 0;

    while let Some(found) = paragraph[search..].find("<w:t") {
        let start = search + found;
        let Some(tag_len) = paragraph[start..].find('>') else {
            break;
        };
        let open_end = start + tag_len + 1;
        let is_text = matches!(bytes.get(start + 4), Some(b'>' | b' '));
        if !is_text || bytes[open_end - 2] == b'/' {
            search = open_end;
            continue;
        }
        let Some(close) = paragraph[open_end..].find("</w:t>") else {
            break;
        };
        let content_end = open_end + close;
        let end = content_end + "</w:t>".len();
        nodes.push(TextNode { start, end, content_start: open_end, content_end });
        search = end;
    }

    nodes
}

fn rewrite_paragraph(
    paragraph: &str,
    replacements: &[(String, String)],
    image_key: &str,
    drawing: Option<&str>,
) -> (String, bool) {
    let nodes = text_nodes(paragraph);
    if nodes.is_empty() {
        return (paragraph.to_string(), false);
    }

    let original: Vec<String> = nodes
        .iter()
        .map(|node| unescape_xml(&paragraph[node.content_start..node.content_end]))
        .collect();
    let mut texts = original.clone();
    for (key, value) in replacements {
        replace_across(&mut texts, key, value);
    }
    let has_image = texts.concat().contains(image_key);
    if has_image {
        replace_across(&mut texts, image_key, "");
    }
    if texts == original {
        return (paragraph.to_string(), false);
    }

    let mut out = String::with_capacity(paragraph.len() + 64);
    let mut cursor = 0;
    for ((node, text), before) in nodes.iter().zip(&texts).zip(&original) {
        if text == before {
            continue;
        }
        out.push_str(&paragraph[cursor..node.start]);
        out.push_str(&text_element(text));
        cursor = node.end;
    }
    out.push_str(&paragraph[cursor..]);

    let mut drawn = false;
    if let (true, Some(run)) = (has_image, drawing) {
        if let Some(close) = out.rfind("</w:p>") {
            out.insert_str(close, run);
            drawn = true;
        }
    }

    (out, drawn)
}

/// Replaces every occurrence of `key` in the concatenation of `texts`, keeping the
/// replacement in the node where the key starts and trimming the nodes it spans.
fn replace_across(texts: &mut [String], key: &str, value: &str) {
    let mut from = 0;
    loop {
        let joined = texts.concat();
        let Some(found) = joined.get(from..).and_then(|rest| rest.find(key)) else {
            return;
        };
        let index = from + found;
        let key_end = index + key.len();

        let mut position = 0;
        let mut first = None;
        let mut last = None;
        for (node, text) in texts.iter().enumerate() {
            let len = text.len();
            if first.is_none() && index < position + len {
                first = Some((node, index - position));
            }
            if first.is_some() && key_end <= position + len {
                last = Some((node, key_end - position));
                break;
            }
            position += len;
        }
        let (Some((first, start_offset)), Some((last, end_offset))) = (first, last) else {
            return;
        };

        if first == last {
            texts[first].replace_range(start_offset..end_offset, value);
        } else {
            texts[first].truncate(start_offset);
            texts[first].push_str(value);
            for text in &mut texts[first + 1..last] {
                text.clear();
            }
            texts[last].replace_range(..end_offset, "");
        }

        from = index + value.len();
    }
}

/// One `<w:t>` per line, separated by line breaks.
fn text_element(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn insert_before(xml: &str, closing: &str, fragment: &str) -> String {
    match xml.rfind(closing) {
        Some(position) => {
            let mut out = String::with_capacity(xml.len() + fragment.len());
            out.push_str(&xml[..position]);
            out.push_str(fragment);
            out.push_str(&xml[position..]);
            out
        }
        None => xml.to_string(),
    }
}

fn add_relationship(rels: &str, image: &SignatureImage) -> String {
    if rels.contains(&format!("Id=\"{SIGNATURE_REL_ID}\"")) {
        return rels.to_string();
    }
    let relationship = format!(
        "<Relationship Id=\"{SIGNATURE_REL_ID}\" Type=\"{IMAGE_REL_TYPE}\" Target=\"media/{}\"/>",
        image.file_name()
    );
    insert_before(rels, "</Relationships>", &relationship)
}

fn ensure_default_content_type(types: &str, extension: &str, content_type: &str) -> String {
    if types.contains(&format!("Extension=\"{extension}\"")) {
        return types.to_string();
    }
    let default = format!("<Default Extension=\"{extension}\" ContentType=\"{content_type}\"/>");
    insert_before(types, "</Types>", &default)
}

struct SignatureImage {
    bytes: Vec<u8>,
    extension: &'static str,
    content_type: &'static str,
    width: u32,
    height: u32,
}

impl SignatureImage {
    /// Accepts plain base64 or a `data:image/...;base64,` URI.
    fn decode(encoded: &str) -> Result<Self, &'static str> {
        let payload = if encoded.starts_with("data:image") {
            encoded.split_once(',').map_or("", |(_, data)| data)
        } else {
            encoded
        };
        let payload: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
        let bytes = STANDARD.decode(payload).map_err(|_| "signature is not valid base64")?;

        let (extension, content_type, (width, height)) = if let Some(size) = png_dimensions(&bytes)
        {
            ("png", "image/png", size)
        } else if let Some(size) = jpeg_dimensions(&bytes) {
            ("jpeg", "image/jpeg", size)
        } else {
            return Err("signature must be a PNG or JPEG image");
        };
        if width == 0 || height == 0 {
            return Err("signature image has no size");
        }

        Ok(Self { bytes, extension, content_type, width, height })
    }

    fn file_name(&self) -> String {
        format!("invoice_signature.{}", self.extension)
    }

    fn entry_name(&self) -> String {
        format!("word/media/{}", self.file_name())
    }

    /// Width fixed at 1.5 cm, height following the image's aspect ratio.
    fn extent(&self) -> (u64, u64) {
        let cx = SIGNATURE_WIDTH_EMU;
        let cy = cx * u64::from(self.height) / u64::from(self.width);
        (cx, cy)
    }

    fn drawing_run(&self, doc_pr_id: usize) -> String {
        let (cx, cy) = self.extent();
        let name = self.file_name();
        format!(
            "<w:r><w:drawing>\
             <wp:inline xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
             <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
             <wp:docPr id=\"{doc_pr_id}\" name=\"Signature\"/>\
             <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
             <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:nvPicPr><pic:cNvPr id=\"0\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
             <pic:blipFill><a:blip xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" r:embed=\"{SIGNATURE_REL_ID}\"/>\
             <a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
             <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
             <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
             </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
        )
    }
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut position = 2;
    while position + 4 <= bytes.len() {
        if bytes[position] != 0xFF {
            return None;
        }
        let marker = bytes[position + 1];
        if marker == 0xFF {
            position += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            position += 2;
            continue;
        }

        let length = usize::from(u16::from_be_bytes([bytes[position + 2], bytes[position + 3]]));
        let start_of_frame = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if start_of_frame {
            let frame = bytes.get(position + 4..position + 9)?;
            let height = u16::from_be_bytes([frame[1], frame[2]]);
            let width = u16::from_be_bytes([frame[3], frame[4]]);
            return Some((u32::from(width), u32::from(height)));
        }
        if length < 2 {
            return None;
        }
        position += 2 + length;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Month;

    fn today() -> Date {
        Date::from_calendar_date(2025, Month::March, 4).unwrap()
    }

    fn read_entry(docx: &[u8], name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        Some(text)
    }

    fn template_with(body: &str) -> Vec<u8> {
        let document = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"w\"><w:body>{body}</w:body></w:document>"
        );
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        writer.start_file(CONTENT_TYPES_ENTRY, options).unwrap();
        writer.write_all(DEFAULT_CONTENT_TYPES.as_bytes()).unwrap();
        writer.start_file(DOCUMENT_ENTRY, options).unwrap();
        writer.write_all(document.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn school(name: &str) -> InvoiceSchool {
        InvoiceSchool { name: name.to_string(), address: "1 Main St".to_string(), student_count: 40 }
    }

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn sample_invoice_fills_every_placeholder() {
        let setting = json!({
            "fees": "25",
            "accountName": "Maths Association",
            "bsb": "123-456",
            "accountNumber": 987654,
            "address": "PO Box 1",
            "email": "office@example.org",
            "website": "example.org",
            "chairName": "Dr Chair",
            "chairTitle": "Chairperson"
        });
        let values = InvoiceValues::from_setting(&setting, None, today());

        let docx = render(&default_template().unwrap(), &values).unwrap();
        let document = read_entry(&docx, DOCUMENT_ENTRY).unwrap();

        assert!(!document.contains("{{"));
        assert!(document.contains("TAX INVOICE 2025"));
        assert!(document.contains("Date: 04 March 2025"));
        assert!(document.contains("Sample School Name"));
        assert!(document.contains(
            "Sample Address1</w:t><w:br/><w:t xml:space=\"preserve\">Address2"
        ));
        assert!(document.contains("Total due: $25"));
        assert!(document.contains("Account number: 987654"));
        assert!(document.contains("office@example.org"));
        assert_eq!(values.file_name(), "Sample School Name Invoice.docx");
    }

    #[test]
    fn total_fees_multiply_by_student_count() {
        let values =
            InvoiceValues::from_setting(&json!({"fees": 12}), Some(&school("Acme High")), today());
        let docx = render(&default_template().unwrap(), &values).unwrap();
        let document = read_entry(&docx, DOCUMENT_ENTRY).unwrap();

        assert!(document.contains("for 40 students"));
        assert!(document.contains("Total due: $480"));
        assert_eq!(values.file_name(), "Acme High Invoice.docx");
    }

    #[test]
    fn missing_fees_count_as_zero() {
        assert_eq!(fee_amount(None), 0);
        assert_eq!(fee_amount(Some(&json!("abc"))), 0);
        assert_eq!(fee_amount(Some(&json!(" 30 "))), 30);
        assert_eq!(fee_amount(Some(&json!(17.9))), 17);
    }

    #[test]
    fn text_and_table_values_stay_in_their_scope() {
        let template = template_with(
            "<w:p><w:r><w:t>{{ email }} / {{ school_name }}</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{ school_name }} / {{ email }}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        let values = InvoiceValues::from_setting(
            &json!({"email": "a@b.c"}),
            Some(&school("Acme High")),
            today(),
        );

        let document = read_entry(&render(&template, &values).unwrap(), DOCUMENT_ENTRY).unwrap();

        assert!(document.contains("{{ email }} / Acme High"));
        assert!(document.contains("{{ school_name }} / a@b.c"));
    }

    #[test]
    fn placeholders_split_across_runs_are_replaced() {
        let template = template_with(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Dear {{ sch</w:t></w:r>\
             <w:r><w:t>ool_na</w:t></w:r><w:r><w:t xml:space=\"preserve\">me }}, hello</w:t></w:r></w:p>",
        );
        let values = InvoiceValues::from_setting(&json!({}), Some(&school("Acme High")), today());

        let document = read_entry(&render(&template, &values).unwrap(), DOCUMENT_ENTRY).unwrap();

        assert!(document.contains(
            "<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">Dear Acme High</w:t></w:r>"
        ));
        assert!(document.contains("<w:t xml:space=\"preserve\">, hello</w:t>"));
        assert!(!document.contains("ool_na"));
    }

    #[test]
    fn values_are_xml_escaped() {
        let template = template_with("<w:p><w:r><w:t>{{ school_name }}</w:t></w:r></w:p>");
        let values =
            InvoiceValues::from_setting(&json!({}), Some(&school("A & B <High>")), today());

        let document = read_entry(&render(&template, &values).unwrap(), DOCUMENT_ENTRY).unwrap();

        assert!(document.contains("A &amp; B &lt;High&gt;"));
    }

    #[test]
    fn signature_is_embedded_at_fixed_width() {
        let png = STANDARD.encode(tiny_png(200, 100));
        let setting = json!({ "signature": format!("data:image/png;base64,{png}") });
        let values = InvoiceValues::from_setting(&setting, None, today());

        let docx = render(&default_template().unwrap(), &values).unwrap();
        let document = read_entry(&docx, DOCUMENT_ENTRY).unwrap();
        let rels = read_entry(&docx, DOCUMENT_RELS_ENTRY).unwrap();
        let types = read_entry(&docx, CONTENT_TYPES_ENTRY).unwrap();

        assert!(!document.contains("{{ signature }}"));
        assert!(document.contains("<wp:extent cx=\"540000\" cy=\"270000\"/>"));
        assert!(document.contains("r:embed=\"rIdInvoiceSignature\""));
        assert!(rels.contains("Target=\"media/invoice_signature.png\""));
        assert!(types.contains("<Default Extension=\"png\" ContentType=\"image/png\"/>"));

        let mut archive = ZipArchive::new(Cursor::new(docx.as_slice())).unwrap();
        assert!(archive.by_name("word/media/invoice_signature.png").is_ok());
    }

    #[test]
    fn invalid_signature_only_clears_the_placeholder() {
        let values =
            InvoiceValues::from_setting(&json!({"signature": "not-an-image"}), None, today());

        let docx = render(&default_template().unwrap(), &values).unwrap();
        let document = read_entry(&docx, DOCUMENT_ENTRY).unwrap();

        assert!(!document.contains("{{ signature }}"));
        assert!(!document.contains("<w:drawing>"));
        assert!(!read_entry(&docx, DOCUMENT_RELS_ENTRY).unwrap().contains(SIGNATURE_REL_ID));
    }

    #[test]
    fn jpeg_size_is_read_from_the_frame_header() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x64, 0x00, 0xC8, 0x03]);

        assert_eq!(jpeg_dimensions(&jpeg), Some((200, 100)));
        assert_eq!(jpeg_dimensions(&[0x00, 0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn template_without_document_is_rejected() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("readme.txt", FileOptions::default()).unwrap();
        writer.write_all(b"hello").unwrap();
        let template = writer.finish().unwrap().into_inner();
        let values = InvoiceValues::from_setting(&json!({}), None, today());

        assert!(matches!(render(&template, &values), Err(InvoiceError::MissingDocument)));
    }
}
