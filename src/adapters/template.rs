//! Word (.docx) 模板替換。
//!
//! `.docx` 是 zip 封裝的 XML。本文、頁首與頁尾中的 `{{KEY}}` 以段落為單位
//! 替換：Word 常把一個佔位符拆在多個 `<w:t>` 中，因此先串接整段文字再替換，
//! 結果寫回第一個 `<w:t>`（保留其格式），其餘清空。文字方塊內的段落與外層
//! 段落各自處理。

use crate::utils::error::{CoaError, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone)]
pub struct DocxTemplate {
    bytes: Vec<u8>,
}

impl DocxTemplate {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 產生替換後的文件內容
    pub fn render(&self, replacements: &BTreeMap<String, String>) -> Result<Vec<u8>> {
        let patterns = XmlPatterns::new()?;
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(|e| {
            CoaError::TemplateError {
                message: format!("not a valid .docx archive: {}", e),
            }
        })?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut replaced_paragraphs = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);

            if entry.is_dir() {
                writer.add_directory(name, options)?;
                continue;
            }

            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            if is_text_part(&name) {
                let xml = String::from_utf8(data).map_err(|e| CoaError::TemplateError {
                    message: format!("{} is not valid UTF-8: {}", name, e),
                })?;
                let (rendered, count) = patterns.replace_placeholders(&xml, replacements);
                replaced_paragraphs += count;
                data = rendered.into_bytes();
            }

            writer.start_file(name, options)?;
            writer.write_all(&data)?;
        }

        tracing::debug!("Replaced placeholders in {} paragraphs", replaced_paragraphs);
        Ok(writer.finish()?.into_inner())
    }
}

/// 需要做替換的部分：本文、頁首、頁尾
fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

struct XmlPatterns {
    markup: Regex,
    entity: Regex,
}

/// 一個 `<w:t>` 元素在原始 XML 中的位置
struct TextRun<'x> {
    range: Range<usize>,
    open_tag: &'x str,
    text: &'x str,
}

impl XmlPatterns {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CoaError::TemplateError {
                message: format!("invalid pattern: {}", e),
            })
        };

        Ok(Self {
            markup: compile(
                r"(?s)(?P<open><w:p(?:\s[^>]*)?>)|(?P<close></w:p>)|(?P<t_open><w:t(?:\s[^>]*)?>)(?P<text>.*?)</w:t>",
            )?,
            entity: compile(
                r"&(?:#(?P<dec>[0-9]+)|#[xX](?P<hex>[0-9a-fA-F]+)|(?P<name>lt|gt|quot|apos|amp));",
            )?,
        })
    }

    /// 回傳替換後的 XML 與被改寫的段落數。
    ///
    /// 段落可以巢狀（文字方塊內的段落位於外層段落的 run 之中），
    /// 每個 `<w:t>` 只屬於包住它的最內層段落。
    fn replace_placeholders(
        &self,
        xml: &str,
        replacements: &BTreeMap<String, String>,
    ) -> (String, usize) {
        let mut runs: Vec<TextRun<'_>> = Vec::new();
        let mut paragraphs: Vec<Vec<usize>> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        for caps in self.markup.captures_iter(xml) {
            if let Some(tag) = caps.name("open") {
                if !tag.as_str().ends_with("/>") {
                    open.push(paragraphs.len());
                    paragraphs.push(Vec::new());
                }
            } else if caps.name("close").is_some() {
                open.pop();
            } else if let (Some(whole), Some(open_tag), Some(text)) =
                (caps.get(0), caps.name("t_open"), caps.name("text"))
            {
                if let Some(&owner) = open.last() {
                    paragraphs[owner].push(runs.len());
                }
                runs.push(TextRun {
                    range: whole.range(),
                    open_tag: open_tag.as_str(),
                    text: text.as_str(),
                });
            }
        }

        let mut rewritten: Vec<Option<String>> = vec![None; runs.len()];
        let mut count = 0;
        for members in &paragraphs {
            let Some((&first, rest)) = members.split_first() else {
                continue;
            };
            let full_text: String = members.iter().map(|&i| self.unescape(runs[i].text)).collect();
            let replaced = substitute(&full_text, replacements);
            if replaced == full_text {
                continue;
            }

            count += 1;
            rewritten[first] = Some(format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape_xml(&replaced)
            ));
            for &i in rest {
                rewritten[i] = Some(format!("{}</w:t>", runs[i].open_tag));
            }
        }

        let mut output = String::with_capacity(xml.len());
        let mut cursor = 0;
        for (run, replacement) in runs.iter().zip(rewritten) {
            if let Some(replacement) = replacement {
                output.push_str(&xml[cursor..run.range.start]);
                output.push_str(&replacement);
                cursor = run.range.end;
            }
        }
        output.push_str(&xml[cursor..]);

        (output, count)
    }

    /// 解碼預先定義的實體與數字字元參照（`&#169;`、`&#x2013;`）
    fn unescape(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures| {
                let decoded = if let Some(dec) = caps.name("dec") {
                    dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
                } else if let Some(hex) = caps.name("hex") {
                    u32::from_str_radix(hex.as_str(), 16)
                        .ok()
                        .and_then(char::from_u32)
                } else {
                    match caps.name("name").map(|m| m.as_str()) {
                        Some("lt") => Some('<'),
                        Some("gt") => Some('>'),
                        Some("quot") => Some('"'),
                        Some("apos") => Some('\''),
                        Some("amp") => Some('&'),
                        _ => None,
                    }
                };
                decoded.map_or_else(|| caps[0].to_string(), String::from)
            })
            .into_owned()
    }
}

fn substitute(text: &str, replacements: &BTreeMap<String, String>) -> String {
    let mut replaced = text.to_string();
    for (key, value) in replacements {
        let token = format!("{{{{{}}}}}", key);
        if replaced.contains(&token) {
            replaced = replaced.replace(&token, value);
        }
    }
    replaced
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
