use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text_by_pages;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A single page of a document, with a 1-based page number
#[derive(Debug, Clone)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

/// A loaded document: an ordered sequence of pages, immutable after load
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    /// Load a document from a file path.
    ///
    /// PDF files are extracted page by page; plain text files become a
    /// single page. Any other format is rejected.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();

        // Detect MIME type
        let mime = from_path(path).first_or_octet_stream();
        let mime_type = mime.to_string();
        debug!("Detected MIME type: {}", mime_type);

        let pages = read_pages(path, &mime_type)?;

        Ok(Document {
            path: path.to_path_buf(),
            pages,
        })
    }

    /// True when no page carries any text
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.is_empty())
    }
}

/// Read page texts from a document based on its MIME type
fn read_pages(path: &Path, mime_type: &str) -> Result<Vec<Page>> {
    match mime_type {
        // Handle PDF documents
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let raw_pages = extract_text_by_pages(path).map_err(|e| {
                Error::Document(format!(
                    "failed to extract text from PDF {}: {}",
                    path.display(),
                    e
                ))
            })?;

            // PDF extraction can include excessive whitespace
            let pages: Vec<Page> = raw_pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page {
                    number: i + 1,
                    text: normalize_whitespace(&text),
                })
                .collect();

            if pages.iter().all(|p| p.text.is_empty()) {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        // Handle plain text documents as a single page
        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Document(format!("failed to read text file {}: {}", path.display(), e))
            })?;
            Ok(vec![Page {
                number: 1,
                text: normalize_whitespace(&content),
            }])
        }

        // Unsupported format
        _ => Err(Error::Document(format!(
            "unsupported document format: {}. Only text and PDF files are supported.",
            mime_type
        ))),
    }
}

/// Normalize whitespace in text (remove multiple consecutive spaces, newlines, etc.)
fn normalize_whitespace(text: &str) -> String {
    // Replace multiple spaces with a single space
    let result = text.replace('\r', "");

    // Replace multiple consecutive newlines with double newlines (paragraph separator)
    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                // Add at most two newlines (paragraph break)
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
            }

            // Don't add consecutive spaces
            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    // Handle trailing newlines
    if newline_count > 0 {
        if newline_count >= 2 {
            normalized.push_str("\n\n");
        } else {
            normalized.push('\n');
        }
    }

    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        let text = "This  has   multiple    spaces.\n\n\nAnd multiple newlines.\r\nAnd Windows line endings.";
        let expected =
            "This has multiple spaces.\n\nAnd multiple newlines.\nAnd Windows line endings.";
        assert_eq!(normalize_whitespace(text), expected);
    }

    #[test]
    fn test_text_file_becomes_single_page() {
        let path = std::env::temp_dir().join("rag_chat_doc_test.txt");
        fs::write(&path, "First paragraph.\n\nSecond paragraph.").unwrap();

        let document = Document::from_file(&path).unwrap();
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].number, 1);
        assert!(document.pages[0].text.contains("First paragraph."));
        assert!(!document.is_empty());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let result = read_pages(Path::new("image.png"), "image/png");
        assert!(matches!(result, Err(Error::Document(_))));
    }

    #[test]
    fn test_empty_text_file_is_empty_document() {
        let path = std::env::temp_dir().join("rag_chat_empty_test.txt");
        fs::write(&path, "   \n\n  ").unwrap();

        let document = Document::from_file(&path).unwrap();
        assert!(document.is_empty());

        fs::remove_file(&path).ok();
    }
}
