//! Test-only doubles for the embedding and generation capabilities.

use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::Embedder;
use crate::generation::Generator;
use crate::{RagError, Result};

enum EmbedBehavior {
    Keywords,
    Failing(String),
    /// Succeed for this many calls, then fail
    FailAfter(usize),
    /// Every other vector gets one extra dimension
    Ragged,
}

/// Bag-of-keywords embedder: component `i` counts occurrences of keyword `i`
/// in the lowercased text, plus a constant trailing component so no vector is
/// zero.
pub struct MockEmbedder {
    keywords: Vec<String>,
    behavior: EmbedBehavior,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            behavior: EmbedBehavior::Keywords,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            behavior: EmbedBehavior::Failing(message.to_string()),
            ..Self::new(&[])
        }
    }

    pub fn fail_after(keywords: &[&str], calls: usize) -> Self {
        Self {
            behavior: EmbedBehavior::FailAfter(calls),
            ..Self::new(keywords)
        }
    }

    pub fn ragged(keywords: &[&str]) -> Self {
        Self {
            behavior: EmbedBehavior::Ragged,
            ..Self::new(keywords)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|keyword| lowered.matches(keyword.as_str()).count() as f32)
            .collect();
        vector.push(0.5);
        vector
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            EmbedBehavior::Failing(message) => Err(RagError::Embedding(message.clone())),
            EmbedBehavior::FailAfter(limit) if call >= *limit => {
                Err(RagError::Embedding("mock embedder exhausted".into()))
            }
            EmbedBehavior::Ragged => Ok(texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let mut vector = self.vector(text);
                    if i % 2 == 1 {
                        vector.push(1.0);
                    }
                    vector
                })
                .collect()),
            EmbedBehavior::Keywords | EmbedBehavior::FailAfter(_) => {
                Ok(texts.iter().map(|text| self.vector(text)).collect())
            }
        }
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Generator that answers every prompt with a closure and records the prompts
pub struct MockGenerator {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(reply: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(RagError::Generation(message.clone())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

impl Generator for MockGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        (self.reply)(prompt)
    }
}

/// Minimal DOCX package with one `w:p` per paragraph
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            let escaped = p
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            format!(r#"<w:p><w:r><w:t xml:space="preserve">{escaped}</w:t></w:r></w:p>"#)
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::FileOptions::default())
        .expect("should start zip entry");
    writer
        .write_all(xml.as_bytes())
        .expect("should write document part");
    writer.finish().expect("should finish zip").into_inner()
}
