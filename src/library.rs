//! The upload directory and everything derived from it.
//!
//! Uploaded files are copied into `documents.upload_dir` and re-read on
//! demand, so the directory itself is the source of truth. The semantic
//! chunk index lives beside them as `.index.json`.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::{DocumentsConfig, EmbeddingConfig};
use crate::embedding::{embed_batched, EmbeddingProvider};
use crate::extract::{extract_bytes, extract_file, is_supported};
use crate::index::ChunkIndex;
use crate::models::UploadedDocument;

const INDEX_FILE: &str = ".index.json";

pub struct DocumentLibrary {
    config: DocumentsConfig,
    include: GlobSet,
}

impl DocumentLibrary {
    /// Open (and create if needed) the upload directory.
    pub fn open(config: &DocumentsConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.upload_dir).with_context(|| {
            format!(
                "Failed to create upload directory: {}",
                config.upload_dir.display()
            )
        })?;
        Ok(Self {
            config: config.clone(),
            include: build_globset(&config.include_globs)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.config.upload_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.upload_dir.join(INDEX_FILE)
    }

    /// Copy `source` into the upload directory and extract its text.
    ///
    /// An existing upload with the same file name is replaced.
    pub fn upload(&self, source: &Path) -> Result<UploadedDocument> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Not a file: {}", source.display()))?;
        let bytes = std::fs::read(source)
            .with_context(|| format!("Failed to read {}", source.display()))?;
        self.store(&name, &bytes)
    }

    /// Save raw bytes under `name` and extract the text.
    pub fn store(&self, name: &str, bytes: &[u8]) -> Result<UploadedDocument> {
        let name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid document name: {}", name))?;
        let path = self.config.upload_dir.join(&name);
        if !is_supported(&path) {
            bail!("Unsupported file type: {} (expected .txt, .md, or .pdf)", name);
        }

        // Nothing lands in the upload directory unless it extracts.
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let text = extract_bytes(bytes, &ext)
            .with_context(|| format!("Failed to extract text from {}", name))?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to save {}", path.display()))?;

        tracing::info!(document = %name, chars = text.chars().count(), "document uploaded");
        Ok(UploadedDocument { name, path, text })
    }

    /// Every readable document in the upload directory, sorted by name.
    ///
    /// Files that fail to extract are skipped with a warning.
    pub fn documents(&self) -> Result<Vec<UploadedDocument>> {
        let root = &self.config.upload_dir;
        let mut docs = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if rel_str.starts_with('.') || !self.include.is_match(&rel_str) {
                continue;
            }

            match extract_file(path) {
                Ok(text) => docs.push(UploadedDocument {
                    name: rel_str,
                    path: path.to_path_buf(),
                    text,
                }),
                Err(e) => tracing::warn!(file = %rel_str, error = %e, "skipping document"),
            }
        }

        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }

    /// Find a document by exact name, falling back to a case-insensitive match.
    pub fn find(&self, name: &str) -> Result<Option<UploadedDocument>> {
        let docs = self.documents()?;
        if let Some(doc) = docs.iter().find(|d| d.name == name) {
            return Ok(Some(doc.clone()));
        }
        let lower = name.to_lowercase();
        Ok(docs.into_iter().find(|d| d.name.to_lowercase() == lower))
    }

    /// Load the persisted chunk index (empty if never built).
    pub fn load_index(&self) -> Result<ChunkIndex> {
        ChunkIndex::load(&self.index_path())
    }

    /// Chunk and embed every document, reusing vectors for chunks whose
    /// text hash is unchanged, then persist the index.
    pub async fn build_index(
        &self,
        provider: &dyn EmbeddingProvider,
        embedding: &EmbeddingConfig,
    ) -> Result<ChunkIndex> {
        let previous = self.load_index().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable chunk index");
            ChunkIndex::default()
        });
        let reusable = if previous.model == provider.model_name() {
            previous.vectors_by_hash()
        } else {
            Default::default()
        };

        let mut chunks = Vec::new();
        for doc in self.documents()? {
            chunks.extend(chunk_text(
                &doc.name,
                &doc.text,
                self.config.chunk_size,
                self.config.chunk_overlap,
            ));
        }

        let pending: Vec<String> = chunks
            .iter()
            .filter(|c| !reusable.contains_key(c.hash.as_str()))
            .map(|c| c.text.clone())
            .collect();
        let mut fresh = embed_batched(
            provider,
            &pending,
            embedding.batch_size,
            embedding.max_retries,
        )
        .await?
        .into_iter();

        let mut index = ChunkIndex::new(provider.model_name(), provider.dims());
        let reused = chunks.len() - pending.len();
        for chunk in chunks {
            let vector = match reusable.get(chunk.hash.as_str()) {
                Some(v) => v.to_vec(),
                None => fresh
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing embedding for chunk {}", chunk.id))?,
            };
            index.insert(chunk, vector);
        }

        index.save(&self.index_path())?;
        tracing::info!(
            chunks = index.len(),
            embedded = pending.len(),
            reused,
            "chunk index rebuilt"
        );
        Ok(index)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
