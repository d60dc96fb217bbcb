//! Language server front end: completion and hover for Hytale JSON files.
//!
//! Documents are synced in full. Every request reparses the current text, so
//! the server holds no derived state besides the loaded registry and catalog.
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::completion::{complete, Completion, CompletionKind};
use crate::items::ItemCatalog;
use crate::project::is_hytale_project;
use crate::registry::SchemaRegistry;

/// Document state tracked by the server
#[derive(Debug)]
pub struct Document {
    pub content: Rope,
    pub path: Option<PathBuf>,
}

impl Document {
    pub fn new(content: &str, uri: &Url) -> Self {
        Self {
            content: Rope::from_str(content),
            path: uri.to_file_path().ok(),
        }
    }

    /// The path used for category selection.
    fn category_path(&self, uri: &Url) -> String {
        match &self.path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => uri.path().to_owned(),
        }
    }
}

pub struct HytaleLanguageServer {
    client: Client,
    documents: DashMap<Url, Document>,
    registry: Arc<SchemaRegistry>,
    items: Arc<ItemCatalog>,
    /// Set at `initialize` when the workspace is a Hytale project.
    enabled: AtomicBool,
    capabilities: Arc<ServerCapabilities>,
}

impl HytaleLanguageServer {
    pub fn new(client: Client, registry: Arc<SchemaRegistry>, items: Arc<ItemCatalog>) -> Self {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec!["\"".to_string(), ":".to_string()]),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        Self {
            client,
            documents: DashMap::new(),
            registry,
            items,
            enabled: AtomicBool::new(false),
            capabilities: Arc::new(capabilities),
        }
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn get_completions(&self, uri: &Url, position: Position) -> Vec<CompletionItem> {
        let Some(doc) = self.documents.get(uri) else {
            return Vec::new();
        };
        let text = doc.content.to_string();
        let offset = position_to_offset(&doc.content, position);
        let path = doc.category_path(uri);

        complete(&self.registry, Some(&self.items), &path, &text, offset)
            .into_iter()
            .map(|c| to_completion_item(c, &doc.content))
            .collect()
    }

    fn get_hover(&self, uri: &Url, position: Position) -> Option<Hover> {
        let doc = self.documents.get(uri)?;
        let text = doc.content.to_string();
        let offset = position_to_offset(&doc.content, position);
        let (markdown, range) = self.items.hover(&text, offset)?;

        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: markdown,
            }),
            range: Some(Range::new(
                offset_to_position(&doc.content, range.start),
                offset_to_position(&doc.content, range.end),
            )),
        })
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for HytaleLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = workspace_root(&params);
        let enabled = detect_project(root.clone()).await;
        self.enabled.store(enabled, Ordering::Relaxed);
        info!(root = ?root, enabled, "initialize");

        Ok(InitializeResult {
            capabilities: (*self.capabilities).clone(),
            server_info: Some(ServerInfo {
                name: "hytale-assist".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let message = if self.enabled() {
            format!("Hytale project detected; {} schema categories loaded", self.registry.len())
        } else {
            "No Hytale project detected; assistance disabled".to_string()
        };
        self.client.log_message(MessageType::INFO, message).await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let doc = Document::new(&params.text_document.text, &uri);
        self.documents.insert(uri, doc);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.last() {
            if let Some(mut doc) = self.documents.get_mut(&uri) {
                doc.content = Rope::from_str(&change.text);
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        if !self.enabled() {
            return Ok(None);
        }
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.get_hover(&uri, position))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        if !self.enabled() {
            return Ok(None);
        }
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let items = self.get_completions(&uri, position);
        debug!(%uri, count = items.len(), "completion");
        Ok(Some(CompletionResponse::Array(items)))
    }
}

/// Project detection walks the workspace, so it runs off the async executor.
async fn detect_project(root: Option<PathBuf>) -> bool {
    let detection = tokio::task::spawn_blocking(move || is_hytale_project(root.as_deref()));
    match detection.await {
        Ok(enabled) => enabled,
        Err(error) => {
            warn!(%error, "project detection failed");
            false
        }
    }
}

#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(|uri| uri.to_file_path().ok())
}

fn to_completion_item(completion: Completion, rope: &Rope) -> CompletionItem {
    let kind = match completion.kind {
        CompletionKind::Value => CompletionItemKind::VALUE,
        CompletionKind::Property => CompletionItemKind::PROPERTY,
        CompletionKind::Item => CompletionItemKind::CONSTANT,
    };
    let text_edit = completion.replace.map(|range| {
        CompletionTextEdit::Edit(TextEdit::new(
            Range::new(
                offset_to_position(rope, range.start),
                offset_to_position(rope, range.end),
            ),
            completion.insert_text.clone(),
        ))
    });

    CompletionItem {
        label: completion.label,
        kind: Some(kind),
        detail: completion.detail,
        documentation: completion.documentation.map(|value| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            })
        }),
        filter_text: completion.filter_text,
        sort_text: Some(completion.sort_text),
        insert_text: Some(completion.insert_text),
        text_edit,
        ..Default::default()
    }
}

/// LSP position (UTF-16 column) → byte offset, clamped to the document.
pub fn position_to_offset(rope: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return rope.len_bytes();
    }
    let line_start = rope.line_to_char(line);
    let slice = rope.line(line);
    let mut line_len = slice.len_chars();
    while line_len > 0 && matches!(slice.char(line_len - 1), '\n' | '\r') {
        line_len -= 1;
    }
    let line_end = line_start + line_len;
    let start_cu = rope.char_to_utf16_cu(line_start);
    let end_cu = rope.char_to_utf16_cu(line_end);
    let target_cu = (start_cu + position.character as usize).min(end_cu);
    rope.char_to_byte(rope.utf16_cu_to_char(target_cu))
}

/// Byte offset → LSP position (UTF-16 column).
pub fn offset_to_position(rope: &Rope, offset: usize) -> Position {
    let char_idx = rope.byte_to_char(offset.min(rope.len_bytes()));
    let line = rope.char_to_line(char_idx);
    let line_start = rope.line_to_char(line);
    let character = rope.char_to_utf16_cu(char_idx) - rope.char_to_utf16_cu(line_start);
    Position::new(line as u32, character as u32)
}

/// Serve over stdio until the client disconnects.
pub async fn run_server(registry: SchemaRegistry, items: ItemCatalog) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let registry = Arc::new(registry);
    let items = Arc::new(items);

    let (service, socket) = tower_lsp::LspService::new(move |client| {
        HytaleLanguageServer::new(client, registry, items)
    });
    tower_lsp::Server::new(stdin, stdout, socket)
        .serve(service)
        .await;
}
