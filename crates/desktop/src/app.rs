//! UniChat Desktop — egui app state and UI.

use eframe::egui;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

use lib::api::{AskResponse, DocumentsResponse, ModelCatalogResponse, StatusReply};
use lib::catalog::ProviderCatalog;
use lib::modal::{ConfigModalState, EditableGroup, ModalPhase};
use lib::snapshot::{KnowledgeBase, ModelSelection};

const CHAT_INPUT_HEIGHT: f32 = 130.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;

/// Frames between pending-change polls while the settings modal is open (~0.5 Hz at 60 fps).
const SUSPENSE_INTERVAL_FRAMES: u32 = 120;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{} [{}] {}", clock_lite(), record.level(), record.args());
        push_log_line(line);
    }

    fn flush(&self) {}
}

fn clock_lite() -> String {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = t.as_secs();
    let millis = t.subsec_millis();
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, millis)
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum SettingsTab {
    #[default]
    Model,
    Knowledge,
}

#[derive(Clone)]
struct ChatMessage {
    role: String,
    content: String,
    /// Optional reasoning section from the backend (`think` in the /ask reply).
    think: Option<String>,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: text.into(),
            think: None,
        }
    }

    fn assistant(text: impl Into<String>, think: Option<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: text.into(),
            think,
        }
    }
}

/// Everything the settings modal needs when it opens, fetched in one worker.
struct SettingsFetch {
    models: ModelCatalogResponse,
    documents: DocumentsResponse,
    suspense: bool,
}

/// A model save in flight: the request generation and the payload that was sent.
struct PendingModelSave {
    generation: u64,
    sent: ModelSelection,
    receiver: mpsc::Receiver<Result<StatusReply, String>>,
}

/// A knowledge-base upload in flight.
struct PendingKnowledgeSave {
    generation: u64,
    sent: KnowledgeBase,
    receiver: mpsc::Receiver<Result<(), String>>,
}

/// Load config and build an API client; called inside worker threads so the
/// UI always talks to the currently configured backend.
fn api_client() -> Result<lib::api::ApiClient, String> {
    let (config, _) = lib::config::load_config(None).map_err(|e| e.to_string())?;
    lib::api::ApiClient::from_config(&config).map_err(|e| e.to_string())
}

fn fetch_settings() -> Result<SettingsFetch, String> {
    let client = api_client()?;
    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    rt.block_on(async move {
        let models = client.fetch_models().await.map_err(|e| e.to_string())?;
        let documents = client.fetch_documents().await.map_err(|e| e.to_string())?;
        let suspense = client.fetch_suspense().await.map_err(|e| e.to_string())?;
        Ok(SettingsFetch {
            models,
            documents,
            suspense,
        })
    })
}

pub struct UnichatApp {
    /// Session id sent with every /ask call; regenerated by /new.
    session_id: String,
    /// In-memory chat transcript for the current session.
    chat_messages: Vec<ChatMessage>,
    /// Current input text for the chat box.
    chat_input: String,
    /// Last error from a chat turn, if any.
    chat_error: Option<String>,
    /// When Some, a chat turn is in flight; we read the result here.
    chat_turn_receiver: Option<mpsc::Receiver<Result<AskResponse, String>>>,

    /// Settings modal state: snapshots, dirtiness, phase, busy flags.
    modal: ConfigModalState,
    /// Provider/model lookup from the last successful catalog fetch.
    catalog: ProviderCatalog,
    /// Which settings tab is showing.
    settings_tab: SettingsTab,
    /// Selected row in the document table, if any.
    selected_document: Option<String>,
    /// When Some, the open-modal fetch is in flight.
    settings_fetch_receiver: Option<mpsc::Receiver<Result<SettingsFetch, String>>>,
    /// When Some, a model-selection save is in flight.
    model_save: Option<PendingModelSave>,
    /// When Some, a knowledge-base upload is in flight.
    knowledge_save: Option<PendingKnowledgeSave>,
    /// When Some, a config-apply call is in flight.
    apply_receiver: Option<mpsc::Receiver<Result<bool, String>>>,
    /// When Some, a pending-change poll is in flight.
    suspense_receiver: Option<mpsc::Receiver<Result<bool, String>>>,
    /// Frames since we last polled the pending-change flag.
    frames_since_suspense: u32,
    /// Last error shown inside the settings modal.
    settings_error: Option<String>,
    /// Last success message shown inside the settings modal.
    settings_notice: Option<String>,

    /// Current screen (Chat, Logs).
    current_screen: Screen,
}

impl UnichatApp {
    /// Space between the screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 48.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let session_id = lib::config::load_config(None)
            .map(|(config, _)| lib::config::resolve_session_id(&config))
            .unwrap_or_else(|_| "sess-local".to_string());

        Self {
            session_id,
            chat_messages: Vec::new(),
            chat_input: String::new(),
            chat_error: None,
            chat_turn_receiver: None,
            modal: ConfigModalState::default(),
            catalog: ProviderCatalog::default(),
            settings_tab: SettingsTab::default(),
            selected_document: None,
            settings_fetch_receiver: None,
            model_save: None,
            knowledge_save: None,
            apply_receiver: None,
            suspense_receiver: None,
            frames_since_suspense: 0,
            settings_error: None,
            settings_notice: None,
            current_screen: Screen::default(),
        }
    }

    fn start_new_session(&mut self) {
        self.session_id = lib::config::load_config(None)
            .map(|(config, _)| lib::config::resolve_session_id(&config))
            .unwrap_or_else(|_| "sess-local".to_string());
        self.chat_messages.clear();
        self.chat_error = None;
        self.chat_messages.push(ChatMessage::assistant(
            "Session restarted. Next message will start with a clean history.".to_string(),
            None,
        ));
        log::info!("started chat session {}", self.session_id);
    }

    /// Start a chat turn in a background thread if possible.
    fn start_chat_turn(&mut self) {
        if self.chat_turn_receiver.is_some() {
            return;
        }
        let message = self.chat_input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.chat_error = None;
        self.chat_input.clear();

        // Handle special commands
        if message.eq_ignore_ascii_case("/new") {
            self.start_new_session();
            return;
        }
        if message.eq_ignore_ascii_case("/help") {
            self.chat_messages.push(ChatMessage::assistant(
                "available commands:\n\n/new - start a new session (clear conversation history)\n/help - show this help message".to_string(),
                None,
            ));
            return;
        }

        self.chat_messages.push(ChatMessage::user(message.clone()));

        let session_id = self.session_id.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = (|| {
                let client = api_client()?;
                let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
                rt.block_on(async move {
                    client
                        .ask(message, session_id)
                        .await
                        .map_err(|e| e.to_string())
                })
            })();
            let _ = tx.send(result);
        });
        self.chat_turn_receiver = Some(rx);
    }

    /// Poll for chat turn result and clear receiver when done. Call each frame.
    fn poll_chat_turn(&mut self) {
        if let Some(rx) = &self.chat_turn_receiver {
            if let Ok(result) = rx.try_recv() {
                self.chat_turn_receiver = None;
                match result {
                    Ok(reply) => {
                        let think = reply.think.filter(|t| !t.trim().is_empty());
                        self.chat_messages
                            .push(ChatMessage::assistant(reply.answer, think));
                    }
                    Err(e) => {
                        self.chat_error = Some(e);
                    }
                }
            }
        }
    }

    /// Open the settings modal and kick off the state fetch.
    fn open_settings(&mut self) {
        if self.modal.is_open() {
            return;
        }
        self.modal.open();
        self.settings_tab = SettingsTab::Model;
        self.selected_document = None;
        self.settings_error = None;
        self.settings_notice = None;
        self.frames_since_suspense = 0;
        self.start_settings_fetch();
    }

    fn start_settings_fetch(&mut self) {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = fetch_settings();
            let _ = tx.send(result);
        });
        self.settings_fetch_receiver = Some(rx);
    }

    /// Poll for the open-modal fetch; installs catalog and baselines.
    fn poll_settings_fetch(&mut self) {
        if let Some(rx) = &self.settings_fetch_receiver {
            if let Ok(result) = rx.try_recv() {
                self.settings_fetch_receiver = None;
                match result {
                    Ok(fetch) => {
                        self.catalog = ProviderCatalog::from_support(&fetch.models.model_support);
                        self.modal.install_model_baseline(fetch.models.model_select);
                        self.modal.install_knowledge_baseline(KnowledgeBase::new(
                            fetch.documents.system_prompt,
                            fetch.documents.documents,
                        ));
                        self.modal.set_pending_change(fetch.suspense);
                    }
                    Err(e) => {
                        log::warn!("settings fetch failed: {}", e);
                        self.settings_error = Some(format!("failed to load configuration: {}", e));
                    }
                }
            }
        }
    }

    fn start_model_save(&mut self) {
        let Some(generation) = self.modal.begin_save(EditableGroup::ModelSelection) else {
            return;
        };
        self.settings_error = None;
        self.settings_notice = None;
        let sent = self.modal.model().clone();
        let payload = sent.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = (|| {
                let client = api_client()?;
                let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
                rt.block_on(async move {
                    client.save_models(&payload).await.map_err(|e| e.to_string())
                })
            })();
            let _ = tx.send(result);
        });
        self.model_save = Some(PendingModelSave {
            generation,
            sent,
            receiver: rx,
        });
    }

    fn poll_model_save(&mut self) {
        let Some(pending) = &self.model_save else { return };
        let Ok(result) = pending.receiver.try_recv() else {
            return;
        };
        let generation = pending.generation;
        let sent = pending.sent.clone();
        self.model_save = None;
        match result {
            Ok(reply) if reply.status_ok => {
                self.modal.finish_model_save(generation, Some(sent));
                self.settings_notice = Some(if reply.message.is_empty() {
                    "model configuration saved".to_string()
                } else {
                    reply.message
                });
            }
            Ok(reply) => {
                self.modal.finish_model_save(generation, None);
                self.settings_error = Some(if reply.message.is_empty() {
                    "server rejected the model configuration".to_string()
                } else {
                    reply.message
                });
            }
            Err(e) => {
                self.modal.finish_model_save(generation, None);
                self.settings_error = Some(format!("failed to save model configuration: {}", e));
            }
        }
    }

    fn start_knowledge_save(&mut self) {
        let Some(generation) = self.modal.begin_save(EditableGroup::KnowledgeBase) else {
            return;
        };
        self.settings_error = None;
        self.settings_notice = None;
        let sent = self.modal.knowledge().clone();
        let knowledge = sent.clone();
        let blobs = self.modal.blobs().clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = (|| {
                let client = api_client()?;
                let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
                rt.block_on(async move {
                    client
                        .upload_documents(&knowledge, &blobs)
                        .await
                        .map_err(|e| e.to_string())
                })
            })();
            let _ = tx.send(result);
        });
        self.knowledge_save = Some(PendingKnowledgeSave {
            generation,
            sent,
            receiver: rx,
        });
    }

    fn poll_knowledge_save(&mut self) {
        let Some(pending) = &self.knowledge_save else { return };
        let Ok(result) = pending.receiver.try_recv() else {
            return;
        };
        let generation = pending.generation;
        let sent = pending.sent.clone();
        self.knowledge_save = None;
        match result {
            Ok(()) => {
                self.modal.finish_knowledge_save(generation, Some(sent));
                self.settings_notice =
                    Some("documents and system prompt saved".to_string());
            }
            Err(e) => {
                self.modal.finish_knowledge_save(generation, None);
                self.settings_error = Some(format!("failed to save knowledge base: {}", e));
            }
        }
    }

    fn start_apply(&mut self) {
        if !self.modal.begin_apply() {
            return;
        }
        self.settings_error = None;
        self.settings_notice = None;
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = (|| {
                let client = api_client()?;
                let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
                rt.block_on(async move { client.apply_config().await.map_err(|e| e.to_string()) })
            })();
            let _ = tx.send(result);
        });
        self.apply_receiver = Some(rx);
    }

    fn poll_apply(&mut self) {
        if let Some(rx) = &self.apply_receiver {
            if let Ok(result) = rx.try_recv() {
                self.apply_receiver = None;
                match result {
                    Ok(true) => {
                        self.modal.finish_apply(true);
                        self.settings_notice = Some("configuration applied".to_string());
                    }
                    Ok(false) => {
                        self.modal.finish_apply(false);
                        self.settings_error =
                            Some("server refused to apply the configuration".to_string());
                    }
                    Err(e) => {
                        self.modal.finish_apply(false);
                        self.settings_error = Some(format!("apply failed: {}", e));
                    }
                }
            }
        }
    }

    /// Poll the pending-change flag on an interval while the modal is open.
    fn poll_suspense(&mut self) {
        if let Some(rx) = &self.suspense_receiver {
            if let Ok(result) = rx.try_recv() {
                match result {
                    Ok(pending) => self.modal.set_pending_change(pending),
                    Err(e) => log::warn!("pending-change poll failed: {}", e),
                }
                self.suspense_receiver = None;
            }
        }
        if !self.modal.is_open()
            || self.suspense_receiver.is_some()
            || self.settings_fetch_receiver.is_some()
        {
            return;
        }
        self.frames_since_suspense = self.frames_since_suspense.saturating_add(1);
        if self.frames_since_suspense >= SUSPENSE_INTERVAL_FRAMES {
            self.frames_since_suspense = 0;
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let result = (|| {
                    let client = api_client()?;
                    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
                    rt.block_on(async move {
                        client.fetch_suspense().await.map_err(|e| e.to_string())
                    })
                })();
                let _ = tx.send(result);
            });
            self.suspense_receiver = Some(rx);
        }
    }

    /// Renders a single chat message (frame, role-based fill, optional reasoning).
    fn render_chat_message(ui: &mut egui::Ui, m: &ChatMessage) {
        let is_user = m.role == "user";
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&m.content).strong());
            } else {
                if let Some(ref think) = m.think {
                    egui::CollapsingHeader::new("💭 reasoning")
                        .default_open(false)
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(think.as_str())
                                    .family(egui::FontFamily::Monospace)
                                    .weak(),
                            );
                        });
                    ui.add_space(4.0);
                }
                ui.label(&m.content);
            }
        });
    }

    /// Render the chat UI (messages + input). Messages area fills the space
    /// with stick-to-bottom; input and controls are fixed at the bottom.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let can_send = self.chat_turn_receiver.is_none();

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section_height =
            CHAT_INPUT_HEIGHT + 8.0 + row_height + Self::SCREEN_FOOTER_SPACING;
        let available = ui.available_height();
        let messages_height = (available - bottom_section_height).max(CHAT_MESSAGES_MIN_HEIGHT);

        let messages_width = ui.available_width();
        let messages_rect = ui
            .allocate_exact_size(
                egui::vec2(messages_width, messages_height),
                egui::Sense::hover(),
            )
            .0;
        let mut messages_ui =
            ui.child_ui(messages_rect, egui::Layout::top_down(egui::Align::Min));
        let messages_to_show = self.chat_messages.clone();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(&mut messages_ui, |ui| {
                // Force scroll content to viewport width so the scrollbar stays on the right
                let content_width = ui.available_width();
                ui.allocate_exact_size(egui::vec2(content_width, 0.0), egui::Sense::hover());
                for m in &messages_to_show {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
                if messages_to_show.is_empty() {
                    ui.label("Ask a question to get started. /help lists commands.");
                }
            });

        ui.add_space(8.0);

        let text_response = ui.add_enabled_ui(can_send, |ui| {
            ui.add_sized(
                [ui.available_width(), CHAT_INPUT_HEIGHT],
                egui::TextEdit::multiline(&mut self.chat_input),
            )
        });
        let response = text_response.inner;
        ui.add_space(8.0);

        let row_width = ui.available_width();
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(row_width, row_height), egui::Sense::hover());
        let mut row_ui = ui.child_ui(rect, egui::Layout::right_to_left(egui::Align::Center));
        egui::Frame::none()
            .inner_margin(egui::Margin {
                left: 0.0,
                right: 8.0,
                top: 4.0,
                bottom: 4.0,
            })
            .show(&mut row_ui, |ui| {
                let mut send_now = false;

                let send_label = if can_send { "Send" } else { "Waiting…" };
                let send_button = ui.add_enabled(can_send, egui::Button::new(send_label));

                ui.add_space(8.0);
                if ui.add_enabled(can_send, egui::Button::new("/new")).clicked() {
                    self.start_new_session();
                }

                if send_button.clicked() {
                    send_now = true;
                }
                if can_send && response.has_focus() {
                    let modifiers = ui.input(|i| i.modifiers);
                    if (modifiers.command || modifiers.ctrl)
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    {
                        send_now = true;
                    }
                }
                if send_now {
                    self.start_chat_turn();
                }
            });

        if let Some(ref err) = self.chat_error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    /// Model tab: dependent provider/model dropdowns and provider intro.
    fn ui_model_tab(&mut self, ui: &mut egui::Ui) {
        if self.catalog.is_empty() {
            ui.label("No providers available. Is the backend running?");
            return;
        }

        let providers: Vec<String> = self.catalog.providers().to_vec();
        let current = self.modal.model().clone();
        let llm_models: Vec<String> = self.catalog.llm_models_for(&current.llm_provider).to_vec();
        let emb_models: Vec<String> = self.catalog.emb_models_for(&current.emb_provider).to_vec();

        let mut pick_llm_provider: Option<String> = None;
        let mut pick_llm_model: Option<String> = None;
        let mut pick_emb_provider: Option<String> = None;
        let mut pick_emb_model: Option<String> = None;

        egui::Grid::new("model_tab_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("LLM provider");
                egui::ComboBox::from_id_source("llm_provider")
                    .selected_text(display_or_dash(&current.llm_provider))
                    .show_ui(ui, |ui| {
                        for p in &providers {
                            if ui
                                .selectable_label(current.llm_provider == *p, p)
                                .clicked()
                            {
                                pick_llm_provider = Some(p.clone());
                            }
                        }
                    });
                ui.end_row();

                ui.label("LLM model");
                egui::ComboBox::from_id_source("llm_model")
                    .selected_text(display_or_dash(&current.llm_model))
                    .show_ui(ui, |ui| {
                        for m in &llm_models {
                            if ui.selectable_label(current.llm_model == *m, m).clicked() {
                                pick_llm_model = Some(m.clone());
                            }
                        }
                    });
                ui.end_row();

                ui.label("Embedding provider");
                egui::ComboBox::from_id_source("emb_provider")
                    .selected_text(display_or_dash(&current.emb_provider))
                    .show_ui(ui, |ui| {
                        for p in &providers {
                            if ui
                                .selectable_label(current.emb_provider == *p, p)
                                .clicked()
                            {
                                pick_emb_provider = Some(p.clone());
                            }
                        }
                    });
                ui.end_row();

                ui.label("Embedding model");
                egui::ComboBox::from_id_source("emb_model")
                    .selected_text(display_or_dash(&current.emb_model))
                    .show_ui(ui, |ui| {
                        for m in &emb_models {
                            if ui.selectable_label(current.emb_model == *m, m).clicked() {
                                pick_emb_model = Some(m.clone());
                            }
                        }
                    });
                ui.end_row();
            });

        // Provider changes go through the catalog so the dependent model
        // never points outside the new provider's list.
        if let Some(p) = pick_llm_provider {
            self.modal.set_llm_provider(&self.catalog, &p);
        }
        if let Some(m) = pick_llm_model {
            self.modal.model_mut().llm_model = m;
        }
        if let Some(p) = pick_emb_provider {
            self.modal.set_emb_provider(&self.catalog, &p);
        }
        if let Some(m) = pick_emb_model {
            self.modal.model_mut().emb_model = m;
        }

        ui.add_space(8.0);
        let intro_provider = self.modal.model().llm_provider.clone();
        egui::Frame::none()
            .fill(ui.style().visuals.extreme_bg_color)
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(egui::Margin::same(8.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(egui::RichText::new(self.catalog.intro_for(&intro_provider)).weak());
            });

        ui.add_space(12.0);
        let saving = self.modal.save_in_flight(EditableGroup::ModelSelection);
        let save_label = if saving { "Saving…" } else { "Save" };
        if ui
            .add_enabled(
                self.modal.save_enabled(EditableGroup::ModelSelection),
                egui::Button::new(save_label),
            )
            .clicked()
        {
            self.start_model_save();
        }
    }

    /// Knowledge tab: document table, add/delete, system prompt editor.
    fn ui_knowledge_tab(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Documents").strong());
        ui.add_space(4.0);

        let documents = self.modal.knowledge().documents.clone();
        egui::Frame::none()
            .fill(ui.style().visuals.extreme_bg_color)
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(egui::Margin::same(8.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                egui::ScrollArea::vertical()
                    .id_source("document_table_scroll")
                    .max_height(140.0)
                    .show(ui, |ui| {
                        if documents.is_empty() {
                            // Placeholder row, matching the empty server state.
                            ui.label(egui::RichText::new("No documents yet.").weak());
                        }
                        for name in &documents {
                            let is_selected = self.selected_document.as_deref() == Some(name);
                            if ui.selectable_label(is_selected, name).clicked() {
                                self.selected_document = if is_selected {
                                    None
                                } else {
                                    Some(name.clone())
                                };
                            }
                        }
                    });
            });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Add document…").clicked() {
                self.pick_documents();
            }
            let can_delete = self
                .selected_document
                .as_deref()
                .map(|sel| documents.iter().any(|d| d == sel))
                .unwrap_or(false);
            if ui
                .add_enabled(can_delete, egui::Button::new("Delete selected"))
                .clicked()
            {
                if let Some(name) = self.selected_document.take() {
                    self.modal.remove_document(&name);
                }
            }
        });

        ui.add_space(12.0);
        ui.label(egui::RichText::new("System prompt").strong());
        ui.add_space(4.0);
        ui.add_sized(
            [ui.available_width(), 100.0],
            egui::TextEdit::multiline(&mut self.modal.knowledge_mut().system_prompt),
        );

        ui.add_space(12.0);
        let saving = self.modal.save_in_flight(EditableGroup::KnowledgeBase);
        let save_label = if saving { "Saving…" } else { "Save" };
        if ui
            .add_enabled(
                self.modal.save_enabled(EditableGroup::KnowledgeBase),
                egui::Button::new(save_label),
            )
            .clicked()
        {
            self.start_knowledge_save();
        }
    }

    /// Open the native file picker and stage the chosen files for upload.
    fn pick_documents(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .set_title("Add documents to the knowledge base")
            .pick_files()
        else {
            return;
        };
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            match std::fs::read(&path) {
                Ok(bytes) => {
                    self.modal.add_document(name, bytes);
                }
                Err(e) => {
                    log::warn!("failed to read {}: {}", path.display(), e);
                    self.settings_error = Some(format!("failed to read {}: {}", name, e));
                }
            }
        }
    }

    /// The settings modal window plus the discard confirmation on top of it.
    fn ui_settings_modal(&mut self, ctx: &egui::Context) {
        if !self.modal.is_open() {
            return;
        }

        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .default_width(540.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(self.settings_tab == SettingsTab::Model, "Model")
                        .clicked()
                    {
                        self.settings_tab = SettingsTab::Model;
                    }
                    if ui
                        .selectable_label(
                            self.settings_tab == SettingsTab::Knowledge,
                            "Knowledge base",
                        )
                        .clicked()
                    {
                        self.settings_tab = SettingsTab::Knowledge;
                    }
                });
                ui.separator();

                if self.settings_fetch_receiver.is_some() {
                    ui.add_space(16.0);
                    ui.label("(loading configuration)");
                    ui.add_space(16.0);
                } else {
                    match self.settings_tab {
                        SettingsTab::Model => self.ui_model_tab(ui),
                        SettingsTab::Knowledge => self.ui_knowledge_tab(ui),
                    }
                }

                ui.add_space(8.0);
                ui.separator();
                ui.horizontal(|ui| {
                    if self.modal.pending_change() {
                        ui.colored_label(
                            egui::Color32::from_rgb(230, 160, 30),
                            "● saved change pending on server",
                        );
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(self.modal.close_enabled(), egui::Button::new("Close"))
                            .clicked()
                        {
                            self.modal.request_close();
                        }
                        let apply_label = if self.modal.apply_in_flight() {
                            "Applying…"
                        } else {
                            "Apply"
                        };
                        if ui
                            .add_enabled(self.modal.apply_enabled(), egui::Button::new(apply_label))
                            .clicked()
                        {
                            self.start_apply();
                        }
                    });
                });

                if let Some(ref err) = self.settings_error {
                    ui.add_space(4.0);
                    ui.colored_label(egui::Color32::RED, err);
                }
                if let Some(ref notice) = self.settings_notice {
                    ui.add_space(4.0);
                    ui.weak(notice);
                }
            });

        if self.modal.phase() == ModalPhase::ConfirmingDiscard {
            egui::Window::new("Unsaved changes")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("You have unsaved changes. Discard them and close?");
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Discard changes").clicked() {
                            self.modal.confirm_discard();
                            self.selected_document = None;
                        }
                        if ui.button("Keep editing").clicked() {
                            self.modal.cancel_discard();
                        }
                    });
                });
        }
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "—"
    } else {
        value
    }
}

impl eframe::App for UnichatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_chat_turn();
        self.poll_settings_fetch();
        self.poll_model_save();
        self.poll_knowledge_save();
        self.poll_apply();
        self.poll_suspense();

        // Header with title and the settings control
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.heading("UniChat");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .add_enabled(
                                    !self.modal.is_open(),
                                    egui::Button::new("Settings"),
                                )
                                .clicked()
                            {
                                self.open_settings();
                            }
                        });
                    });
                    ui.add_space(16.0);
                });
        });

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(140.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Chat, "Chat")
                            .clicked()
                        {
                            *current_screen = Screen::Chat;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Logs, "Logs")
                            .clicked()
                        {
                            *current_screen = Screen::Logs;
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Chat => {
                        ui.add_space(24.0);
                        ui.heading("Chat");
                        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
                        self.ui_chat(ui);
                    }
                    Screen::Logs => {
                        self.ui_logs_screen(ui);
                    }
                });
        });

        self.ui_settings_modal(ctx);

        // Background results arrive outside the input-driven repaint cycle.
        if self.chat_turn_receiver.is_some()
            || self.settings_fetch_receiver.is_some()
            || self.model_save.is_some()
            || self.knowledge_save.is_some()
            || self.apply_receiver.is_some()
            || self.modal.is_open()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
