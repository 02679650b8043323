//! Settings-modal state: phase machine, structural dirty tracking, rollback.
//!
//! `ConfigModalState` owns everything the modal mutates — baseline and live
//! snapshots per editable group, transient document bytes, save generations,
//! and the server-driven apply busy state — so the UI layers stay free of
//! module-level mutable state.
//!
//! A group is dirty when its live snapshot differs from its baseline; the
//! baseline only moves on a fetch, on a save success whose generation is
//! still current, or on a confirmed discard.

use crate::catalog::ProviderCatalog;
use crate::snapshot::{DocumentBlobs, KnowledgeBase, ModelSelection};

/// One independently savable part of the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableGroup {
    ModelSelection,
    KnowledgeBase,
}

/// Modal visibility phase. Saves do not hold a phase of their own: they are
/// tracked per group so the rest of the modal stays interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPhase {
    #[default]
    Closed,
    Open,
    ConfirmingDiscard,
}

/// State for the settings modal: two editable groups, their baselines, and
/// the in-flight bookkeeping for saves and the apply action.
#[derive(Debug, Default)]
pub struct ConfigModalState {
    phase: ModalPhase,

    model_baseline: ModelSelection,
    model_live: ModelSelection,
    model_generation: u64,
    model_in_flight: Option<u64>,

    knowledge_baseline: KnowledgeBase,
    knowledge_live: KnowledgeBase,
    knowledge_generation: u64,
    knowledge_in_flight: Option<u64>,

    blobs: DocumentBlobs,

    apply_in_flight: bool,
    pending_change: bool,
}

impl ConfigModalState {
    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    /// Closed -> Open. Fetching fresh server state is the caller's job; the
    /// responses land through `install_*_baseline`.
    pub fn open(&mut self) {
        if self.phase == ModalPhase::Closed {
            self.phase = ModalPhase::Open;
        }
    }

    /// Set baseline and live values from a fetched or just-saved selection.
    pub fn install_model_baseline(&mut self, selection: ModelSelection) {
        self.model_live = selection.clone();
        self.model_baseline = selection;
    }

    /// Set baseline and live values from fetched or just-saved knowledge state.
    pub fn install_knowledge_baseline(&mut self, knowledge: KnowledgeBase) {
        self.knowledge_live = knowledge.clone();
        self.knowledge_baseline = knowledge;
    }

    pub fn model(&self) -> &ModelSelection {
        &self.model_live
    }

    pub fn model_baseline(&self) -> &ModelSelection {
        &self.model_baseline
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge_live
    }

    pub fn knowledge_baseline(&self) -> &KnowledgeBase {
        &self.knowledge_baseline
    }

    pub fn blobs(&self) -> &DocumentBlobs {
        &self.blobs
    }

    /// Direct edit access for text fields (system prompt, model combos).
    pub fn model_mut(&mut self) -> &mut ModelSelection {
        &mut self.model_live
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.knowledge_live
    }

    /// Change the LLM provider, re-deriving the dependent model from the
    /// catalog so the selection never points outside the provider's list.
    pub fn set_llm_provider(&mut self, catalog: &ProviderCatalog, provider: &str) {
        self.model_live.llm_model = catalog.clamp_llm(provider, &self.model_live.llm_model);
        self.model_live.llm_provider = provider.to_string();
    }

    /// Embedding counterpart of `set_llm_provider`.
    pub fn set_emb_provider(&mut self, catalog: &ProviderCatalog, provider: &str) {
        self.model_live.emb_model = catalog.clamp_emb(provider, &self.model_live.emb_model);
        self.model_live.emb_provider = provider.to_string();
    }

    /// Add a picked document: name joins the live list (duplicate name = last
    /// add wins) and its bytes are held until the next successful upload.
    pub fn add_document(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        self.knowledge_live.add_document(name.clone());
        self.blobs.insert(name, bytes);
    }

    /// Remove a document from the live list and drop its pending bytes.
    pub fn remove_document(&mut self, name: &str) {
        self.knowledge_live.remove_document(name);
        self.blobs.remove(name);
    }

    /// Live values differ from the last server-confirmed baseline.
    pub fn is_dirty(&self, group: EditableGroup) -> bool {
        match group {
            EditableGroup::ModelSelection => self.model_live != self.model_baseline,
            EditableGroup::KnowledgeBase => self.knowledge_live != self.knowledge_baseline,
        }
    }

    pub fn is_any_dirty(&self) -> bool {
        self.is_dirty(EditableGroup::ModelSelection) || self.is_dirty(EditableGroup::KnowledgeBase)
    }

    pub fn save_in_flight(&self, group: EditableGroup) -> bool {
        match group {
            EditableGroup::ModelSelection => self.model_in_flight.is_some(),
            EditableGroup::KnowledgeBase => self.knowledge_in_flight.is_some(),
        }
    }

    /// A group's save control is enabled iff the group is dirty and no save
    /// for it is already in flight.
    pub fn save_enabled(&self, group: EditableGroup) -> bool {
        self.is_dirty(group) && !self.save_in_flight(group)
    }

    /// Close request. With clean groups the modal closes directly; with dirty
    /// groups it asks for discard confirmation. Refused while an apply call
    /// is in flight.
    pub fn request_close(&mut self) {
        if self.phase != ModalPhase::Open || self.apply_in_flight {
            return;
        }
        self.phase = if self.is_any_dirty() {
            ModalPhase::ConfirmingDiscard
        } else {
            ModalPhase::Closed
        };
    }

    /// Discard confirmed: replay baselines into the live snapshots, drop
    /// pending document bytes, and close.
    pub fn confirm_discard(&mut self) {
        if self.phase != ModalPhase::ConfirmingDiscard {
            return;
        }
        self.model_live = self.model_baseline.clone();
        self.knowledge_live = self.knowledge_baseline.clone();
        self.blobs.clear();
        self.phase = ModalPhase::Closed;
    }

    /// Discard cancelled: keep editing, nothing else changes.
    pub fn cancel_discard(&mut self) {
        if self.phase == ModalPhase::ConfirmingDiscard {
            self.phase = ModalPhase::Open;
        }
    }

    /// Start a save for the group. Returns the request generation, or None
    /// when a save for this group is already in flight (no concurrent saves
    /// per group). The caller snapshots the live values it is about to send
    /// and hands them back through `finish_*_save` on success.
    pub fn begin_save(&mut self, group: EditableGroup) -> Option<u64> {
        match group {
            EditableGroup::ModelSelection => {
                if self.model_in_flight.is_some() {
                    return None;
                }
                self.model_generation += 1;
                self.model_in_flight = Some(self.model_generation);
                Some(self.model_generation)
            }
            EditableGroup::KnowledgeBase => {
                if self.knowledge_in_flight.is_some() {
                    return None;
                }
                self.knowledge_generation += 1;
                self.knowledge_in_flight = Some(self.knowledge_generation);
                Some(self.knowledge_generation)
            }
        }
    }

    /// Model save completed. `saved` is the payload that was sent when the
    /// save succeeded, None on failure. A response whose generation has been
    /// superseded is dropped so it cannot re-baseline newer edits.
    pub fn finish_model_save(&mut self, generation: u64, saved: Option<ModelSelection>) {
        if generation != self.model_generation {
            log::debug!("dropping stale model save response (generation {})", generation);
            return;
        }
        self.model_in_flight = None;
        if let Some(selection) = saved {
            // Re-baseline to what the server actually stored; edits made while
            // the request was in flight stay dirty.
            self.model_baseline = selection;
        }
    }

    /// Knowledge save completed; see `finish_model_save`. Success also drops
    /// the bytes of the documents that were sent — those are server-side now.
    /// Bytes staged while the request was out must survive for the next save.
    pub fn finish_knowledge_save(&mut self, generation: u64, saved: Option<KnowledgeBase>) {
        if generation != self.knowledge_generation {
            log::debug!(
                "dropping stale knowledge save response (generation {})",
                generation
            );
            return;
        }
        self.knowledge_in_flight = None;
        if let Some(knowledge) = saved {
            for name in &knowledge.documents {
                self.blobs.remove(name);
            }
            self.knowledge_baseline = knowledge;
        }
    }

    /// Start the apply call; false when one is already running.
    pub fn begin_apply(&mut self) -> bool {
        if self.apply_in_flight {
            return false;
        }
        self.apply_in_flight = true;
        true
    }

    /// Apply call finished; a succeeded apply clears the pending-change flag.
    pub fn finish_apply(&mut self, ok: bool) {
        self.apply_in_flight = false;
        if ok {
            self.pending_change = false;
        }
    }

    pub fn apply_in_flight(&self) -> bool {
        self.apply_in_flight
    }

    /// Server-reported pending-change flag (GET /api/config-suspense).
    /// Ignored while an apply is in flight so a stale poll cannot re-enable
    /// the button mid-apply.
    pub fn set_pending_change(&mut self, pending: bool) {
        if !self.apply_in_flight {
            self.pending_change = pending;
        }
    }

    pub fn pending_change(&self) -> bool {
        self.pending_change
    }

    /// The apply action is driven by the server flag, not local dirtiness.
    pub fn apply_enabled(&self) -> bool {
        self.pending_change && !self.apply_in_flight
    }

    /// The close control stays usable except while an apply is in flight.
    pub fn close_enabled(&self) -> bool {
        !self.apply_in_flight
    }
}
