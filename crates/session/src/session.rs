use formats::bundle::{self, BundleValidation};
use formats::{FeatureCollection, FileDescriptor};
use foundation::ids::LayerId;
use foundation::time::Millis;
use layers::symbology::{self, LayerStyle, StylePatch};
use layers::{Basemap, Layer, LayerRegistry, NewLayer, Provenance};
use protocol::{
    BackendError, COMMAND_FALLBACK_ERROR, CommandReply, CommandRequest, IngestPayload,
    UPLOAD_FALLBACK_ERROR, UploadRequest,
};
use runtime::{CommandHistory, ExpiryTicket, StatusKind, StatusMessage, StatusNotifier, results_added};
use scene::{ClickTarget, FeatureHit, FeatureRef, SelectionController, classify_click};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Channel, SessionError};
use crate::ingest::{CommandResultIngestor, IngestOutcome};
use crate::render::{self, LayerRender, ViewportFit};

pub const UPLOADING_TEXT: &str = "Uploading shapefile...";
pub const UPLOAD_SUCCESS_TEXT: &str = "Shapefile loaded successfully!";
pub const COMMAND_SUCCESS_TEXT: &str = "Command executed and result visualized on map!";

/// Owned state of one map viewer.
///
/// Ordering contract:
/// - Handlers run to completion one at a time; there is no interior locking.
/// - Each channel admits one in-flight request; a second `begin_*` is
///   rejected until the matching `complete_*` has run.
/// - Status posts hand out an expiry ticket through
///   [`MapSession::take_status_timer`]; only the newest ticket can hide the
///   status line.
#[derive(Debug)]
pub struct MapSession {
    files: BundleValidation,
    registry: LayerRegistry,
    selection: SelectionController,
    status: StatusNotifier,
    history: CommandHistory,
    ingestor: CommandResultIngestor,
    basemap: Basemap,
    upload_color: String,
    upload_pending: bool,
    command_pending: bool,
    fitted_layers: usize,
    status_timer: Option<ExpiryTicket>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl MapSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            files: BundleValidation::default(),
            registry: LayerRegistry::new(),
            selection: SelectionController::new(),
            status: StatusNotifier::new(config.status_delay),
            history: CommandHistory::new(),
            ingestor: CommandResultIngestor::new(config.command_color.clone()),
            basemap: Basemap::default(),
            upload_color: config.upload_color.clone(),
            upload_pending: false,
            command_pending: false,
            fitted_layers: 0,
            status_timer: None,
        }
    }

    // ---- file bundle ------------------------------------------------------

    /// Replaces the working set with the recognized subset of `files`.
    pub fn select_files(&mut self, files: &[FileDescriptor]) -> &BundleValidation {
        self.files = bundle::validate(files);
        debug!(
            "selected {} file(s), missing {:?}",
            self.files.accepted.len(),
            self.files.missing_display()
        );
        &self.files
    }

    pub fn selected_files(&self) -> &BundleValidation {
        &self.files
    }

    pub fn can_submit_upload(&self) -> bool {
        self.files.is_complete() && !self.upload_pending
    }

    // ---- upload channel ---------------------------------------------------

    pub fn begin_upload(&mut self, now: Millis) -> Result<UploadRequest, SessionError> {
        if !self.files.is_complete() {
            let missing = self.files.missing.iter().copied().collect();
            return Err(SessionError::Validation { missing });
        }
        if self.upload_pending {
            warn!("upload rejected: previous upload still in flight");
            return Err(SessionError::ChannelBusy(Channel::Upload));
        }
        self.upload_pending = true;
        self.post(UPLOADING_TEXT, StatusKind::Loading, now);
        info!("uploading {} file(s)", self.files.accepted.len());
        Ok(UploadRequest::new(self.files.accepted.clone()))
    }

    pub fn upload_pending(&self) -> bool {
        self.upload_pending
    }

    /// Applies the converter's answer. Returns the new layer on success.
    pub fn complete_upload(
        &mut self,
        reply: Result<FeatureCollection, BackendError>,
        now: Millis,
    ) -> Option<LayerId> {
        self.upload_pending = false;
        match reply {
            Ok(geometry) => {
                let id = self
                    .registry
                    .create(NewLayer {
                        geometry,
                        name: None,
                        color: self.upload_color.clone(),
                        style: LayerStyle::default(),
                        provenance: Provenance::Upload,
                    })
                    .id();
                info!("upload produced layer {id}");
                self.post(UPLOAD_SUCCESS_TEXT, StatusKind::Success, now);
                self.files = BundleValidation::default();
                Some(id)
            }
            Err(err) => {
                warn!("upload failed: {err}");
                let text = format!("Error: {}", err.message_or(UPLOAD_FALLBACK_ERROR));
                self.post(text, StatusKind::Error, now);
                None
            }
        }
    }

    // ---- command channel --------------------------------------------------

    pub fn begin_command(&mut self, query: &str) -> Result<CommandRequest, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyCommand);
        }
        if self.command_pending {
            warn!("command rejected: previous command still in flight");
            return Err(SessionError::ChannelBusy(Channel::Command));
        }
        self.command_pending = true;
        self.history.command(query);
        info!("submitting command with {} layer(s) of context", self.registry.len());
        Ok(CommandRequest::new(query, self.registry.iter()))
    }

    pub fn command_pending(&self) -> bool {
        self.command_pending
    }

    pub fn complete_command(
        &mut self,
        reply: Result<CommandReply, BackendError>,
        now: Millis,
    ) -> Vec<IngestOutcome> {
        self.command_pending = false;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                warn!("command failed: {err}");
                let message = err.message_or(COMMAND_FALLBACK_ERROR);
                self.history
                    .error(format!("Failed to process AI command: {message}"));
                self.post(format!("Error: {message}"), StatusKind::Error, now);
                return Vec::new();
            }
        };

        match &reply.error {
            Some(error) => self.history.error(error.clone()),
            None => {
                let n = reply.results.len();
                let details = (n > 0).then(|| results_added(n));
                self.history
                    .result(reply.message.clone().unwrap_or_default(), details);
            }
        }
        self.ingest_results(reply.into_payload(), now)
    }

    /// Adds command results as layers, logging per-entry failures.
    pub fn ingest_results(&mut self, payload: IngestPayload, now: Millis) -> Vec<IngestOutcome> {
        let outcomes = self.ingestor.ingest(&mut self.registry, payload);
        for outcome in &outcomes {
            match &outcome.error {
                Some(err) => self.history.error(format!("Failed to parse GeoJSON: {err}")),
                None => self.post(COMMAND_SUCCESS_TEXT, StatusKind::Success, now),
            }
        }
        outcomes
    }

    // ---- selection --------------------------------------------------------

    /// Routes a click on the map. A hit on a visible, known feature selects
    /// it; anything else is a background click.
    pub fn map_click(&mut self, hit: Option<&FeatureHit>) {
        match classify_click(&self.registry, hit) {
            ClickTarget::Feature {
                layer_id,
                feature_id,
                properties,
            } => {
                debug!("selected feature {feature_id} in layer {layer_id}");
                self.selection.feature_click(layer_id, feature_id, properties);
            }
            ClickTarget::Background => {
                if self.selection.active().is_some() {
                    debug!("selection cleared by background click");
                }
                self.selection.background_click();
            }
        }
    }

    pub fn close_feature_info(&mut self) {
        self.selection.clear();
    }

    pub fn active_feature(&self) -> Option<&FeatureRef> {
        self.selection.active()
    }

    pub fn feature_info(&self) -> Option<&Map<String, Value>> {
        self.selection.properties()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    // ---- layers -----------------------------------------------------------

    pub fn layers(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.registry.get(id)
    }

    /// Hiding the layer that owns the active feature also clears the selection.
    pub fn set_visibility(&mut self, id: LayerId, visible: bool) -> Result<(), SessionError> {
        if !self.registry.set_visibility(id, visible) {
            return Err(SessionError::UnknownLayer(id));
        }
        if !visible && self.selection.layer_hidden(id) {
            debug!("selection cleared: layer {id} hidden");
        }
        Ok(())
    }

    pub fn set_style(&mut self, id: LayerId, patch: StylePatch) -> Result<(), SessionError> {
        let patch = patch.validated()?;
        if !self.registry.set_style(id, &patch) {
            return Err(SessionError::UnknownLayer(id));
        }
        Ok(())
    }

    pub fn basemap(&self) -> Basemap {
        self.basemap
    }

    pub fn set_basemap(&mut self, basemap: Basemap) {
        self.basemap = basemap;
    }

    pub fn upload_color(&self) -> &str {
        &self.upload_color
    }

    /// Only colors offered by the upload picker are accepted.
    pub fn set_upload_color(&mut self, color: &str) -> Result<(), SessionError> {
        match symbology::upload_palette()
            .iter()
            .find(|c| c.eq_ignore_ascii_case(color))
        {
            Some(c) => {
                self.upload_color = c.to_string();
                Ok(())
            }
            None => Err(SessionError::ColorNotOffered(color.to_string())),
        }
    }

    // ---- presentation -----------------------------------------------------

    pub fn render_plan(&self) -> Vec<LayerRender> {
        render::plan(&self.registry, &self.selection)
    }

    /// Bounds of the newest layer, once per increase of the layer count.
    ///
    /// Layers without any coordinates consume the fit without producing one.
    pub fn take_viewport_fit(&mut self) -> Option<ViewportFit> {
        if self.registry.len() <= self.fitted_layers {
            return None;
        }
        self.fitted_layers = self.registry.len();
        let layer = self.registry.most_recent()?;
        let bounds = layer.geometry().bounds()?;
        Some(ViewportFit {
            layer_id: layer.id(),
            bounds,
        })
    }

    // ---- status -----------------------------------------------------------

    fn post(&mut self, text: impl Into<String>, kind: StatusKind, now: Millis) {
        self.status_timer = self.status.post(text, kind, now);
    }

    /// The expiry timer the host should arm for the latest status post.
    pub fn take_status_timer(&mut self) -> Option<ExpiryTicket> {
        self.status_timer.take()
    }

    pub fn expire_status(&mut self, ticket: ExpiryTicket) -> bool {
        self.status.expire(ticket)
    }

    pub fn tick(&mut self, now: Millis) -> bool {
        self.status.tick(now)
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.visible()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::ShapefileExtension;
    use pretty_assertions::assert_eq;
    use runtime::HistoryEntry;
    use serde_json::json;

    const FC: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","id":"x","properties":{"name":"Alpha"},
         "geometry":{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,2],[0,0]]]}}]}"#;

    fn files(names: &[&str]) -> Vec<FileDescriptor> {
        names.iter().map(|n| FileDescriptor::new(*n, 100)).collect()
    }

    fn uploaded(session: &mut MapSession) -> LayerId {
        session.select_files(&files(&["a.shp", "a.shx", "a.dbf", "a.prj"]));
        session.begin_upload(Millis(0)).expect("upload admitted");
        let fc = FeatureCollection::from_geojson_str(FC).expect("fixture");
        session.complete_upload(Ok(fc), Millis(10)).expect("layer")
    }

    #[test]
    fn incomplete_bundle_blocks_upload() {
        let mut s = MapSession::default();
        s.select_files(&files(&["a.shp", "a.shx", "a.dbf"]));
        assert!(!s.can_submit_upload());
        assert_eq!(
            s.begin_upload(Millis(0)),
            Err(SessionError::Validation {
                missing: vec![ShapefileExtension::Prj]
            })
        );
        assert!(!s.upload_pending());
        assert!(s.status().is_none());
    }

    #[test]
    fn second_upload_is_rejected_while_pending() {
        let mut s = MapSession::default();
        s.select_files(&files(&["a.shp", "a.shx", "a.dbf", "a.prj"]));
        let req = s.begin_upload(Millis(0)).expect("first");
        assert_eq!(req.files.len(), 4);
        assert_eq!(
            s.status().map(|m| (m.text.as_str(), m.kind)),
            Some((UPLOADING_TEXT, StatusKind::Loading))
        );
        assert!(s.take_status_timer().is_none());
        assert_eq!(
            s.begin_upload(Millis(1)),
            Err(SessionError::ChannelBusy(Channel::Upload))
        );
    }

    #[test]
    fn successful_upload_adds_layer_and_clears_files() {
        let mut s = MapSession::default();
        s.set_upload_color("#ff5733").expect("palette color");
        let id = uploaded(&mut s);
        let layer = s.layer(id).expect("layer");
        assert_eq!(layer.name(), "Layer 1");
        assert_eq!(layer.color(), "#ff5733");
        assert_eq!(layer.provenance(), Provenance::Upload);
        assert!(s.selected_files().accepted.is_empty());
        assert!(!s.upload_pending());
        assert_eq!(s.status().map(|m| m.text.as_str()), Some(UPLOAD_SUCCESS_TEXT));
        assert_eq!(s.take_status_timer().map(|t| t.due_at), Some(Millis(5010)));
    }

    #[test]
    fn failed_upload_reports_error() {
        let mut s = MapSession::default();
        s.select_files(&files(&["a.shp", "a.shx", "a.dbf", "a.prj"]));
        s.begin_upload(Millis(0)).expect("admitted");
        s.complete_upload(Err(BackendError::Status(500)), Millis(5));
        assert_eq!(
            s.status().map(|m| m.text.as_str()),
            Some("Error: Failed to upload shapefile")
        );
        assert!(s.layers().is_empty());
        assert_eq!(s.selected_files().accepted.len(), 4);
        assert!(s.can_submit_upload());
    }

    #[test]
    fn hiding_the_owning_layer_clears_selection() {
        let mut s = MapSession::default();
        let id = uploaded(&mut s);
        s.map_click(Some(&FeatureHit::new(id, "x")));
        assert_eq!(
            s.feature_info().and_then(|p| p.get("name")),
            Some(&json!("Alpha"))
        );
        s.set_visibility(id, false).expect("known layer");
        assert!(s.active_feature().is_none());
        assert!(s.render_plan().is_empty());
    }

    #[test]
    fn hits_on_hidden_layers_are_background_clicks() {
        let mut s = MapSession::default();
        let id = uploaded(&mut s);
        s.set_visibility(id, false).expect("known layer");
        s.map_click(Some(&FeatureHit::new(id, "x")));
        assert!(s.active_feature().is_none());
    }

    #[test]
    fn style_edits_are_range_checked() {
        let mut s = MapSession::default();
        let id = uploaded(&mut s);
        let bad = StylePatch {
            weight: Some(11.0),
            ..StylePatch::default()
        };
        assert!(matches!(s.set_style(id, bad), Err(SessionError::Style(_))));
        let good = StylePatch {
            weight: Some(6.0),
            ..StylePatch::default()
        };
        s.set_style(id, good).expect("in range");
        assert_eq!(s.layer(id).map(|l| l.style().weight), Some(6.0));
        assert_eq!(
            s.set_style(LayerId::new(42), StylePatch::default()),
            Err(SessionError::UnknownLayer(LayerId::new(42)))
        );
    }

    #[test]
    fn upload_color_must_come_from_picker() {
        let mut s = MapSession::default();
        assert!(matches!(
            s.set_upload_color("#333333"),
            Err(SessionError::ColorNotOffered(_))
        ));
        assert_eq!(s.upload_color(), "#3388ff");
    }

    #[test]
    fn viewport_fit_fires_once_per_new_layer() {
        let mut s = MapSession::default();
        assert!(s.take_viewport_fit().is_none());
        let id = uploaded(&mut s);
        let fit = s.take_viewport_fit().expect("fit");
        assert_eq!(fit.layer_id, id);
        assert_eq!(fit.bounds.min, [0.0, 0.0]);
        assert_eq!(fit.bounds.max, [4.0, 2.0]);
        assert!(s.take_viewport_fit().is_none());
    }

    #[test]
    fn command_failure_is_logged_in_history() {
        let mut s = MapSession::default();
        s.begin_command("count parks").expect("admitted");
        let out = s.complete_command(
            Err(BackendError::Rejected {
                status: 500,
                message: "model offline".to_string(),
            }),
            Millis(0),
        );
        assert!(out.is_empty());
        assert_eq!(
            s.history().entries().last(),
            Some(&HistoryEntry::Error {
                text: "Failed to process AI command: model offline".to_string()
            })
        );
        assert!(!s.command_pending());
        assert_eq!(
            s.status().map(|m| (m.text.as_str(), m.kind)),
            Some(("Error: model offline", StatusKind::Error))
        );
        assert_eq!(s.take_status_timer().map(|t| t.due_at), Some(Millis(5000)));
    }

    #[test]
    fn blank_and_concurrent_commands_are_rejected() {
        let mut s = MapSession::default();
        assert_eq!(s.begin_command("   "), Err(SessionError::EmptyCommand));
        s.begin_command("a").expect("first");
        assert_eq!(
            s.begin_command("b"),
            Err(SessionError::ChannelBusy(Channel::Command))
        );
        assert_eq!(s.history().len(), 1);
    }
}
