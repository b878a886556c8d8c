use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::geometry::{selection_text, BBox, ScaleFactors, TextBlock, WordBox};
use crate::media::MediaFrame;

/// Overlay lifecycle of one scan. Transitions are checked; an out-of-order
/// trigger is an error, not a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Idle,
    Scanning,
    Overlaid,
    Editing,
}

impl OverlayPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayPhase::Idle => "idle",
            OverlayPhase::Scanning => "scanning",
            OverlayPhase::Overlaid => "overlaid",
            OverlayPhase::Editing => "editing",
        }
    }
}

/// Invalidation signal shared between a session and its observers. Signaled
/// synchronously on navigation or replacement; observers see it immediately,
/// no timer involved.
#[derive(Debug, Clone)]
pub struct InvalidationToken {
    sender: Arc<watch::Sender<Option<String>>>,
    receiver: watch::Receiver<Option<String>>,
}

impl InvalidationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn invalidate(&self, reason: &str) {
        let _ = self.sender.send(Some(reason.to_string()));
    }

    pub fn is_invalidated(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    pub fn reason(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    /// Resolves once the session is invalidated.
    pub async fn invalidated(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if receiver.borrow().is_some() {
                return;
            }
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for InvalidationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one scan produced, addressed by the md5 of the frame bytes.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: String,
    pub page_url: String,
    pub native_width: u32,
    pub native_height: u32,
    pub rendered: (f64, f64),
    pub words: Vec<WordBox>,
    pub blocks: Vec<TextBlock>,
    pub scale: ScaleFactors,
    phase: OverlayPhase,
    token: InvalidationToken,
}

impl ScanSession {
    pub fn new(page_url: &str, frame: &MediaFrame, rendered: (f64, f64)) -> Self {
        Self {
            id: format!("{:x}", md5::compute(&frame.bytes)),
            page_url: page_url.to_string(),
            native_width: frame.width,
            native_height: frame.height,
            rendered,
            words: Vec::new(),
            blocks: Vec::new(),
            scale: ScaleFactors { x: 1.0, y: 1.0 },
            phase: OverlayPhase::Scanning,
            token: InvalidationToken::new(),
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn token(&self) -> InvalidationToken {
        self.token.clone()
    }

    pub fn is_invalidated(&self) -> bool {
        self.token.is_invalidated()
    }

    /// Scan result arrived; the overlay is drawn.
    pub fn overlay(
        &mut self,
        words: Vec<WordBox>,
        blocks: Vec<TextBlock>,
        scale: ScaleFactors,
    ) -> Result<()> {
        if self.phase != OverlayPhase::Scanning {
            return Err(anyhow!(
                "cannot attach scan result in {} phase",
                self.phase.as_str()
            ));
        }
        self.words = words;
        self.blocks = blocks;
        self.scale = scale;
        self.phase = OverlayPhase::Overlaid;
        info!("session {} overlaid with {} blocks", self.id, self.blocks.len());
        Ok(())
    }

    /// A box edit opened. Only one session may be editing at a time; the
    /// registry enforces that across sessions, this checks the local phase.
    pub fn begin_edit(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.phase != OverlayPhase::Overlaid {
            return Err(anyhow!("cannot edit in {} phase", self.phase.as_str()));
        }
        self.phase = OverlayPhase::Editing;
        info!("session {} editing", self.id);
        Ok(())
    }

    pub fn close_edit(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.phase != OverlayPhase::Editing {
            return Err(anyhow!("no edit open in {} phase", self.phase.as_str()));
        }
        self.phase = OverlayPhase::Overlaid;
        Ok(())
    }

    /// User dismissed the overlay; the session returns to idle but stays
    /// addressable until replaced or invalidated.
    pub fn dismiss(&mut self) -> Result<()> {
        self.ensure_live()?;
        match self.phase {
            OverlayPhase::Overlaid | OverlayPhase::Editing => {
                self.phase = OverlayPhase::Idle;
                info!("session {} dismissed", self.id);
                Ok(())
            }
            phase => Err(anyhow!("nothing to dismiss in {} phase", phase.as_str())),
        }
    }

    pub fn invalidate(&mut self, reason: &str) {
        self.token.invalidate(reason);
        self.phase = OverlayPhase::Idle;
        info!("session {} invalidated: {}", self.id, reason);
    }

    /// Recovers the text under a screen-space rectangle by inverse-mapping
    /// into OCR space and re-selecting words by center point.
    pub fn reselect(&self, screen_rect: &BBox) -> Result<String> {
        self.ensure_live()?;
        match self.phase {
            OverlayPhase::Overlaid | OverlayPhase::Editing => {
                let ocr_rect = self.scale.to_ocr(screen_rect);
                Ok(selection_text(&self.words, &ocr_rect))
            }
            phase => Err(anyhow!(
                "no overlay to select from in {} phase",
                phase.as_str()
            )),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if let Some(reason) = self.token.reason() {
            return Err(anyhow!("session invalidated: {}", reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{cluster, normalize, ClusterThresholds, RawWord};

    fn frame() -> MediaFrame {
        MediaFrame {
            bytes: vec![1, 2, 3, 4],
            mime: "image/png".to_string(),
            width: 200,
            height: 100,
        }
    }

    fn overlaid_session() -> ScanSession {
        let words = normalize(
            vec![
                RawWord { text: "koffie".into(), top: 10.0, left: 10.0, width: 40.0, height: 12.0 },
                RawWord { text: "thee".into(), top: 12.0, left: 60.0, width: 30.0, height: 12.0 },
            ],
            20.0,
        );
        let blocks = cluster(&words, ClusterThresholds::default());
        let scale = ScaleFactors::new((200.0, 100.0), (0.0, 0.0), (400.0, 200.0)).unwrap();
        let mut session = ScanSession::new("https://example.test/page", &frame(), (400.0, 200.0));
        session.overlay(words, blocks, scale).unwrap();
        session
    }

    #[test]
    fn id_is_md5_of_frame_bytes() {
        let session = ScanSession::new("https://example.test", &frame(), (1.0, 1.0));
        assert_eq!(session.id, format!("{:x}", md5::compute([1u8, 2, 3, 4])));
    }

    #[test]
    fn lifecycle_follows_checked_transitions() {
        let mut session = overlaid_session();
        assert_eq!(session.phase(), OverlayPhase::Overlaid);
        session.begin_edit().unwrap();
        assert_eq!(session.phase(), OverlayPhase::Editing);
        session.close_edit().unwrap();
        assert_eq!(session.phase(), OverlayPhase::Overlaid);
        session.dismiss().unwrap();
        assert_eq!(session.phase(), OverlayPhase::Idle);
    }

    #[test]
    fn illegal_transitions_are_errors() {
        let mut session = ScanSession::new("https://example.test", &frame(), (1.0, 1.0));
        assert!(session.begin_edit().is_err());
        assert!(session.close_edit().is_err());
        assert!(session.dismiss().is_err());

        let mut session = overlaid_session();
        assert!(session.close_edit().is_err());
        session.begin_edit().unwrap();
        assert!(session.begin_edit().is_err());
    }

    #[test]
    fn double_overlay_is_an_error() {
        let mut session = overlaid_session();
        let scale = session.scale;
        assert!(session.overlay(Vec::new(), Vec::new(), scale).is_err());
    }

    #[test]
    fn reselect_maps_screen_rect_back_to_ocr_space() {
        let session = overlaid_session();
        // Screen rect covering OCR x in [0, 55]; only the first word's
        // center (30, 16) falls inside.
        let text = session
            .reselect(&BBox { x0: 0.0, y0: 0.0, x1: 110.0, y1: 60.0 })
            .unwrap();
        assert_eq!(text, "koffie");
        let both = session
            .reselect(&BBox { x0: 0.0, y0: 0.0, x1: 200.0, y1: 60.0 })
            .unwrap();
        assert_eq!(both, "koffie thee");
    }

    #[test]
    fn invalidation_is_observed_synchronously() {
        let mut session = overlaid_session();
        let token = session.token();
        assert!(!token.is_invalidated());
        session.invalidate("navigated away");
        assert!(token.is_invalidated());
        assert_eq!(token.reason().as_deref(), Some("navigated away"));
        assert_eq!(session.phase(), OverlayPhase::Idle);
        assert!(session.reselect(&BBox { x0: 0.0, y0: 0.0, x1: 1.0, y1: 1.0 }).is_err());
        assert!(session.begin_edit().is_err());
    }

    #[tokio::test]
    async fn token_wakes_async_observers() {
        let mut session = overlaid_session();
        let token = session.token();
        let waiter = tokio::spawn(async move { token.invalidated().await });
        session.invalidate("replaced by new scan");
        waiter.await.unwrap();
    }
}
