use std::collections::HashMap;
use std::sync::Mutex;

use crate::gateways::{OcrGateway, SpeechGateway, TranslateGateway};
use crate::notebook::Notebook;
use crate::session::ScanSession;
use crate::settings::Settings;

pub(crate) struct ServerState {
    pub(crate) settings: Settings,
    pub(crate) client: reqwest::Client,
    pub(crate) ocr: OcrGateway,
    pub(crate) translator: TranslateGateway,
    pub(crate) speech: SpeechGateway,
    pub(crate) sessions: Mutex<SessionRegistry>,
    pub(crate) notebook: Mutex<Notebook>,
}

#[derive(Default)]
pub(crate) struct SessionRegistry {
    sessions: HashMap<String, ScanSession>,
}

impl SessionRegistry {
    /// Cleanup before draw: a completed scan replaces and invalidates any
    /// prior session for the same page URL.
    pub(crate) fn insert(&mut self, session: ScanSession) {
        self.sessions.retain(|_, existing| {
            if existing.page_url == session.page_url {
                existing.invalidate("replaced by new scan");
                false
            } else {
                true
            }
        });
        self.sessions.insert(session.id.clone(), session);
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ScanSession> {
        self.sessions.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ScanSession> {
        self.sessions.get_mut(id)
    }

    /// Invalidates and drops every session not belonging to `page_url`.
    /// Returns how many were torn down.
    pub(crate) fn navigate(&mut self, page_url: &str) -> usize {
        let mut invalidated = 0;
        self.sessions.retain(|_, session| {
            if session.page_url != page_url {
                session.invalidate("page navigated");
                invalidated += 1;
                false
            } else {
                true
            }
        });
        invalidated
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}
