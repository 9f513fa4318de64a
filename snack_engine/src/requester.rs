//! Platform requests (saving, purchases, ads, links) and how their results
//! come back.
//!
//! A request is fire-and-forget: the engine hands it to a [`Requester`]
//! together with a [`Responder`], and the implementation answers whenever it
//! is done, possibly on another thread. Results are drained once per tick by
//! the scene manager.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use serde::Serialize;

pub type RequestId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    UnlockAchievement,
    SaveProgress,
    SavePermanent,
    Purchase,
    RestorePurchases,
    ShowShop,
    InterstitialAds,
    RewardedAds,
    OpenLink,
    ShareImage,
    ChangeLanguage,
    IapPrices,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestResult {
    pub id: RequestId,
    pub kind: RequestKind,
    pub succeeded: bool,
    /// Kind-specific payload: a JSON list of product keys for purchase
    /// results, a JSON price map for `IapPrices`, a language code for
    /// `ChangeLanguage`.
    pub data: Vec<u8>,
}

/// Sending half of the result channel. Cheap to clone into worker threads.
#[derive(Debug, Clone)]
pub struct Responder {
    sender: Sender<RequestResult>,
}

impl Responder {
    pub fn new(sender: Sender<RequestResult>) -> Self {
        Self { sender }
    }

    pub fn respond(&self, id: RequestId, kind: RequestKind, succeeded: bool, data: Vec<u8>) {
        let result = RequestResult {
            id,
            kind,
            succeeded,
            data,
        };
        if self.sender.send(result).is_err() {
            log::warn!("request #{id} ({kind:?}) answered after the scene manager went away");
        }
    }

    pub fn succeed(&self, id: RequestId, kind: RequestKind) {
        self.respond(id, kind, true, Vec::new());
    }
}

/// The host platform. Every method must eventually answer through the
/// responder unless noted otherwise.
pub trait Requester {
    fn unlock_achievement(&mut self, responder: &Responder, id: RequestId, achievement_id: i32);
    fn save_progress(&mut self, responder: &Responder, id: RequestId, data: &[u8]);
    fn save_permanent(&mut self, responder: &Responder, id: RequestId, data: &[u8]);
    fn purchase(&mut self, responder: &Responder, id: RequestId, product_key: &str);
    fn restore_purchases(&mut self, responder: &Responder, id: RequestId);
    fn show_shop(&mut self, responder: &Responder, id: RequestId, catalog: &str);
    fn interstitial_ads(&mut self, responder: &Responder, id: RequestId, force: bool);
    fn rewarded_ads(&mut self, responder: &Responder, id: RequestId, force: bool);
    fn open_link(&mut self, responder: &Responder, id: RequestId, kind: &str, data: &str);
    fn share_image(
        &mut self,
        responder: &Responder,
        id: RequestId,
        title: &str,
        message: &str,
        image: &[u8],
    );
    fn change_language(&mut self, responder: &Responder, id: RequestId, language: &str);
    fn iap_prices(&mut self, responder: &Responder, id: RequestId, product_keys: &[String]);
    /// No answer expected.
    fn terminate_game(&mut self);
    /// No answer expected.
    fn send_analytics(&mut self, event: &str, value: &str);
}

/// One call made against a [`RecordingRequester`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum RecordedRequest {
    UnlockAchievement { id: RequestId, achievement_id: i32 },
    SaveProgress { id: RequestId, len: usize },
    SavePermanent { id: RequestId, len: usize },
    Purchase { id: RequestId, product_key: String },
    RestorePurchases { id: RequestId },
    ShowShop { id: RequestId, catalog: String },
    InterstitialAds { id: RequestId, force: bool },
    RewardedAds { id: RequestId, force: bool },
    OpenLink { id: RequestId, kind: String, data: String },
    ShareImage { id: RequestId, title: String },
    ChangeLanguage { id: RequestId, language: String },
    IapPrices { id: RequestId },
    TerminateGame,
    SendAnalytics { event: String, value: String },
}

#[derive(Debug, Default)]
struct Recording {
    requests: Vec<RecordedRequest>,
    last_progress: Option<Vec<u8>>,
    purchases: Vec<String>,
    fail_all: bool,
}

/// Answers every request immediately and remembers what was asked. Clones
/// share the same log so a test can keep a handle after boxing one.
#[derive(Debug, Clone, Default)]
pub struct RecordingRequester {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingRequester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later answer report failure.
    pub fn fail_all(&self) {
        self.inner.borrow_mut().fail_all = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.borrow().requests.clone()
    }

    /// Bytes of the most recent progress save.
    pub fn last_progress(&self) -> Option<Vec<u8>> {
        self.inner.borrow().last_progress.clone()
    }

    fn record(&self, request: RecordedRequest) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.requests.push(request);
        !inner.fail_all
    }

    fn purchases_json(&self) -> Vec<u8> {
        serde_json::to_vec(&self.inner.borrow().purchases).unwrap_or_default()
    }
}

impl Requester for RecordingRequester {
    fn unlock_achievement(&mut self, responder: &Responder, id: RequestId, achievement_id: i32) {
        let ok = self.record(RecordedRequest::UnlockAchievement { id, achievement_id });
        responder.respond(id, RequestKind::UnlockAchievement, ok, Vec::new());
    }

    fn save_progress(&mut self, responder: &Responder, id: RequestId, data: &[u8]) {
        let ok = self.record(RecordedRequest::SaveProgress {
            id,
            len: data.len(),
        });
        if ok {
            self.inner.borrow_mut().last_progress = Some(data.to_vec());
        }
        responder.respond(id, RequestKind::SaveProgress, ok, Vec::new());
    }

    fn save_permanent(&mut self, responder: &Responder, id: RequestId, data: &[u8]) {
        let ok = self.record(RecordedRequest::SavePermanent {
            id,
            len: data.len(),
        });
        responder.respond(id, RequestKind::SavePermanent, ok, Vec::new());
    }

    fn purchase(&mut self, responder: &Responder, id: RequestId, product_key: &str) {
        let ok = self.record(RecordedRequest::Purchase {
            id,
            product_key: product_key.to_string(),
        });
        if ok {
            let mut inner = self.inner.borrow_mut();
            if !inner.purchases.iter().any(|key| key == product_key) {
                inner.purchases.push(product_key.to_string());
            }
        }
        responder.respond(id, RequestKind::Purchase, ok, self.purchases_json());
    }

    fn restore_purchases(&mut self, responder: &Responder, id: RequestId) {
        let ok = self.record(RecordedRequest::RestorePurchases { id });
        responder.respond(id, RequestKind::RestorePurchases, ok, self.purchases_json());
    }

    fn show_shop(&mut self, responder: &Responder, id: RequestId, catalog: &str) {
        let ok = self.record(RecordedRequest::ShowShop {
            id,
            catalog: catalog.to_string(),
        });
        responder.respond(id, RequestKind::ShowShop, ok, self.purchases_json());
    }

    fn interstitial_ads(&mut self, responder: &Responder, id: RequestId, force: bool) {
        let ok = self.record(RecordedRequest::InterstitialAds { id, force });
        responder.respond(id, RequestKind::InterstitialAds, ok, Vec::new());
    }

    fn rewarded_ads(&mut self, responder: &Responder, id: RequestId, force: bool) {
        let ok = self.record(RecordedRequest::RewardedAds { id, force });
        responder.respond(id, RequestKind::RewardedAds, ok, Vec::new());
    }

    fn open_link(&mut self, responder: &Responder, id: RequestId, kind: &str, data: &str) {
        let ok = self.record(RecordedRequest::OpenLink {
            id,
            kind: kind.to_string(),
            data: data.to_string(),
        });
        responder.respond(id, RequestKind::OpenLink, ok, Vec::new());
    }

    fn share_image(
        &mut self,
        responder: &Responder,
        id: RequestId,
        title: &str,
        _message: &str,
        _image: &[u8],
    ) {
        let ok = self.record(RecordedRequest::ShareImage {
            id,
            title: title.to_string(),
        });
        responder.respond(id, RequestKind::ShareImage, ok, Vec::new());
    }

    fn change_language(&mut self, responder: &Responder, id: RequestId, language: &str) {
        let ok = self.record(RecordedRequest::ChangeLanguage {
            id,
            language: language.to_string(),
        });
        responder.respond(
            id,
            RequestKind::ChangeLanguage,
            ok,
            language.as_bytes().to_vec(),
        );
    }

    fn iap_prices(&mut self, responder: &Responder, id: RequestId, _product_keys: &[String]) {
        let ok = self.record(RecordedRequest::IapPrices { id });
        responder.respond(id, RequestKind::IapPrices, ok, b"{}".to_vec());
    }

    fn terminate_game(&mut self) {
        self.record(RecordedRequest::TerminateGame);
    }

    fn send_analytics(&mut self, event: &str, value: &str) {
        self.record(RecordedRequest::SendAnalytics {
            event: event.to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn recording_requester_answers_through_the_channel() {
        let (sender, receiver) = channel();
        let responder = Responder::new(sender);
        let recorder = RecordingRequester::new();
        let mut requester = recorder.clone();

        requester.purchase(&responder, 1, "unlock_all");
        requester.purchase(&responder, 2, "unlock_all");
        requester.send_analytics("start", "");

        let first = receiver.try_recv().expect("first result");
        assert_eq!(first.kind, RequestKind::Purchase);
        assert!(first.succeeded);
        let second = receiver.try_recv().expect("second result");
        let keys: Vec<String> = serde_json::from_slice(&second.data).expect("keys");
        assert_eq!(keys, vec!["unlock_all".to_string()]);
        assert!(receiver.try_recv().is_err());
        assert_eq!(recorder.requests().len(), 3);
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let (sender, receiver) = channel();
        let responder = Responder::new(sender);
        let recorder = RecordingRequester::new();
        recorder.fail_all();
        let mut requester = recorder.clone();
        requester.save_progress(&responder, 4, b"bytes");
        let result = receiver.try_recv().expect("result");
        assert_eq!(result.id, 4);
        assert!(!result.succeeded);
        assert_eq!(recorder.last_progress(), None);
    }
}
