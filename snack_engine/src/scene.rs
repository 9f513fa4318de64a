use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver};

use serde::{Deserialize, Serialize};
use snack_data::Game;
use snack_save::{decode_expected, encode_payload, PayloadKind, SaveError};
use thiserror::Error;

use crate::audio_bridge::AudioSink;
use crate::requester::{RequestId, RequestKind, RequestResult, Requester, Responder};

/// Results nobody has collected yet. Beyond this the oldest are dropped.
pub const MAX_PENDING_RESULTS: usize = 64;

/// Permanent variable slots are numbered `0..MAX_PERMANENT_VARIABLES`.
pub const MAX_PERMANENT_VARIABLES: usize = 1024;

#[derive(Debug, Error)]
pub enum PermanentError {
    #[error("permanent variable {0} is out of range (limit {MAX_PERMANENT_VARIABLES})")]
    OutOfRange(usize),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Data that outlives any single playthrough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permanent {
    pub variables: Vec<i64>,
}

/// Everything the game state needs from outside the world itself: the
/// project, the platform, purchases and the language.
pub struct SceneManager {
    game: Rc<Game>,
    requester: Box<dyn Requester>,
    audio: Option<Rc<dyn AudioSink>>,
    responder: Responder,
    receiver: Receiver<RequestResult>,
    last_request_id: RequestId,
    results: BTreeMap<RequestId, RequestResult>,
    progress: Option<Vec<u8>>,
    permanent: Permanent,
    purchases: Vec<String>,
    prices: BTreeMap<String, String>,
    language: String,
    interstitial_ads_loaded: bool,
    rewarded_ads_loaded: bool,
}

impl SceneManager {
    pub fn new(game: Rc<Game>, requester: Box<dyn Requester>) -> Self {
        let (sender, receiver) = channel();
        let language = game
            .texts
            .languages
            .first()
            .cloned()
            .unwrap_or_else(|| "en".to_string());
        Self {
            game,
            requester,
            audio: None,
            responder: Responder::new(sender),
            receiver,
            last_request_id: 0,
            results: BTreeMap::new(),
            progress: None,
            permanent: Permanent::default(),
            purchases: Vec::new(),
            prices: BTreeMap::new(),
            language,
            interstitial_ads_loaded: false,
            rewarded_ads_loaded: false,
        }
    }

    pub fn with_audio(mut self, audio: Rc<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_purchases(mut self, purchases: Vec<String>) -> Self {
        self.purchases = purchases;
        self
    }

    /// Restores permanent data saved by an earlier session.
    pub fn with_permanent(mut self, bytes: &[u8]) -> Result<Self, SaveError> {
        self.permanent = decode_expected(PayloadKind::Permanent, bytes)?;
        Ok(self)
    }

    pub fn game(&self) -> Rc<Game> {
        Rc::clone(&self.game)
    }

    pub fn audio(&self) -> Option<&dyn AudioSink> {
        self.audio.as_deref()
    }

    /// Drains answered requests into the result buffer and applies the
    /// side effects the manager itself tracks.
    pub fn update(&mut self) {
        while let Ok(result) = self.receiver.try_recv() {
            self.apply(&result);
            self.results.insert(result.id, result);
        }
        while self.results.len() > MAX_PENDING_RESULTS {
            if let Some((id, result)) = self.results.pop_first() {
                log::warn!("dropping uncollected result of request #{id} ({:?})", result.kind);
            }
        }
    }

    fn apply(&mut self, result: &RequestResult) {
        log::info!(
            "request #{} ({:?}) finished, succeeded: {}",
            result.id,
            result.kind,
            result.succeeded
        );
        match result.kind {
            RequestKind::InterstitialAds => self.interstitial_ads_loaded = false,
            RequestKind::RewardedAds => self.rewarded_ads_loaded = false,
            RequestKind::Purchase | RequestKind::RestorePurchases | RequestKind::ShowShop
                if result.succeeded =>
            {
                match serde_json::from_slice::<Vec<String>>(&result.data) {
                    Ok(purchases) => self.purchases = purchases,
                    Err(err) => log::warn!("request #{}: bad purchase list: {err}", result.id),
                }
            }
            RequestKind::IapPrices if result.succeeded => {
                match serde_json::from_slice::<BTreeMap<String, String>>(&result.data) {
                    Ok(prices) => self.prices = prices,
                    Err(err) => log::warn!("request #{}: bad price map: {err}", result.id),
                }
            }
            RequestKind::ChangeLanguage if result.succeeded => {
                let language = String::from_utf8_lossy(&result.data).into_owned();
                self.set_language(&language);
            }
            _ => {}
        }
    }

    pub fn generate_request_id(&mut self) -> RequestId {
        self.last_request_id += 1;
        self.last_request_id
    }

    pub fn has_result(&self, id: RequestId) -> bool {
        self.results.contains_key(&id)
    }

    pub fn take_result(&mut self, id: RequestId) -> Option<RequestResult> {
        self.results.remove(&id)
    }

    pub fn pending_result_count(&self) -> usize {
        self.results.len()
    }

    pub fn progress(&self) -> Option<&[u8]> {
        self.progress.as_deref()
    }

    pub fn set_progress(&mut self, progress: Vec<u8>) {
        self.progress = Some(progress);
    }

    pub fn is_purchased(&self, key: &str) -> bool {
        self.purchases.iter().any(|purchase| purchase == key)
    }

    pub fn purchases(&self) -> &[String] {
        &self.purchases
    }

    /// Highest donation tier among owned products.
    pub fn sponsor_tier(&self) -> i64 {
        self.game
            .iap_products
            .iter()
            .filter(|product| self.is_purchased(&product.key))
            .map(|product| product.kind.sponsor_tier())
            .max()
            .unwrap_or(0)
    }

    pub fn price(&self, key: &str) -> String {
        self.prices.get(key).cloned().unwrap_or_default()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Picks a language the project has text for, falling back to its first.
    pub fn set_language(&mut self, language: &str) {
        let languages = &self.game.texts.languages;
        if languages.is_empty() || languages.iter().any(|known| known == language) {
            self.language = language.to_string();
        } else {
            log::warn!("language {language:?} is not in the project; using {:?}", languages[0]);
            self.language = languages[0].clone();
        }
    }

    pub fn set_ads_loaded(&mut self, interstitial: bool, rewarded: bool) {
        self.interstitial_ads_loaded = interstitial;
        self.rewarded_ads_loaded = rewarded;
    }

    pub fn interstitial_ads_loaded(&self) -> bool {
        self.interstitial_ads_loaded
    }

    pub fn rewarded_ads_loaded(&self) -> bool {
        self.rewarded_ads_loaded
    }

    pub fn permanent_variable(&self, id: usize) -> i64 {
        self.permanent.variables.get(id).copied().unwrap_or(0)
    }

    pub fn request_unlock_achievement(&mut self, achievement_id: i32) -> RequestId {
        let id = self.generate_request_id();
        self.requester
            .unlock_achievement(&self.responder, id, achievement_id);
        id
    }

    pub fn request_save_progress(&mut self, id: RequestId, data: &[u8]) {
        self.progress = Some(data.to_vec());
        self.requester.save_progress(&self.responder, id, data);
    }

    /// Answers a request locally when it never reached the platform.
    pub fn fail_request(&self, id: RequestId, kind: RequestKind) {
        self.responder.respond(id, kind, false, Vec::new());
    }

    /// Stores a permanent variable and writes the whole permanent block.
    pub fn request_save_permanent_variable(
        &mut self,
        permanent_id: usize,
        value: i64,
    ) -> Result<RequestId, PermanentError> {
        if permanent_id >= MAX_PERMANENT_VARIABLES {
            return Err(PermanentError::OutOfRange(permanent_id));
        }
        if self.permanent.variables.len() <= permanent_id {
            self.permanent.variables.resize(permanent_id + 1, 0);
        }
        self.permanent.variables[permanent_id] = value;
        let bytes = encode_payload(PayloadKind::Permanent, &self.permanent)?;
        let id = self.generate_request_id();
        self.requester.save_permanent(&self.responder, id, &bytes);
        Ok(id)
    }

    pub fn request_purchase(&mut self, product_key: &str) -> RequestId {
        let id = self.generate_request_id();
        self.requester.purchase(&self.responder, id, product_key);
        id
    }

    pub fn request_restore_purchases(&mut self) -> RequestId {
        let id = self.generate_request_id();
        self.requester.restore_purchases(&self.responder, id);
        id
    }

    pub fn request_show_shop(&mut self, catalog: &str) -> RequestId {
        let id = self.generate_request_id();
        self.requester.show_shop(&self.responder, id, catalog);
        id
    }

    pub fn request_interstitial_ads(&mut self, force: bool) -> RequestId {
        let id = self.generate_request_id();
        self.requester.interstitial_ads(&self.responder, id, force);
        id
    }

    pub fn request_rewarded_ads(&mut self, force: bool) -> RequestId {
        let id = self.generate_request_id();
        self.requester.rewarded_ads(&self.responder, id, force);
        id
    }

    pub fn request_open_link(&mut self, kind: &str, data: &str) -> RequestId {
        let id = self.generate_request_id();
        self.requester.open_link(&self.responder, id, kind, data);
        id
    }

    pub fn request_share_image(&mut self, title: &str, message: &str, image: &[u8]) -> RequestId {
        let id = self.generate_request_id();
        self.requester
            .share_image(&self.responder, id, title, message, image);
        id
    }

    pub fn request_change_language(&mut self, language: &str) -> RequestId {
        let id = self.generate_request_id();
        self.requester.change_language(&self.responder, id, language);
        id
    }

    pub fn request_iap_prices(&mut self) -> RequestId {
        let keys: Vec<String> = self
            .game
            .iap_products
            .iter()
            .map(|product| product.key.clone())
            .collect();
        let id = self.generate_request_id();
        self.requester.iap_prices(&self.responder, id, &keys);
        id
    }

    pub fn request_terminate_game(&mut self) {
        self.requester.terminate_game();
    }

    pub fn request_send_analytics(&mut self, event: &str, value: &str) {
        self.requester.send_analytics(event, value);
    }
}
