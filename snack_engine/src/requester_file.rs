//! Desktop requester: saves go to files, purchases always succeed and are
//! remembered in a JSON list, ads and links are only logged.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::requester::{RequestId, RequestKind, Requester, Responder};

#[derive(Debug, Serialize, Deserialize)]
struct LanguageFile {
    language: String,
}

#[derive(Debug, Clone)]
pub struct FileRequester {
    save_path: PathBuf,
    permanent_path: PathBuf,
    purchases_path: PathBuf,
    language_path: PathBuf,
    prices_path: Option<PathBuf>,
}

impl FileRequester {
    /// The permanent-data file sits next to the save as `permanent.msgpack`.
    pub fn new(save_path: PathBuf, purchases_path: PathBuf, language_path: PathBuf) -> Self {
        let permanent_path = save_path.with_file_name("permanent.msgpack");
        Self {
            save_path,
            permanent_path,
            purchases_path,
            language_path,
            prices_path: None,
        }
    }

    /// Answers price lookups from a JSON object of product key to price.
    pub fn with_prices(mut self, prices_path: PathBuf) -> Self {
        self.prices_path = Some(prices_path);
        self
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn permanent_path(&self) -> &Path {
        &self.permanent_path
    }

    /// Bytes of the last progress save, if any.
    pub fn load_progress(&self) -> Result<Option<Vec<u8>>, EngineError> {
        read_optional(&self.save_path)
    }

    pub fn load_permanent(&self) -> Result<Option<Vec<u8>>, EngineError> {
        read_optional(&self.permanent_path)
    }

    pub fn load_purchases(&self) -> Result<Vec<String>, EngineError> {
        match read_optional(&self.purchases_path)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| EngineError::Json {
                path: self.purchases_path.clone(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_language(&self) -> Result<Option<String>, EngineError> {
        let Some(bytes) = read_optional(&self.language_path)? else {
            return Ok(None);
        };
        let file: LanguageFile =
            serde_json::from_slice(&bytes).map_err(|source| EngineError::Json {
                path: self.language_path.clone(),
                source,
            })?;
        Ok(Some(file.language))
    }

    /// Prices from the prices file; products it does not list get "".
    fn load_prices(&self, product_keys: &[String]) -> Result<BTreeMap<String, String>, EngineError> {
        let mut known: BTreeMap<String, String> = BTreeMap::new();
        if let Some(path) = self.prices_path.as_ref() {
            if let Some(bytes) = read_optional(path)? {
                known = serde_json::from_slice(&bytes).map_err(|source| EngineError::Json {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        Ok(product_keys
            .iter()
            .map(|key| (key.clone(), known.get(key).cloned().unwrap_or_default()))
            .collect())
    }

    fn write(path: &Path, data: &[u8]) -> bool {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = fs::create_dir_all(parent) {
                log::warn!("creating {}: {err}", parent.display());
                return false;
            }
        }
        match fs::write(path, data) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("writing {}: {err}", path.display());
                false
            }
        }
    }

    /// Adds `product_key` to the purchases file and returns the full list.
    fn record_purchase(&self, product_key: &str) -> Option<Vec<String>> {
        let mut purchases = match self.load_purchases() {
            Ok(purchases) => purchases,
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        };
        if !purchases.iter().any(|key| key == product_key) {
            purchases.push(product_key.to_string());
            let json = serde_json::to_vec(&purchases).ok()?;
            if !Self::write(&self.purchases_path, &json) {
                return None;
            }
        }
        Some(purchases)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, EngineError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(EngineError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl Requester for FileRequester {
    fn unlock_achievement(&mut self, responder: &Responder, id: RequestId, achievement_id: i32) {
        log::info!("request unlock achievement #{id}: achievement {achievement_id}");
        responder.succeed(id, RequestKind::UnlockAchievement);
    }

    fn save_progress(&mut self, responder: &Responder, id: RequestId, data: &[u8]) {
        log::info!("request save progress #{id} to {}", self.save_path.display());
        let ok = Self::write(&self.save_path, data);
        responder.respond(id, RequestKind::SaveProgress, ok, Vec::new());
    }

    fn save_permanent(&mut self, responder: &Responder, id: RequestId, data: &[u8]) {
        log::info!("request save permanent #{id} to {}", self.permanent_path.display());
        let ok = Self::write(&self.permanent_path, data);
        responder.respond(id, RequestKind::SavePermanent, ok, Vec::new());
    }

    fn purchase(&mut self, responder: &Responder, id: RequestId, product_key: &str) {
        log::info!("request purchase #{id}: {product_key}");
        match self.record_purchase(product_key) {
            Some(purchases) => {
                let data = serde_json::to_vec(&purchases).unwrap_or_default();
                responder.respond(id, RequestKind::Purchase, true, data);
            }
            None => responder.respond(id, RequestKind::Purchase, false, Vec::new()),
        }
    }

    fn restore_purchases(&mut self, responder: &Responder, id: RequestId) {
        log::info!("request restore purchases #{id}");
        self.restore_purchases_as(responder, id, RequestKind::RestorePurchases);
    }

    fn show_shop(&mut self, responder: &Responder, id: RequestId, catalog: &str) {
        log::info!("request show shop #{id}: {catalog}");
        self.restore_purchases_as(responder, id, RequestKind::ShowShop);
    }

    fn interstitial_ads(&mut self, responder: &Responder, id: RequestId, force: bool) {
        log::info!("request interstitial ads #{id} (force: {force})");
        responder.succeed(id, RequestKind::InterstitialAds);
    }

    fn rewarded_ads(&mut self, responder: &Responder, id: RequestId, force: bool) {
        log::info!("request rewarded ads #{id} (force: {force})");
        responder.succeed(id, RequestKind::RewardedAds);
    }

    fn open_link(&mut self, responder: &Responder, id: RequestId, kind: &str, data: &str) {
        log::info!("request open link #{id}: {kind} {data}");
        responder.succeed(id, RequestKind::OpenLink);
    }

    fn share_image(
        &mut self,
        responder: &Responder,
        id: RequestId,
        title: &str,
        message: &str,
        image: &[u8],
    ) {
        log::info!(
            "request share image #{id}: {title} / {message} ({} bytes)",
            image.len()
        );
        responder.succeed(id, RequestKind::ShareImage);
    }

    fn change_language(&mut self, responder: &Responder, id: RequestId, language: &str) {
        log::info!("request change language #{id}: {language}");
        let file = LanguageFile {
            language: language.to_string(),
        };
        let ok = serde_json::to_vec(&file)
            .map(|json| Self::write(&self.language_path, &json))
            .unwrap_or(false);
        responder.respond(
            id,
            RequestKind::ChangeLanguage,
            ok,
            language.as_bytes().to_vec(),
        );
    }

    fn iap_prices(&mut self, responder: &Responder, id: RequestId, product_keys: &[String]) {
        log::info!("request iap prices #{id} for {} products", product_keys.len());
        match self.load_prices(product_keys) {
            Ok(prices) => {
                let data = serde_json::to_vec(&prices).unwrap_or_default();
                responder.respond(id, RequestKind::IapPrices, true, data);
            }
            Err(err) => {
                log::warn!("{err}");
                responder.respond(id, RequestKind::IapPrices, false, Vec::new());
            }
        }
    }

    fn terminate_game(&mut self) {
        log::info!("request terminate game");
    }

    fn send_analytics(&mut self, event: &str, value: &str) {
        log::info!("request send analytics: {event} {value}");
    }
}

impl FileRequester {
    fn restore_purchases_as(&self, responder: &Responder, id: RequestId, kind: RequestKind) {
        match self.load_purchases() {
            Ok(purchases) => {
                let data = serde_json::to_vec(&purchases).unwrap_or_default();
                responder.respond(id, kind, true, data);
            }
            Err(err) => {
                log::warn!("{err}");
                responder.respond(id, kind, false, Vec::new());
            }
        }
    }
}
