//! [`MushafApi`] over the QUL Mushaf REST service.

use async_trait::async_trait;
use mushaf_core::{
    ApiConfig, AyahAudio, AyahLocation, AyahNumber, CoreError, Layout, LayoutId, LayoutsResponse,
    MushafApi, Page, PageNumber, RecitationId, SearchQuery, SearchResponse, SurahNamesResponse,
    SurahNumber, WordAudio, WordId,
};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "mushaf::qul";

const USER_AGENT: &str = concat!(
    "mushaf-reader/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/kvnxiao/mushaf-reader)"
);

/// HTTP client for the QUL Mushaf service
pub struct QulClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl QulClient {
    /// Create a client from the `[api]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        let base_url = normalize_base_url(&config.base_url)?;

        let base_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        // Transient failures (connect errors, 5xx) only; 404 is an answer
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        info!(target: LOG_TARGET, "QUL client targeting {}", base_url);
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `url` and decode the body. A 404 becomes `not_found`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        not_found: CoreError,
    ) -> Result<T, CoreError> {
        debug!(target: LOG_TARGET, "GET {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url, not_found));
        }
        let body = response.bytes().await?;
        decode(&url, &body)
    }
}

/// Validate the configured base URL and strip any trailing slash.
fn normalize_base_url(base_url: &str) -> Result<String, CoreError> {
    let parsed = url::Url::parse(base_url).map_err(|e| CoreError::ConfigInvalid {
        message: format!("api.base_url {base_url:?}: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::ConfigInvalid {
            message: format!("api.base_url must be http or https, got {}", parsed.scheme()),
        });
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

fn status_error(status: StatusCode, url: String, not_found: CoreError) -> CoreError {
    if status == StatusCode::NOT_FOUND {
        debug!(target: LOG_TARGET, "{} returned 404", url);
        not_found
    } else {
        warn!(target: LOG_TARGET, "{} returned status {}", url, status);
        CoreError::HttpStatus {
            url,
            status: status.as_u16(),
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, CoreError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(target: LOG_TARGET, "Undecodable response from {}: {}", url, e);
        CoreError::MalformedResponse {
            reason: format!("{url}: {e}"),
        }
    })
}

// URL builders

fn layouts_url(base: &str) -> String {
    format!("{base}/qul/layouts")
}

fn page_url(base: &str, page_number: PageNumber) -> String {
    format!("{base}/qul/page/{page_number}")
}

fn surah_names_url(base: &str) -> String {
    format!("{base}/qul/surah-names")
}

fn search_url(base: &str, text: &str, limit: usize) -> String {
    format!(
        "{base}/qul/search?q={}&limit={limit}",
        urlencoding::encode(text)
    )
}

fn ayah_page_url(
    base: &str,
    surah: SurahNumber,
    ayah: AyahNumber,
    layout_id: LayoutId,
) -> String {
    format!("{base}/mushaf/surah/{surah}/ayah/{ayah}/page?layout_id={layout_id}")
}

fn ayah_audio_url(
    base: &str,
    surah: SurahNumber,
    ayah: AyahNumber,
    recitation_id: RecitationId,
) -> String {
    format!("{base}/audio/ayah/{surah}/{ayah}/recitation/{recitation_id}")
}

fn word_audio_url(base: &str, word_id: WordId, recitation_id: RecitationId) -> String {
    format!("{base}/audio/word/{word_id}/recitation/{recitation_id}")
}

#[async_trait]
impl MushafApi for QulClient {
    fn name(&self) -> &'static str {
        "qul"
    }

    async fn layouts(&self) -> Result<Vec<Layout>, CoreError> {
        let response: LayoutsResponse = self
            .get_json(
                layouts_url(&self.base_url),
                CoreError::MalformedResponse {
                    reason: "layouts endpoint not found".into(),
                },
            )
            .await?;
        info!(target: LOG_TARGET, "Service offers {} layout(s)", response.layouts.len());
        Ok(response.layouts)
    }

    async fn page(&self, page_number: PageNumber) -> Result<Page, CoreError> {
        self.get_json(
            page_url(&self.base_url, page_number),
            CoreError::PageNotFound { page: page_number },
        )
        .await
    }

    async fn surah_names(&self) -> Result<SurahNamesResponse, CoreError> {
        self.get_json(
            surah_names_url(&self.base_url),
            CoreError::MalformedResponse {
                reason: "surah-names endpoint not found".into(),
            },
        )
        .await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CoreError> {
        let text = query.trimmed().unwrap_or_default();
        let response: SearchResponse = self
            .get_json(
                search_url(&self.base_url, text, query.limit),
                CoreError::MalformedResponse {
                    reason: "search endpoint not found".into(),
                },
            )
            .await?;
        debug!(
            target: LOG_TARGET,
            "Search {:?} returned {} result(s)", text, response.results_count
        );
        Ok(response)
    }

    async fn ayah_page(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        layout_id: LayoutId,
    ) -> Result<AyahLocation, CoreError> {
        self.get_json(
            ayah_page_url(&self.base_url, surah, ayah, layout_id),
            CoreError::AyahNotFound {
                surah,
                ayah,
                layout_id,
            },
        )
        .await
    }

    async fn ayah_audio(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        recitation_id: RecitationId,
    ) -> Result<AyahAudio, CoreError> {
        let audio: AyahAudio = self
            .get_json(
                ayah_audio_url(&self.base_url, surah, ayah, recitation_id),
                CoreError::TimingUnavailable {
                    surah,
                    ayah,
                    recitation_id,
                },
            )
            .await?;
        if audio.word_timings.is_empty() || audio.audio_url.is_empty() {
            return Err(CoreError::TimingUnavailable {
                surah,
                ayah,
                recitation_id,
            });
        }
        Ok(audio)
    }

    async fn word_audio(
        &self,
        word_id: WordId,
        recitation_id: RecitationId,
    ) -> Result<WordAudio, CoreError> {
        let audio: WordAudio = self
            .get_json(
                word_audio_url(&self.base_url, word_id, recitation_id),
                CoreError::WordAudioUnavailable {
                    word_id,
                    recitation_id,
                },
            )
            .await?;
        if audio.audio_url.is_empty() || audio.end_time <= audio.start_time {
            return Err(CoreError::WordAudioUnavailable {
                word_id,
                recitation_id,
            });
        }
        Ok(audio)
    }
}
