use std::sync::LazyLock;
use std::time::Duration;

use eyre::{Result, bail, eyre};
use log::debug;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::{Config, Endpoints};
use crate::normalize::segments_from_xml;
use crate::{Segment, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_7_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Mobile/15E148 Safari/604.1";

/// Patterns locating the caption track list in a watch page, tried in order
static CAPTION_TRACK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""captionTracks":\[([^\]]+)\]"#,
        r#""captions".*?"captionTracks":\[([^\]]+)\]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

/// A caption track descriptor as embedded in player responses and watch pages
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl", default)]
    pub base_url: Option<String>,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
}

impl CaptionTrack {
    /// URL of the track, required only once the track has been chosen
    pub fn url(&self) -> Result<&str> {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => bail!("caption track ({}) has no baseUrl", self.language_code),
        }
    }
}

/// HTTP access to the platform's caption endpoints
pub struct YoutubeClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    scrape_timeout: Duration,
}

impl YoutubeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
            scrape_timeout: Duration::from_secs(config.scrape_timeout_secs),
        })
    }

    pub fn timedtext_hosts(&self) -> &[String] {
        &self.endpoints.timedtext_hosts
    }

    /// Fetch captions via the InnerTube player API.
    ///
    /// `languages` is an ordered preference list; an empty list takes the first track offered.
    pub async fn fetch_captions(&self, video_id: &VideoId, languages: &[String]) -> Result<Vec<Segment>> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch", self.endpoints.www);
        debug!("Fetching watch page: {watch_url}?v={video_id}");

        let resp = self
            .http
            .get(&watch_url)
            .query(&[("v", video_id.as_str())])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        let page_html = read_body(resp).await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{}/youtubei/v1/player", self.endpoints.www);
        let hl = languages.first().map(String::as_str).unwrap_or("en");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": hl,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id.as_str()
        });

        let resp = self
            .http
            .post(&player_url)
            .query(&[("key", api_key.as_str()), ("prettyPrint", "false")])
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let player: InnerTubePlayerResponse = serde_json::from_str(&read_body(resp).await?)?;

        if let Some(status) = &player.playability_status {
            if status.status != "OK" {
                bail!(
                    "Video unavailable: {}",
                    status.reason.as_deref().unwrap_or(status.status.as_str())
                );
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        if tracks.is_empty() {
            bail!("Transcript is disabled for this video ({video_id})");
        }

        let track = select_track(&tracks, languages)?;
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: Fetch the caption XML
        let caption_xml = self.get_text(track.url()?, USER_AGENT).await?;
        Ok(segments_from_xml(&caption_xml))
    }

    /// Fetch the raw body of one timed-text endpoint
    pub async fn fetch_timed_text(
        &self,
        host: &str,
        lang: &str,
        video_id: &VideoId,
        user_agent: &str,
    ) -> Result<String> {
        debug!("Fetching timed text: {host}?lang={lang}&v={video_id}");

        let resp = self
            .http
            .get(host)
            .query(&[("lang", lang), ("v", video_id.as_str())])
            .header("User-Agent", user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => bail!("HTTP Error 429: Too Many Requests"),
            status => bail!("timed-text endpoint returned {status}"),
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            bail!("timed-text endpoint returned an empty body");
        }
        Ok(body)
    }

    /// Fetch the mobile watch page
    pub async fn fetch_mobile_page(&self, video_id: &VideoId) -> Result<String> {
        let url = format!("{}/watch", self.endpoints.mobile);
        debug!("Fetching mobile page: {url}?v={video_id}");

        let resp = self
            .http
            .get(&url)
            .query(&[("v", video_id.as_str())])
            .header("User-Agent", MOBILE_USER_AGENT)
            .timeout(self.scrape_timeout)
            .send()
            .await?;

        read_body(resp).await
    }

    /// Fetch a caption track by its absolute URL
    pub async fn fetch_track(&self, track: &CaptionTrack) -> Result<String> {
        self.get_text(track.url()?, MOBILE_USER_AGENT).await
    }

    async fn get_text(&self, url: &str, user_agent: &str) -> Result<String> {
        let resp = self.http.get(url).header("User-Agent", user_agent).send().await?;
        read_body(resp).await
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        bail!("HTTP Error 429: Too Many Requests");
    }
    if !status.is_success() {
        bail!("HTTP Error {}", status.as_u16());
    }
    Ok(resp.text().await?)
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

/// First track matching the language preference, in preference order
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Result<&'a CaptionTrack> {
    if languages.is_empty() {
        return tracks.first().ok_or_else(|| eyre!("Transcript is disabled for this video"));
    }

    languages
        .iter()
        .find_map(|lang| tracks.iter().find(|t| &t.language_code == lang))
        .ok_or_else(|| {
            let available: Vec<_> = tracks.iter().map(|t| t.language_code.as_str()).collect();
            eyre!(
                "No transcripts were found for any of the requested language codes: {languages:?} (available: {})",
                available.join(", ")
            )
        })
}

/// Locate the embedded caption track list in a watch page
pub fn find_caption_tracks(html: &str) -> Option<Vec<CaptionTrack>> {
    for re in CAPTION_TRACK_PATTERNS.iter() {
        let Some(caps) = re.captures(html) else {
            continue;
        };
        match serde_json::from_str::<Vec<CaptionTrack>>(&format!("[{}]", &caps[1])) {
            Ok(tracks) if !tracks.is_empty() => return Some(tracks),
            Ok(_) => {}
            Err(e) => debug!("Caption track list did not parse: {e}"),
        }
    }
    None
}
