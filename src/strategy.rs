use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

use crate::normalize::segments_from_xml;
use crate::resolver::Strategy;
use crate::youtube::{YoutubeClient, find_caption_tracks};
use crate::{ResolutionMethod, Segment, VideoId};

/// Client identities rotated across direct timed-text attempts
const DESKTOP_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

/// Caption track chosen by language preference; an empty list means "whatever comes first"
pub struct CaptionStrategy {
    client: Arc<YoutubeClient>,
    method: ResolutionMethod,
    languages: Vec<String>,
}

impl CaptionStrategy {
    pub fn new(client: Arc<YoutubeClient>, method: ResolutionMethod, languages: Vec<String>) -> Self {
        Self {
            client,
            method,
            languages,
        }
    }
}

#[async_trait]
impl Strategy for CaptionStrategy {
    fn method(&self) -> ResolutionMethod {
        self.method
    }

    async fn attempt(&self, video_id: &VideoId) -> Result<Vec<Segment>> {
        self.client.fetch_captions(video_id, &self.languages).await
    }
}

/// Direct fetch of the timed-text endpoints, every user agent x host x language
pub struct TimedTextStrategy {
    client: Arc<YoutubeClient>,
    languages: Vec<String>,
}

impl TimedTextStrategy {
    pub fn new(client: Arc<YoutubeClient>, languages: Vec<String>) -> Self {
        Self { client, languages }
    }
}

#[async_trait]
impl Strategy for TimedTextStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::DirectFetch
    }

    async fn attempt(&self, video_id: &VideoId) -> Result<Vec<Segment>> {
        let mut attempts = 0;
        let mut last_error = None;

        for user_agent in DESKTOP_USER_AGENTS {
            for host in self.client.timedtext_hosts() {
                for lang in &self.languages {
                    attempts += 1;
                    match self.client.fetch_timed_text(host, lang, video_id, user_agent).await {
                        Ok(body) => {
                            let segments = segments_from_xml(&body);
                            if !segments.is_empty() {
                                return Ok(segments);
                            }
                            debug!("Timed text from {host} ({lang}) had no usable segments");
                        }
                        Err(e) => {
                            debug!("Timed-text attempt failed for {host} ({lang}): {e}");
                            last_error = Some(e);
                        }
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(e.wrap_err(format!("no timed-text track after {attempts} attempts"))),
            None => bail!("no timed-text track after {attempts} attempts"),
        }
    }
}

/// Caption track URL scraped from the mobile watch page
pub struct ScrapeStrategy {
    client: Arc<YoutubeClient>,
}

impl ScrapeStrategy {
    pub fn new(client: Arc<YoutubeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for ScrapeStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::Scraped
    }

    async fn attempt(&self, video_id: &VideoId) -> Result<Vec<Segment>> {
        let page = self.client.fetch_mobile_page(video_id).await?;

        let Some(tracks) = find_caption_tracks(&page) else {
            bail!("no caption tracks found in mobile page");
        };
        let track = &tracks[0];
        debug!("Scraped caption track: lang={}", track.language_code);

        let xml = self.client.fetch_track(track).await?;
        Ok(segments_from_xml(&xml))
    }
}
