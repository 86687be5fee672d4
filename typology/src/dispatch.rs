use async_trait::async_trait;
use common::config::ChannelConfig;
use std::collections::HashMap;
use url::Url;

use crate::{
    error::TypologyError,
    model::{GenericError, ResultPayload},
};

/// Delivers result payloads downstream.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends `payload` to every named channel, or to the default channel when
    /// `channels` is empty.
    async fn send(&self, payload: ResultPayload, channels: Vec<String>) -> Result<(), GenericError>;
}

/// Posts payloads as JSON to per-channel HTTP endpoints.
pub struct HttpDispatcher {
    client: reqwest::Client,
    default_url: Url,
    channel_urls: HashMap<String, Url>,
}

impl HttpDispatcher {
    pub fn new(config: &ChannelConfig) -> Result<Self, TypologyError> {
        let parse = |name: &str, raw: &str| {
            Url::parse(raw)
                .map_err(|e| TypologyError::Config(format!("invalid url for channel {}: {}", name, e)))
        };

        let default_url = parse("default", &config.default_url)?;
        let mut channel_urls = HashMap::new();
        channel_urls.insert(
            config.interdiction_name.clone(),
            parse(&config.interdiction_name, &config.interdiction_url)?,
        );

        Ok(Self {
            client: reqwest::Client::new(),
            default_url,
            channel_urls,
        })
    }

    fn resolve(&self, channels: &[String]) -> Result<Vec<Url>, TypologyError> {
        if channels.is_empty() {
            return Ok(vec![self.default_url.clone()]);
        }

        channels
            .iter()
            .map(|channel| {
                self.channel_urls
                    .get(channel)
                    .cloned()
                    .ok_or_else(|| TypologyError::Dispatch(format!("unknown channel {}", channel)))
            })
            .collect()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn send(&self, payload: ResultPayload, channels: Vec<String>) -> Result<(), GenericError> {
        for url in self.resolve(&channels)? {
            tracing::trace!(%url, typology = %payload.typology_result.cfg, "Posting typology result");
            self.client
                .post(url)
                .json(&payload)
                .send()
                .await?
                .error_for_status()?;
        }
        Ok(())
    }
}
