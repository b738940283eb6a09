use std::collections::HashMap;
use std::sync::RwLock;

use super::dingtalk::DingtalkChannel;
use super::{PushChannel, PushError};

type ChannelFactory = Box<dyn Fn() -> Box<dyn PushChannel> + Send + Sync>;

/// Maps a channel-type tag to a constructor for that channel. Populated once
/// at startup; sweeps resolve from it concurrently.
pub struct ChannelRegistry {
    factories: RwLock<HashMap<String, ChannelFactory>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in channels preregistered. The HTTP client is
    /// shared across every channel instance the factories hand out.
    pub fn with_builtin(http_client: reqwest::Client) -> Self {
        let registry = Self::new();
        registry.register("dingtalk", move || {
            Box::new(DingtalkChannel::new(http_client.clone()))
        });
        registry
    }

    /// Associates a channel type with a factory, replacing any prior
    /// registration for the same tag.
    pub fn register<F>(&self, channel_type: &str, factory: F)
    where
        F: Fn() -> Box<dyn PushChannel> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap()
            .insert(channel_type.to_string(), Box::new(factory));
    }

    /// Returns a fresh channel instance for the given type.
    pub fn resolve(&self, channel_type: &str) -> std::result::Result<Box<dyn PushChannel>, PushError> {
        let factories = self.factories.read().unwrap();
        match factories.get(channel_type) {
            Some(factory) => Ok(factory()),
            None => Err(PushError::UnknownChannelType(channel_type.to_string())),
        }
    }
}
