use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EntityId;
use platforms_status::StreamInfo;

/// An entity went live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveNotification {
    pub entity_id: EntityId,
    pub display_name: String,
    pub info: StreamInfo,
    pub timestamp: DateTime<Utc>,
}

impl LiveNotification {
    pub fn new(entity_id: EntityId, display_name: impl Into<String>, info: StreamInfo) -> Self {
        Self {
            entity_id,
            display_name: display_name.into(),
            info,
            timestamp: Utc::now(),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "{} is live on {}",
            self.display_name,
            self.info.platform.display_name()
        )
    }

    pub fn body(&self) -> String {
        match &self.info.category {
            Some(category) => format!("{} ({})", self.info.title, category),
            None => self.info.title.clone(),
        }
    }
}
