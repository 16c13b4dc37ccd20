//! Page configuration handed over by the server-rendered order page.
//!
//! ```html
//! <div id="reception-app" data-bon-id="42" data-bon-number="PO-2024-0042"></div>
//! <script id="reception-lines" type="application/json">[...]</script>
//! ```

use contracts::usecases::u508_record_reception::ReceptionLine;
use thiserror::Error;

pub const MOUNT_ELEMENT_ID: &str = "reception-app";
pub const LINES_SCRIPT_ID: &str = "reception-lines";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Element #{0} not found")]
    MissingElement(&'static str),

    #[error("Attribute {0} is missing or empty")]
    MissingAttribute(&'static str),

    #[error("Invalid line list: {0}")]
    InvalidLines(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceptionPageConfig {
    pub bon_id: String,
    pub bon_number: String,
    pub lines: Vec<ReceptionLine>,
}

impl ReceptionPageConfig {
    /// Read the mount element attributes and the embedded line list
    pub fn from_document() -> Result<Self, ConfigError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(ConfigError::MissingElement(MOUNT_ELEMENT_ID))?;

        let mount = document
            .get_element_by_id(MOUNT_ELEMENT_ID)
            .ok_or(ConfigError::MissingElement(MOUNT_ELEMENT_ID))?;
        let lines_json = document
            .get_element_by_id(LINES_SCRIPT_ID)
            .and_then(|script| script.text_content())
            .ok_or(ConfigError::MissingElement(LINES_SCRIPT_ID))?;

        Self::from_parts(
            mount.get_attribute("data-bon-id"),
            mount.get_attribute("data-bon-number"),
            &lines_json,
        )
    }

    pub fn from_parts(
        bon_id: Option<String>,
        bon_number: Option<String>,
        lines_json: &str,
    ) -> Result<Self, ConfigError> {
        let bon_id = non_empty(bon_id).ok_or(ConfigError::MissingAttribute("data-bon-id"))?;
        let bon_number =
            non_empty(bon_number).ok_or(ConfigError::MissingAttribute("data-bon-number"))?;

        let lines = if lines_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<ReceptionLine>>(lines_json)
                .map_err(|e| ConfigError::InvalidLines(e.to_string()))?
        };

        Ok(Self {
            bon_id,
            bon_number,
            lines,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
