use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::data_model::new_id;

pub type BlockId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Text,
    Image,
    RecordLink,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::RecordLink => "record-link",
        }
    }
}

/// Block payload, tagged by `type` in the stored page JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    Text {
        #[serde(default = "empty_doc")]
        doc: Value,
    },
    Image {
        #[serde(default)]
        url: String,
        #[serde(default)]
        alt: String,
        #[serde(default)]
        caption: String,
    },
    #[serde(rename_all = "camelCase")]
    RecordLink {
        #[serde(default)]
        record_id: String,
        #[serde(default)]
        record_type: String,
        #[serde(default)]
        title: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
}

/// The rich-text document of an empty text block.
pub fn empty_doc() -> Value {
    json!({"type": "doc", "content": [{"type": "paragraph"}]})
}

impl BlockKind {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Text { .. } => BlockType::Text,
            Self::Image { .. } => BlockType::Image,
            Self::RecordLink { .. } => BlockType::RecordLink,
        }
    }

    /// An empty payload of the given type.
    pub fn empty(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Text => Self::Text { doc: empty_doc() },
            BlockType::Image => Self::Image {
                url: String::new(),
                alt: String::new(),
                caption: String::new(),
            },
            BlockType::RecordLink => Self::RecordLink {
                record_id: String::new(),
                record_type: String::new(),
                title: String::new(),
            },
        }
    }
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self { id: new_id(), kind }
    }

    pub fn fresh(block_type: BlockType) -> Self {
        Self::new(BlockKind::empty(block_type))
    }

    pub fn text() -> Self {
        Self::fresh(BlockType::Text)
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::new(BlockKind::Image {
            url: url.into(),
            alt: alt.into(),
            caption: caption.into(),
        })
    }

    pub fn record_link(
        record_id: impl Into<String>,
        record_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self::new(BlockKind::RecordLink {
            record_id: record_id.into(),
            record_type: record_type.into(),
            title: title.into(),
        })
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    /// Deep copy under a new id.
    pub fn duplicate(&self) -> Self {
        Self::new(self.kind.clone())
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(&self.kind, BlockKind::Text { doc } if *doc == empty_doc())
    }
}
