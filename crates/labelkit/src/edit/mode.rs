use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::event::Cursor;

/// A distinct vertex of a live chain: `chain` indexes the session's chain
/// list, `index` the chain's vertices (never the closing point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRef {
    pub chain: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "mode", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EditMode {
    #[default]
    Normal,
    SplitPickFirst,
    SplitPickSecond {
        anchor: VertexRef,
        cursor: Cursor,
    },
}

impl EditMode {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_splitting(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(EditMode::Normal.name(), "normal");
        assert_eq!(EditMode::SplitPickFirst.name(), "split-pick-first");
        let second = EditMode::SplitPickSecond {
            anchor: VertexRef { chain: 0, index: 3 },
            cursor: Cursor::default(),
        };
        assert_eq!(second.name(), "split-pick-second");
        assert!(second.is_splitting());
    }
}
