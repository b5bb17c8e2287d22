//! Surface update protocol.
//!
//! The shell describes every visible change as a line of JSON on stdout. A
//! rendering host consumes the stream and applies each update verbatim; the
//! shell never assumes anything about how panels are drawn.

use popfolio_core_panels::{PanelId, Placement, Theme};
use serde::{Deserialize, Serialize};

/// One visible change the host must apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceUpdate {
    /// A panel's open state changed.
    PanelOpen {
        /// Target panel.
        panel: PanelId,
        /// Whether the panel is now shown.
        open: bool,
    },
    /// A panel received a new entrance offset, in percent of the viewport.
    Position {
        /// Target panel.
        panel: PanelId,
        /// Offset from the left edge.
        left_pct: f64,
        /// Offset from the top edge.
        top_pct: f64,
    },
    /// A panel was raised to a new stacking level.
    StackOrder {
        /// Target panel.
        panel: PanelId,
        /// New stacking level; higher renders on top.
        stack_order: i32,
    },
    /// The page theme changed.
    Theme {
        /// Attribute value to write on the page root ("light" or "dark").
        attr: String,
        /// Whether the decorative icon is shown.
        icon_visible: bool,
    },
}

impl SurfaceUpdate {
    /// Position update from a computed placement.
    pub fn position(panel: PanelId, placement: Placement) -> Self {
        Self::Position {
            panel,
            left_pct: placement.left_pct,
            top_pct: placement.top_pct,
        }
    }

    /// Theme update for the given theme.
    pub fn theme(theme: Theme) -> Self {
        Self::Theme {
            attr: theme.as_attr().to_string(),
            icon_visible: popfolio_core_panels::icon_visible(theme),
        }
    }
}
