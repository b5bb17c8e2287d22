//! Popfolio Core Panel Engine
//!
//! Platform-agnostic behavior engine for a desktop of toggleable "app
//! window" panels. This crate implements the panel-open pipeline:
//! - Panels open at randomized offsets, clamped inside a viewport margin
//! - Simultaneous open requests are staggered one at a time (FIFO) with a
//!   fixed settle delay between entrances
//! - Any interaction raises a panel above all others via a monotonic
//!   stack-order counter
//!
//! The engine computes values; it never touches a rendering surface. A host
//! applies the resulting `position-left` / `position-top` / `stack-order`
//! outputs however it renders panels.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a panel.
/// Assigned by the host at startup, one per declared panel.
pub type PanelId = u64;

/// Unique identifier for a panel's toggle control.
pub type ControlId = u64;

/// Viewport width below which panels use the host's fixed (bottom-sheet)
/// layout instead of randomized placement.
pub const NARROW_BREAKPOINT_PX: i32 = 768;

/// Margin reserved on every viewport edge, in percent of the viewport.
pub const EDGE_MARGIN_PCT: f64 = 5.0;

/// Stack-order counter seed, above the host's static stacking contexts.
/// The first raised panel gets `STACK_ORDER_BASE + 1`.
pub const STACK_ORDER_BASE: i32 = 100;

/// Settle delay between staggered opens on wide viewports, in milliseconds.
/// Must exceed the host styling's entrance-transition duration.
pub const OPEN_SETTLE_WIDE_MS: u64 = 250;

/// Settle delay between staggered opens on narrow viewports, in milliseconds.
pub const OPEN_SETTLE_NARROW_MS: u64 = 500;

/// Errors that can occur while wiring controls to panels.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Control {0} is already bound to a panel")]
    DuplicateControl(ControlId),

    #[error("Panel {0} is already bound to a control")]
    DuplicatePanel(PanelId),
}

/// The visible host area, in pixels. Read fresh whenever placement or the
/// settle-delay policy needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    /// Create a new viewport.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether the viewport is below the fixed-layout breakpoint.
    pub fn is_narrow(&self) -> bool {
        self.width < NARROW_BREAKPOINT_PX
    }
}

/// A panel's rendered size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width: i32,
    pub height: i32,
}

impl PanelSize {
    /// Create a new panel size.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A computed entrance offset, in percent of viewport width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left_pct: f64,
    pub top_pct: f64,
}

/// One toggleable panel. Placement and stack order stay unset until the
/// panel's first open sequence runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Panel {
    /// Mirrors the panel's toggle-control state.
    pub open: bool,
    /// Last applied entrance offset, if any.
    pub placement: Option<Placement>,
    /// Last applied stack order, if any.
    pub stack_order: Option<i32>,
}

/// Round to 2 decimal places. Percent offsets are applied on every open;
/// sub-hundredth noise would just thrash the host layout.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute a random, clamped entrance offset for a panel.
///
/// Each axis is drawn uniformly from `[5, 95 - size_pct]`, where `size_pct`
/// is the panel's size as a percent of the viewport on that axis. A panel
/// larger than the usable area collapses the range to the margin itself; the
/// panel will overflow visually, but the offset never leaves `[5, 95]`.
///
/// Returns `None` on narrow viewports, where the host's fixed layout applies
/// and no offset should be written.
pub fn randomize_placement(
    size: PanelSize,
    viewport: Viewport,
    rng: &mut impl Rng,
) -> Option<Placement> {
    if viewport.is_narrow() {
        return None;
    }

    let width_pct = f64::from(size.width) / f64::from(viewport.width) * 100.0;
    let height_pct = f64::from(size.height) / f64::from(viewport.height) * 100.0;

    // A nonsensical (negative) size would push the bound past the far
    // margin, so clamp both ends of the band.
    let left_max =
        (100.0 - EDGE_MARGIN_PCT - width_pct).clamp(EDGE_MARGIN_PCT, 100.0 - EDGE_MARGIN_PCT);
    let top_max =
        (100.0 - EDGE_MARGIN_PCT - height_pct).clamp(EDGE_MARGIN_PCT, 100.0 - EDGE_MARGIN_PCT);

    Some(Placement {
        left_pct: round2(rng.gen_range(EDGE_MARGIN_PCT..=left_max)),
        top_pct: round2(rng.gen_range(EDGE_MARGIN_PCT..=top_max)),
    })
}

/// Settle delay before the next queued panel may open.
///
/// Narrow viewports use the longer delay because the host's bottom-sheet
/// entrance transition is slower there.
pub fn open_settle_delay(viewport: Viewport) -> Duration {
    if viewport.is_narrow() {
        Duration::from_millis(OPEN_SETTLE_NARROW_MS)
    } else {
        Duration::from_millis(OPEN_SETTLE_WIDE_MS)
    }
}

/// Monotonic stack-order assignment.
///
/// Every raise strictly increases the shared counter, so the most recently
/// raised panel always holds the maximum order and renders on top. Raising
/// never fails. Single-writer by construction here; a parallel port would
/// need an atomic counter.
#[derive(Debug, Clone)]
pub struct ZStack {
    next: i32,
    levels: HashMap<PanelId, i32>,
    top: Option<PanelId>,
}

impl Default for ZStack {
    fn default() -> Self {
        Self {
            next: STACK_ORDER_BASE,
            levels: HashMap::new(),
            top: None,
        }
    }
}

impl ZStack {
    /// Create a stack with the counter at its base seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring a panel above every previously raised panel.
    /// Returns the stack order assigned to it.
    pub fn raise(&mut self, panel: PanelId) -> i32 {
        self.next += 1;
        self.levels.insert(panel, self.next);
        self.top = Some(panel);
        self.next
    }

    /// The most recently raised panel, if any has been raised.
    pub fn top(&self) -> Option<PanelId> {
        self.top
    }

    /// The stack order last assigned to a panel.
    pub fn level(&self, panel: PanelId) -> Option<i32> {
        self.levels.get(&panel).copied()
    }
}

/// FIFO queue that serializes panel entrances.
///
/// At most one open sequence is in flight at a time: `enqueue`/`advance`
/// yield the next panel to open only while the animating flag is clear, and
/// `settle` (the timer continuation) clears the flag before chaining the
/// next panel with no extra delay.
///
/// The queue does not deduplicate: a control toggled active twice before its
/// first open settles enqueues the panel twice, matching the activation
/// contract. An in-flight open is never cancelled, even if the panel closes
/// mid-sequence.
#[derive(Debug, Clone, Default)]
pub struct OpenQueue {
    queue: VecDeque<PanelId>,
    animating: bool,
}

impl OpenQueue {
    /// Create an empty, idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a panel and attempt to start its open sequence.
    ///
    /// Returns the panel now entering its open sequence, if the queue was
    /// idle. The caller applies placement and stack order for that panel,
    /// then schedules a `settle` after [`open_settle_delay`].
    pub fn enqueue(&mut self, panel: PanelId) -> Option<PanelId> {
        self.queue.push_back(panel);
        self.advance()
    }

    /// Start the next open sequence if one can start.
    ///
    /// No-op while an open is in flight or the queue is empty; calling this
    /// when idle and empty mutates nothing.
    pub fn advance(&mut self) -> Option<PanelId> {
        if self.animating {
            return None;
        }
        let panel = self.queue.pop_front()?;
        self.animating = true;
        Some(panel)
    }

    /// Timer-expiry continuation: mark the in-flight open as settled, then
    /// immediately advance to the next queued panel, if any.
    pub fn settle(&mut self) -> Option<PanelId> {
        self.animating = false;
        self.advance()
    }

    /// Whether an open sequence is currently in flight.
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Number of panels still waiting to open.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no panels are waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Wires toggle controls to panels and owns the panel records.
///
/// The control→panel association is an explicit map built once at startup,
/// rather than being derived from host markup structure. The binder is the
/// only writer of panel state; the queue and z-stack deal purely in ids.
///
/// Lookups for ids the binder does not know are silent no-ops: a settle
/// timer outlives any guarantee that its panel still exists.
#[derive(Debug, Default)]
pub struct Binder {
    controls: HashMap<ControlId, PanelId>,
    panels: HashMap<PanelId, Panel>,
}

impl Binder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a control with a panel, creating the panel record.
    /// Each control and each panel may be bound exactly once.
    pub fn bind(&mut self, control: ControlId, panel: PanelId) -> Result<(), BindError> {
        if self.controls.contains_key(&control) {
            return Err(BindError::DuplicateControl(control));
        }
        if self.panels.contains_key(&panel) {
            return Err(BindError::DuplicatePanel(panel));
        }
        self.controls.insert(control, panel);
        self.panels.insert(panel, Panel::default());
        Ok(())
    }

    /// Route a control state change.
    ///
    /// Mirrors the new state onto the bound panel and returns the panel to
    /// enqueue only on the closed-to-open edge. A redundant active delivery
    /// is not an edge and never yields a panel; deactivation closes
    /// immediately and unanimated. Unknown controls are ignored.
    pub fn control_toggled(&mut self, control: ControlId, active: bool) -> Option<PanelId> {
        let panel_id = *self.controls.get(&control)?;
        let panel = self.panels.get_mut(&panel_id)?;
        let was_open = panel.open;
        panel.open = active;
        (active && !was_open).then_some(panel_id)
    }

    /// Route a direct interaction with a panel's surface.
    ///
    /// Returns the panel to raise, bypassing the open queue — the panel is
    /// already positioned. Unknown panels are ignored.
    pub fn surface_pressed(&self, panel: PanelId) -> Option<PanelId> {
        self.panels.contains_key(&panel).then_some(panel)
    }

    /// Record an applied entrance offset onto a panel.
    pub fn apply_placement(&mut self, panel: PanelId, placement: Placement) {
        if let Some(p) = self.panels.get_mut(&panel) {
            p.placement = Some(placement);
        }
    }

    /// Record an applied stack order onto a panel.
    pub fn apply_stack_order(&mut self, panel: PanelId, stack_order: i32) {
        if let Some(p) = self.panels.get_mut(&panel) {
            p.stack_order = Some(stack_order);
        }
    }

    /// Look up a panel record.
    pub fn panel(&self, panel: PanelId) -> Option<&Panel> {
        self.panels.get(&panel)
    }

    /// The panel bound to a control.
    pub fn panel_for(&self, control: ControlId) -> Option<PanelId> {
        self.controls.get(&control).copied()
    }

    /// All bound panel ids, in no particular order.
    pub fn panel_ids(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.panels.keys().copied()
    }

    /// Number of bound panels.
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    /// Whether no panels are bound.
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

/// Page theme. Defaults to light on every load; nothing persists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The opposite theme.
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Theme for a toggle-control state (checked means dark).
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// The attribute value the host writes for this theme.
    pub fn as_attr(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Checkbox state that mirrors this theme.
    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

/// Whether the decorative icon is shown. Derived from the theme, never
/// stored: the icon accompanies dark mode only.
pub fn icon_visible(theme: Theme) -> bool {
    theme.is_dark()
}
