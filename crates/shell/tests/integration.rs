//! Integration tests for the Popfolio panel engine.
//!
//! These tests drive the core engine the way the shell event loop does,
//! without timers: settle events are delivered by hand. They verify:
//! - The staggered open pipeline across binder, queue and z-stack
//! - Placement bounds under changing viewports
//! - Stack ordering across interleaved opens and presses

use popfolio_core_panels::{
    icon_visible, open_settle_delay, randomize_placement, Binder, OpenQueue, PanelId, PanelSize,
    Theme, Viewport, ZStack, EDGE_MARGIN_PCT, OPEN_SETTLE_NARROW_MS, OPEN_SETTLE_WIDE_MS,
    STACK_ORDER_BASE,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const WIDE: Viewport = Viewport {
    width: 1440,
    height: 900,
};
const NARROW: Viewport = Viewport {
    width: 600,
    height: 800,
};

/// A minimal stand-in for the shell: wires the engine pieces together and
/// records what would be applied to the surface.
struct Harness {
    binder: Binder,
    queue: OpenQueue,
    zstack: ZStack,
    viewport: Viewport,
    rng: StdRng,
    /// Panels opened so far, in entrance order.
    opened: Vec<PanelId>,
}

impl Harness {
    fn new(panel_count: u64, viewport: Viewport) -> Self {
        let mut binder = Binder::new();
        for id in 1..=panel_count {
            binder.bind(id, id).expect("bind");
        }
        Self {
            binder,
            queue: OpenQueue::new(),
            zstack: ZStack::new(),
            viewport,
            rng: StdRng::seed_from_u64(99),
            opened: Vec::new(),
        }
    }

    fn toggle_open(&mut self, control: u64) {
        if let Some(panel) = self.binder.control_toggled(control, true) {
            if let Some(next) = self.queue.enqueue(panel) {
                self.open(next);
            }
        }
    }

    fn settle(&mut self) -> bool {
        match self.queue.settle() {
            Some(next) => {
                self.open(next);
                true
            }
            None => false,
        }
    }

    fn open(&mut self, panel: PanelId) {
        if let Some(placement) =
            randomize_placement(PanelSize::new(400, 300), self.viewport, &mut self.rng)
        {
            self.binder.apply_placement(panel, placement);
        }
        let order = self.zstack.raise(panel);
        self.binder.apply_stack_order(panel, order);
        self.opened.push(panel);
    }
}

// ============================================================================
// Staggered Open Pipeline
// ============================================================================

/// A burst of opens enters one panel at a time, in request order.
#[test]
fn test_burst_opens_sequentially() {
    let mut h = Harness::new(4, WIDE);

    for control in 1..=4 {
        h.toggle_open(control);
    }

    // Only the first panel opened immediately
    assert_eq!(h.opened, vec![1]);
    assert!(h.queue.is_animating());
    assert_eq!(h.queue.len(), 3);

    // Each settle releases exactly one more
    assert!(h.settle());
    assert_eq!(h.opened, vec![1, 2]);
    assert!(h.settle());
    assert!(h.settle());
    assert_eq!(h.opened, vec![1, 2, 3, 4]);

    // Last settle goes idle
    assert!(!h.settle());
    assert!(!h.queue.is_animating());
}

/// Every opened panel ends up with placement and stack order recorded.
#[test]
fn test_opened_panels_fully_applied() {
    let mut h = Harness::new(3, WIDE);
    for control in 1..=3 {
        h.toggle_open(control);
    }
    while h.settle() {}

    let panels: Vec<PanelId> = h.binder.panel_ids().collect();
    assert_eq!(panels.len(), 3);
    for panel in panels {
        let record = h.binder.panel(panel).expect("panel record");
        assert!(record.open);
        assert!(record.placement.is_some());
        assert!(record.stack_order.is_some());
    }
}

/// Stack orders follow entrance order, each strictly above the last.
#[test]
fn test_stagger_stack_orders_monotonic() {
    let mut h = Harness::new(3, WIDE);
    for control in 1..=3 {
        h.toggle_open(control);
    }
    while h.settle() {}

    let orders: Vec<i32> = (1..=3)
        .map(|p| h.zstack.level(p).expect("level"))
        .collect();
    assert_eq!(
        orders,
        vec![
            STACK_ORDER_BASE + 1,
            STACK_ORDER_BASE + 2,
            STACK_ORDER_BASE + 3
        ]
    );
    assert_eq!(h.zstack.top(), Some(3));
}

/// Closing a panel mid-stagger does not cancel its queued entrance.
#[test]
fn test_close_does_not_cancel_queued_open() {
    let mut h = Harness::new(2, WIDE);
    h.toggle_open(1);
    h.toggle_open(2);

    // Panel 2 closes while still queued
    assert_eq!(h.binder.control_toggled(2, false), None);
    assert!(!h.binder.panel(2).expect("panel").open);

    // Its entrance still runs when the timer fires
    assert!(h.settle());
    assert_eq!(h.opened, vec![1, 2]);
}

/// A settle arriving with nothing in flight mutates nothing.
#[test]
fn test_dangling_settle_is_harmless() {
    let mut h = Harness::new(2, WIDE);
    assert!(!h.settle());
    assert!(h.opened.is_empty());
    assert!(!h.queue.is_animating());

    // State is unchanged; the next open still starts immediately
    h.toggle_open(1);
    assert_eq!(h.opened, vec![1]);
}

// ============================================================================
// Presses and Interleaving
// ============================================================================

/// A press raises above panels that opened later.
#[test]
fn test_press_raises_over_later_opens() {
    let mut h = Harness::new(3, WIDE);
    for control in 1..=3 {
        h.toggle_open(control);
    }
    while h.settle() {}
    assert_eq!(h.zstack.top(), Some(3));

    // Press the first panel; it must now be above everything
    if let Some(panel) = h.binder.surface_pressed(1) {
        let order = h.zstack.raise(panel);
        h.binder.apply_stack_order(panel, order);
    }
    assert_eq!(h.zstack.top(), Some(1));
    assert!(h.zstack.level(1).expect("level") > h.zstack.level(3).expect("level"));
}

/// Presses interleaved with a running stagger never break monotonicity.
#[test]
fn test_press_during_stagger() {
    let mut h = Harness::new(3, WIDE);
    for control in 1..=3 {
        h.toggle_open(control);
    }

    // Press panel 1 while 2 and 3 are still queued
    if let Some(panel) = h.binder.surface_pressed(1) {
        let order = h.zstack.raise(panel);
        h.binder.apply_stack_order(panel, order);
    }

    while h.settle() {}

    // Entrances after the press landed above it
    assert_eq!(h.zstack.top(), Some(3));
    let l1 = h.zstack.level(1).expect("level");
    let l2 = h.zstack.level(2).expect("level");
    let l3 = h.zstack.level(3).expect("level");
    assert!(l2 > l1);
    assert!(l3 > l2);
}

// ============================================================================
// Placement Across Viewports
// ============================================================================

/// Wide-viewport placements stay inside the margin band for many draws.
#[test]
fn test_placement_bounds_many_draws() {
    let mut rng = StdRng::seed_from_u64(3);
    let size = PanelSize::new(400, 300);

    for _ in 0..500 {
        let p = randomize_placement(size, WIDE, &mut rng).expect("placement");
        assert!(p.left_pct >= EDGE_MARGIN_PCT);
        assert!(p.top_pct >= EDGE_MARGIN_PCT);
        assert!(p.left_pct <= 100.0 - EDGE_MARGIN_PCT);
        assert!(p.top_pct <= 100.0 - EDGE_MARGIN_PCT);
    }
}

/// Crossing the breakpoint mid-stagger switches placement and delay policy
/// for panels that have not opened yet.
#[test]
fn test_viewport_narrows_mid_stagger() {
    let mut h = Harness::new(2, WIDE);
    h.toggle_open(1);
    h.toggle_open(2);

    assert_eq!(
        open_settle_delay(h.viewport),
        Duration::from_millis(OPEN_SETTLE_WIDE_MS)
    );
    assert!(h.binder.panel(1).expect("panel").placement.is_some());

    // Viewport narrows before panel 2 opens
    h.viewport = NARROW;
    assert!(h.settle());

    assert_eq!(
        open_settle_delay(h.viewport),
        Duration::from_millis(OPEN_SETTLE_NARROW_MS)
    );
    // Narrow layout is fixed; no placement was written for panel 2
    assert!(h.binder.panel(2).expect("panel").placement.is_none());
    // The raise still happened
    assert!(h.binder.panel(2).expect("panel").stack_order.is_some());
}

// ============================================================================
// Theme
// ============================================================================

/// Theme flips are involutive and the icon tracks dark mode.
#[test]
fn test_theme_round_trip_with_icon() {
    let mut theme = Theme::default();
    assert_eq!(theme, Theme::Light);
    assert!(!icon_visible(theme));

    theme = theme.toggled();
    assert_eq!(theme, Theme::Dark);
    assert!(icon_visible(theme));

    theme = theme.toggled();
    assert_eq!(theme, Theme::Light);
    assert!(!icon_visible(theme));
}
