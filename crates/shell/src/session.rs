//! Session state for one shell run.
//!
//! The session owns the core engine pieces (binder, open queue, z-stack) plus
//! the theme and viewport, and turns every input into a batch of surface
//! updates. All mutation happens here, on the event-loop task; timers only
//! feed settle events back in.

use crate::config::Config;
use crate::surface::SurfaceUpdate;
use anyhow::Result;
use popfolio_core_panels::{
    open_settle_delay, randomize_placement, Binder, ControlId, OpenQueue, PanelId, PanelSize,
    Theme, Viewport, ZStack,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The result of handling one input.
///
/// `settle_after` is set when a panel just entered its open sequence; the
/// caller must deliver a settle event back to the session after that delay.
#[derive(Debug, Default)]
pub struct StepOutcome {
    /// Surface updates to apply, in order.
    pub updates: Vec<SurfaceUpdate>,
    /// Schedule a settle event after this delay, if set.
    pub settle_after: Option<Duration>,
}

/// All state for one shell run.
pub struct Session {
    binder: Binder,
    queue: OpenQueue,
    zstack: ZStack,
    theme: Theme,
    viewport: Viewport,
    /// Panel name to id, first declaration wins.
    names: HashMap<String, PanelId>,
    sizes: HashMap<PanelId, PanelSize>,
    rng: StdRng,
}

impl Session {
    /// Build a session from config, with entropy-seeded placement.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build a session with a caller-provided RNG. Tests seed this for
    /// deterministic placement.
    pub fn with_rng(config: &Config, rng: StdRng) -> Result<Self> {
        let mut binder = Binder::new();
        let mut names = HashMap::new();
        let mut sizes = HashMap::new();

        // Ids are assigned from declaration order, starting at 1. Each panel's
        // control shares its id; the binder still keeps the two namespaces
        // apart.
        for (index, panel) in config.panels.iter().enumerate() {
            let id = index as PanelId + 1;
            if names.contains_key(&panel.name) {
                warn!("Skipping duplicate panel '{}'", panel.name);
                continue;
            }
            binder.bind(id, id)?;
            names.insert(panel.name.clone(), id);
            sizes.insert(id, PanelSize::new(panel.width, panel.height));
        }

        info!("Session started with {} panels", binder.len());

        Ok(Self {
            binder,
            queue: OpenQueue::new(),
            zstack: ZStack::new(),
            theme: Theme::from_checked(config.behavior.start_dark),
            viewport: Viewport::new(config.viewport.width, config.viewport.height),
            names,
            sizes,
            rng,
        })
    }

    /// Resolve a panel name from config to its id.
    pub fn panel_id(&self, name: &str) -> Option<PanelId> {
        self.names.get(name).copied()
    }

    /// Current theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Whether a panel-open sequence is in flight.
    pub fn is_animating(&self) -> bool {
        self.queue.is_animating()
    }

    /// Flip a panel's toggle control.
    ///
    /// Opening enqueues the panel for a staggered entrance; closing hides it
    /// immediately. Unknown names produce an empty outcome.
    pub fn toggle(&mut self, name: &str) -> StepOutcome {
        let Some(panel) = self.panel_id(name) else {
            debug!("Ignoring toggle for unknown panel '{}'", name);
            return StepOutcome::default();
        };

        let active = !self.binder.panel(panel).map(|p| p.open).unwrap_or(false);
        self.set_control(panel, active)
    }

    /// Drive a control to an explicit state. The control shares its panel's id.
    pub fn set_control(&mut self, control: ControlId, active: bool) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        let enqueue = self.binder.control_toggled(control, active);
        let Some(panel) = self.binder.panel_for(control) else {
            return outcome;
        };

        outcome.updates.push(SurfaceUpdate::PanelOpen {
            panel,
            open: active,
        });

        if let Some(panel) = enqueue {
            debug!("Panel {} queued for open ({} waiting)", panel, self.queue.len());
            if let Some(next) = self.queue.enqueue(panel) {
                self.open_panel(next, &mut outcome);
            }
        }

        outcome
    }

    /// A panel surface was pressed; raise it above everything else.
    ///
    /// Bypasses the open queue, the panel is already placed.
    pub fn press(&mut self, name: &str) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let Some(panel) = self.panel_id(name) else {
            debug!("Ignoring press for unknown panel '{}'", name);
            return outcome;
        };

        if let Some(panel) = self.binder.surface_pressed(panel) {
            let order = self.zstack.raise(panel);
            self.binder.apply_stack_order(panel, order);
            outcome.updates.push(SurfaceUpdate::StackOrder {
                panel,
                stack_order: order,
            });
        }

        outcome
    }

    /// A settle timer fired: the in-flight entrance is done, chain the next
    /// queued panel if any. Safe to call even when the queue went idle.
    pub fn open_settled(&mut self) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if let Some(next) = self.queue.settle() {
            self.open_panel(next, &mut outcome);
        }
        outcome
    }

    /// The viewport changed size. Existing placements stay where they are;
    /// only future opens see the new dimensions.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.viewport = Viewport::new(width, height);
        debug!("Viewport now {}x{}", width, height);
    }

    /// Flip the page theme.
    pub fn toggle_theme(&mut self) -> StepOutcome {
        self.theme = self.theme.toggled();
        info!("Theme now {}", self.theme.as_attr());
        StepOutcome {
            updates: vec![SurfaceUpdate::theme(self.theme)],
            settle_after: None,
        }
    }

    /// Run one panel's entrance: randomized placement (wide viewports only),
    /// then a raise to the top. Marks the outcome with the settle delay.
    fn open_panel(&mut self, panel: PanelId, outcome: &mut StepOutcome) {
        let size = self
            .sizes
            .get(&panel)
            .copied()
            .unwrap_or_else(|| PanelSize::new(0, 0));

        if let Some(placement) = randomize_placement(size, self.viewport, &mut self.rng) {
            self.binder.apply_placement(panel, placement);
            outcome.updates.push(SurfaceUpdate::position(panel, placement));
        }

        let order = self.zstack.raise(panel);
        self.binder.apply_stack_order(panel, order);
        outcome.updates.push(SurfaceUpdate::StackOrder {
            panel,
            stack_order: order,
        });

        outcome.settle_after = Some(open_settle_delay(self.viewport));
    }
}
