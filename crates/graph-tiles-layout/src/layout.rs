//! The force simulation engine.

use std::time::{Duration, Instant};

use graph_tiles_core::{Graph, Position, ProgressChannel, ProgressEvent, ResolvedLink, Velocity};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::quadtree::{jitter, pairwise_force, QuadTree, Repulsion};
use crate::{LayoutError, Result};

/// Configuration for the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Charge of every node; positive values push nodes apart.
    pub repulsion: f64,
    /// Barnes-Hut theta (0 = exact, ~0.9 = fast).
    pub theta: f64,
    /// Repulsion is softened below this distance.
    pub distance_min: f64,
    /// Pairs farther apart than this do not repel.
    pub distance_max: Option<f64>,
    /// Rest length of every link.
    pub link_distance: f64,
    /// Spring stiffness. `None` uses `1 / min(degree(source), degree(target))`.
    pub link_strength: Option<f64>,
    /// Fraction of the centroid offset removed each tick (0-1).
    pub centering: f64,
    /// Fraction of velocity lost each tick (0-1).
    pub velocity_decay: f64,
    /// Integration step applied to velocity when moving positions.
    pub time_step: f64,
    /// Starting temperature of each run; forces are scaled by it.
    pub alpha: f64,
    /// The run is finished once alpha drops below this.
    pub alpha_min: f64,
    /// Per-tick rate at which alpha approaches `alpha_target`.
    pub alpha_decay: f64,
    pub alpha_target: f64,
    /// Hard cap on ticks per run.
    pub max_ticks: u64,
    /// Finish the run once this long passes without a new tick starting.
    #[serde(rename = "quiescence_timeout_secs", with = "duration_secs")]
    pub quiescence_timeout: Duration,
    /// Use Barnes-Hut (true) or exact O(n²) repulsion (false).
    pub use_barnes_hut: bool,
    /// Maximum quadtree depth.
    pub max_tree_depth: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: 30.0,
            theta: 0.9,
            distance_min: 1.0,
            distance_max: None,
            link_distance: 30.0,
            link_strength: None,
            centering: 1.0,
            velocity_decay: 0.4,
            time_step: 1.0,
            alpha: 1.0,
            alpha_min: 0.001,
            // Cools from 1 to alpha_min in ~300 ticks.
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            alpha_target: 0.0,
            max_ticks: 100,
            quiescence_timeout: Duration::from_secs(10),
            use_barnes_hut: true,
            max_tree_depth: 16,
        }
    }
}

impl LayoutConfig {
    /// Check every parameter for range and finiteness.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, what: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(LayoutError::InvalidConfig(what.to_string()))
            }
        }
        let unit = |v: f64| (0.0..=1.0).contains(&v);

        check(self.repulsion.is_finite(), "repulsion must be finite")?;
        check(self.theta.is_finite() && self.theta >= 0.0, "theta must be >= 0")?;
        check(
            self.distance_min.is_finite() && self.distance_min > 0.0,
            "distance_min must be > 0",
        )?;
        check(
            self.distance_max.map_or(true, |d| d > 0.0),
            "distance_max must be > 0",
        )?;
        check(
            self.link_distance.is_finite() && self.link_distance >= 0.0,
            "link_distance must be >= 0",
        )?;
        check(
            self.link_strength
                .map_or(true, |s| s.is_finite() && s >= 0.0),
            "link_strength must be >= 0",
        )?;
        check(unit(self.centering), "centering must be within [0, 1]")?;
        check(unit(self.velocity_decay), "velocity_decay must be within [0, 1]")?;
        check(
            self.time_step.is_finite() && self.time_step > 0.0,
            "time_step must be > 0",
        )?;
        check(self.alpha.is_finite() && self.alpha >= 0.0, "alpha must be >= 0")?;
        check(
            self.alpha_min.is_finite() && self.alpha_min >= 0.0,
            "alpha_min must be >= 0",
        )?;
        check(unit(self.alpha_decay), "alpha_decay must be within [0, 1]")?;
        check(
            self.alpha_target.is_finite() && self.alpha_target >= 0.0,
            "alpha_target must be >= 0",
        )?;
        Ok(())
    }

    /// Repulsion parameters for the spatial index.
    pub fn repulsion(&self) -> Repulsion {
        Repulsion {
            strength: self.repulsion,
            theta: self.theta,
            distance_min: self.distance_min,
            distance_max: self.distance_max,
        }
    }
}

/// Lifecycle of a layout run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutState {
    /// No run has happened since construction or reset.
    Idle,
    /// A run is ticking.
    Running,
    /// The last run finished; positions are final.
    Converged,
    /// The last run was cancelled before finishing.
    Aborted,
}

/// What ended a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminatedBy {
    /// `max_ticks` ticks were executed.
    MaxTicks,
    /// No new tick started within the quiescence timeout.
    Timeout,
    /// Alpha dropped below `alpha_min`.
    Cooled,
    /// The cancellation token fired.
    Cancelled,
}

/// Outcome of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    pub tick_count: u64,
    pub converged: bool,
    /// `None` until a run has finished.
    pub terminated_by: Option<TerminatedBy>,
}

/// Force-directed layout engine.
///
/// Owns the kinematic state of every node (slot-aligned with the graph it was
/// built from) and advances it with repulsion, link springs and centering
/// until a termination trigger fires.
#[derive(Debug)]
pub struct ForceLayout {
    config: LayoutConfig,
    state: LayoutState,
    positions: Vec<Position>,
    velocities: Vec<Velocity>,
    presets: Vec<Option<Position>>,
    links: Vec<ResolvedLink>,
    link_strengths: Vec<f64>,
    degrees: Vec<usize>,
    alpha: f64,
    tick_count: u64,
    terminated_by: Option<TerminatedBy>,
    progress: Option<ProgressChannel>,
    cancel: Option<CancellationToken>,
}

impl ForceLayout {
    /// Create a layout for `graph`. Nodes start at their preset position or
    /// on a phyllotaxis spiral around the origin.
    pub fn new(graph: &Graph, config: LayoutConfig) -> Result<Self> {
        if graph.is_empty() {
            return Err(LayoutError::InvalidGraph("No nodes".into()));
        }
        config.validate()?;

        let presets = graph
            .nodes()
            .iter()
            .map(|n| n.preset_position())
            .collect();

        let mut layout = Self {
            link_strengths: Vec::new(),
            degrees: graph.degrees(),
            links: graph.links().to_vec(),
            positions: Vec::new(),
            velocities: Vec::new(),
            presets,
            alpha: config.alpha,
            config,
            state: LayoutState::Idle,
            tick_count: 0,
            terminated_by: None,
            progress: None,
            cancel: None,
        };
        layout.compute_link_strengths();
        layout.reset();

        debug!(
            nodes = layout.positions.len(),
            links = layout.links.len(),
            "Force layout initialized"
        );
        Ok(layout)
    }

    /// Publish tick progress on `channel`.
    pub fn with_progress(mut self, channel: ProgressChannel) -> Self {
        self.progress = Some(channel);
        self
    }

    /// Stop between ticks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.set_cancellation(token);
        self
    }

    /// Replace the cancellation token checked between ticks.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    /// Put every node back at its starting position with zero velocity.
    pub fn reset(&mut self) {
        let angle_step = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        self.positions = self
            .presets
            .iter()
            .enumerate()
            .map(|(i, preset)| {
                preset.unwrap_or_else(|| {
                    let radius = 10.0 * (0.5 + i as f64).sqrt();
                    let angle = i as f64 * angle_step;
                    Position::new(radius * angle.cos(), radius * angle.sin())
                })
            })
            .collect();
        self.velocities = vec![Velocity::default(); self.positions.len()];
        self.alpha = self.config.alpha;
        self.tick_count = 0;
        self.terminated_by = None;
        self.state = LayoutState::Idle;
    }

    /// Run the simulation until a termination trigger fires.
    ///
    /// Calling this again warm-starts from the current positions and
    /// velocities with a fresh tick budget and temperature.
    pub fn simulate(&mut self) -> SimulationState {
        self.state = LayoutState::Running;
        self.tick_count = 0;
        self.terminated_by = None;
        self.alpha = self.config.alpha;

        let max_ticks = self.config.max_ticks;
        let timeout = self.config.quiescence_timeout;
        let started = Instant::now();

        info!(
            nodes = self.positions.len(),
            links = self.links.len(),
            max_ticks,
            "Simulation started"
        );
        self.publish(ProgressEvent::simulating(0, max_ticks));

        // Restarted as each tick begins, so a tick that overruns the
        // timeout ends the run at the next check.
        let mut last_tick = Instant::now();
        let reason = loop {
            if self.tick_count >= max_ticks {
                break TerminatedBy::MaxTicks;
            }
            if self.alpha < self.config.alpha_min {
                break TerminatedBy::Cooled;
            }
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                break TerminatedBy::Cancelled;
            }
            if last_tick.elapsed() >= timeout {
                warn!(
                    ticks = self.tick_count,
                    timeout_secs = timeout.as_secs_f64(),
                    "Simulation stalled, finalizing current positions"
                );
                break TerminatedBy::Timeout;
            }

            last_tick = Instant::now();
            self.tick();
            self.tick_count += 1;
            trace!(tick = self.tick_count, alpha = self.alpha, "tick");
            self.publish(ProgressEvent::simulating(self.tick_count, max_ticks));
        };

        self.terminated_by = Some(reason);
        self.state = if reason == TerminatedBy::Cancelled {
            LayoutState::Aborted
        } else {
            LayoutState::Converged
        };

        info!(
            ticks = self.tick_count,
            terminated_by = ?reason,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Simulation finished"
        );
        self.simulation_state()
    }

    /// Advance the simulation by one step.
    fn tick(&mut self) {
        self.alpha += (self.config.alpha_target - self.alpha) * self.config.alpha_decay;
        self.apply_repulsion();
        self.apply_links();
        self.apply_centering();
        self.integrate();
    }

    fn apply_repulsion(&mut self) {
        let repulsion = self.config.repulsion();
        let forces: Vec<(f64, f64)> = if self.config.use_barnes_hut {
            let tree = QuadTree::build(&self.positions, self.config.max_tree_depth);
            (0..self.positions.len())
                .map(|i| tree.force_on(i, &repulsion))
                .collect()
        } else {
            (0..self.positions.len())
                .map(|i| pairwise_force(&self.positions, i, &repulsion))
                .collect()
        };

        for (v, (fx, fy)) in self.velocities.iter_mut().zip(forces) {
            v.x += fx * self.alpha;
            v.y += fy * self.alpha;
        }
    }

    fn apply_links(&mut self) {
        for (link, &strength) in self.links.iter().zip(&self.link_strengths) {
            if link.is_self_loop() {
                continue;
            }
            let (s, t) = (link.source, link.target);

            // Separation the endpoints are about to have.
            let mut dx = self.positions[t].x + self.velocities[t].x
                - self.positions[s].x
                - self.velocities[s].x;
            let mut dy = self.positions[t].y + self.velocities[t].y
                - self.positions[s].y
                - self.velocities[s].y;
            if dx == 0.0 && dy == 0.0 {
                dx = jitter(s, t);
                dy = jitter(s, t);
            }

            let l = dx.hypot(dy);
            let k = (l - self.config.link_distance) / l * self.alpha * strength;
            dx *= k;
            dy *= k;

            self.velocities[t].x -= dx * 0.5;
            self.velocities[t].y -= dy * 0.5;
            self.velocities[s].x += dx * 0.5;
            self.velocities[s].y += dy * 0.5;
        }
    }

    fn apply_centering(&mut self) {
        if self.config.centering == 0.0 {
            return;
        }
        let n = self.positions.len() as f64;
        let (sx, sy) = self
            .positions
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let shift_x = sx / n * self.config.centering;
        let shift_y = sy / n * self.config.centering;
        for p in &mut self.positions {
            p.x -= shift_x;
            p.y -= shift_y;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        let dt = self.config.time_step;
        for (p, v) in self.positions.iter_mut().zip(&mut self.velocities) {
            v.x *= keep;
            v.y *= keep;
            p.x += v.x * dt;
            p.y += v.y * dt;
        }
    }

    fn compute_link_strengths(&mut self) {
        self.link_strengths = self
            .links
            .iter()
            .map(|link| {
                self.config.link_strength.unwrap_or_else(|| {
                    let degree = self.degrees[link.source].min(self.degrees[link.target]);
                    1.0 / degree.max(1) as f64
                })
            })
            .collect();
    }

    fn publish(&self, event: ProgressEvent) {
        if let Some(channel) = &self.progress {
            channel.publish(event);
        }
    }

    /// Current node positions, slot-aligned with the graph.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Current node velocities, slot-aligned with the graph.
    pub fn velocities(&self) -> &[Velocity] {
        &self.velocities
    }

    /// Get current state.
    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Whether the last run finished normally.
    pub fn is_converged(&self) -> bool {
        self.state == LayoutState::Converged
    }

    pub fn simulation_state(&self) -> SimulationState {
        SimulationState {
            tick_count: self.tick_count,
            converged: self.is_converged(),
            terminated_by: self.terminated_by,
        }
    }

    /// Current temperature.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Update configuration; takes effect on the next run.
    pub fn set_config(&mut self, config: LayoutConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.compute_link_strengths();
        Ok(())
    }
}

/// Serde adapter storing a [`Duration`] as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_tiles_core::{GraphLink, GraphNode, Phase};

    fn pair(max_ticks: u64) -> (Graph, LayoutConfig) {
        let graph = Graph::new(
            vec![GraphNode::new(1, 0), GraphNode::new(2, 0)],
            vec![GraphLink::new(1, 2)],
        )
        .unwrap();
        let config = LayoutConfig {
            max_ticks,
            ..Default::default()
        };
        (graph, config)
    }

    fn path(n: u64) -> Graph {
        let nodes = (0..n).map(|i| GraphNode::new(i, (i % 3) as i64)).collect();
        let links = (1..n).map(|i| GraphLink::new(i - 1, i)).collect();
        Graph::new(nodes, links).unwrap()
    }

    #[test]
    fn test_layout_config_default() {
        let config = LayoutConfig::default();
        assert!(config.use_barnes_hut);
        assert!(config.theta > 0.0);
        assert_eq!(config.max_ticks, 100);
        assert_eq!(config.quiescence_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = LayoutConfig {
            velocity_decay: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LayoutError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_reads_timeout_in_seconds() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{"max_ticks": 5, "quiescence_timeout_secs": 2.5}"#).unwrap();
        assert_eq!(config.max_ticks, 5);
        assert_eq!(config.quiescence_timeout, Duration::from_millis(2500));
        assert_eq!(config.link_distance, 30.0);
    }

    #[test]
    fn empty_graph_is_rejected() {
        let err = ForceLayout::new(&Graph::default(), LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidGraph(_)));
    }

    #[test]
    fn starts_idle_on_a_spiral() {
        let layout = ForceLayout::new(&path(3), LayoutConfig::default()).unwrap();
        assert_eq!(layout.state(), LayoutState::Idle);
        assert!(!layout.simulation_state().converged);
        let p = layout.positions();
        assert!((p[0].x - 10.0 * 0.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(p[0].y, 0.0);
        assert!(p[1].distance(&p[2]) > 0.0);
    }

    #[test]
    fn preset_positions_are_kept() {
        let graph = Graph::new(
            vec![GraphNode::new(1, 0).at(100.0, -50.0), GraphNode::new(2, 0)],
            vec![],
        )
        .unwrap();
        let layout = ForceLayout::new(&graph, LayoutConfig::default()).unwrap();
        assert_eq!(layout.positions()[0], Position::new(100.0, -50.0));
    }

    #[test]
    fn stops_at_max_ticks() {
        let (graph, config) = pair(10);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.tick_count, 10);
        assert_eq!(state.terminated_by, Some(TerminatedBy::MaxTicks));
        assert_eq!(layout.state(), LayoutState::Converged);
    }

    #[test]
    fn zero_max_ticks_converges_without_moving() {
        let (graph, config) = pair(0);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        let before = layout.positions().to_vec();
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.tick_count, 0);
        assert_eq!(layout.positions(), before.as_slice());
    }

    #[test]
    fn quiescence_timeout_finalizes_the_run() {
        let (graph, mut config) = pair(100);
        config.quiescence_timeout = Duration::ZERO;
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.tick_count, 0);
        assert_eq!(state.terminated_by, Some(TerminatedBy::Timeout));
    }

    #[test]
    fn quiescence_timeout_fires_after_a_slow_tick() {
        let mut config = LayoutConfig {
            max_ticks: 50,
            ..Default::default()
        };
        // One tick over 20k nodes takes far longer than this.
        config.quiescence_timeout = Duration::from_millis(2);
        let mut layout = ForceLayout::new(&path(20_000), config).unwrap();
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.terminated_by, Some(TerminatedBy::Timeout));
        assert!(state.tick_count > 0 && state.tick_count < 50, "{state:?}");
    }

    #[test]
    fn cooling_ends_the_run_early() {
        let (graph, mut config) = pair(10_000);
        config.alpha_decay = 0.5;
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.terminated_by, Some(TerminatedBy::Cooled));
        // 0.5^10 < 0.001 <= 0.5^9
        assert_eq!(state.tick_count, 10);
        assert!(layout.alpha() < layout.config().alpha_min);
    }

    #[test]
    fn cancellation_aborts_between_ticks() {
        let (graph, config) = pair(100);
        let token = CancellationToken::new();
        token.cancel();
        let mut layout = ForceLayout::new(&graph, config)
            .unwrap()
            .with_cancellation(token);
        let state = layout.simulate();
        assert!(!state.converged);
        assert_eq!(state.terminated_by, Some(TerminatedBy::Cancelled));
        assert_eq!(layout.state(), LayoutState::Aborted);
    }

    #[test]
    fn replaced_token_revives_a_cancelled_layout() {
        let (graph, config) = pair(10);
        let token = CancellationToken::new();
        let mut layout = ForceLayout::new(&graph, config)
            .unwrap()
            .with_cancellation(token.clone());
        token.cancel();
        assert!(!layout.simulate().converged);

        layout.set_cancellation(CancellationToken::new());
        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.tick_count, 10);
    }

    #[test]
    fn set_config_applies_to_the_next_run() {
        let (graph, config) = pair(10);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        assert_eq!(layout.simulate().tick_count, 10);

        let invalid = LayoutConfig {
            velocity_decay: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            layout.set_config(invalid),
            Err(LayoutError::InvalidConfig(_))
        ));
        assert_eq!(layout.config().max_ticks, 10);

        layout
            .set_config(LayoutConfig {
                max_ticks: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(layout.simulate().tick_count, 3);
    }

    #[test]
    fn velocities_start_at_rest_and_reset_clears_them() {
        let (graph, config) = pair(5);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        assert!(layout.velocities().iter().all(|v| *v == Velocity::default()));

        layout.simulate();
        assert!(layout.velocities().iter().any(|v| *v != Velocity::default()));

        layout.reset();
        assert_eq!(layout.velocities().len(), 2);
        assert!(layout.velocities().iter().all(|v| *v == Velocity::default()));
    }

    #[test]
    fn publishes_one_event_per_tick() {
        let (graph, config) = pair(5);
        let channel = ProgressChannel::new(64);
        let mut rx = channel.subscribe();
        let mut layout = ForceLayout::new(&graph, config)
            .unwrap()
            .with_progress(channel);
        layout.simulate();

        let events: Vec<ProgressEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.phase == Phase::Simulating && e.max == 5));
        let ticks: Vec<u64> = events.iter().map(|e| e.current).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn linked_pair_with_defaults_stays_near_link_distance() {
        let (graph, config) = pair(100);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        layout.simulate();
        let p = layout.positions();
        let distance = p[0].distance(&p[1]);
        assert!((27.0..=33.0).contains(&distance), "distance {distance}");
    }

    #[test]
    fn linked_pair_settles_near_link_distance() {
        let (graph, mut config) = pair(300);
        config.repulsion = 5.0;
        config.link_strength = Some(1.0);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        layout.simulate();
        let p = layout.positions();
        let distance = p[0].distance(&p[1]);
        assert!((27.0..=33.0).contains(&distance), "distance {distance}");
    }

    #[test]
    fn centering_keeps_centroid_at_origin() {
        let mut layout = ForceLayout::new(&path(20), LayoutConfig::default()).unwrap();
        layout.simulate();
        let n = layout.positions().len() as f64;
        let (sx, sy) = layout
            .positions()
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        // Centering happens before integration, so only the last step's drift remains.
        assert!((sx / n).abs() < 1.0 && (sy / n).abs() < 1.0);
    }

    #[test]
    fn barnes_hut_and_exact_layouts_agree_roughly() {
        let graph = path(30);
        let mut fast = ForceLayout::new(&graph, LayoutConfig::default()).unwrap();
        let mut exact = ForceLayout::new(
            &graph,
            LayoutConfig {
                use_barnes_hut: false,
                ..Default::default()
            },
        )
        .unwrap();
        fast.simulate();
        exact.simulate();
        let spread = |l: &ForceLayout| {
            l.positions()
                .iter()
                .map(|p| p.x.hypot(p.y))
                .fold(0.0, f64::max)
        };
        let (a, b) = (spread(&fast), spread(&exact));
        assert!((a - b).abs() / b < 0.3, "fast {a} exact {b}");
    }

    #[test]
    fn self_loops_do_not_move_nodes() {
        let graph = Graph::new(vec![GraphNode::new(1, 0)], vec![GraphLink::new(1, 1)]).unwrap();
        let mut layout = ForceLayout::new(&graph, LayoutConfig::default()).unwrap();
        let state = layout.simulate();
        assert!(state.converged);
        let p = layout.positions()[0];
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
    }

    #[test]
    fn simulate_again_warm_starts() {
        let (graph, config) = pair(20);
        let mut layout = ForceLayout::new(&graph, config).unwrap();
        layout.simulate();
        let settled = layout.positions().to_vec();

        let state = layout.simulate();
        assert!(state.converged);
        assert_eq!(state.tick_count, 20);
        // Already near equilibrium, so the second run moves little.
        let moved = settled[0].distance(&layout.positions()[0]);
        assert!(moved < 5.0, "moved {moved}");

        layout.reset();
        assert_eq!(layout.state(), LayoutState::Idle);
        assert_eq!(layout.simulation_state().tick_count, 0);
    }
}
