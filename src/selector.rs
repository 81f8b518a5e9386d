//! Shape selection.
//!
//! [`ShapeSelector`] holds the `K` target textures (index 0 is the base
//! snapshot, `1..K` the sampled shapes) and rebinds the velocity variable's
//! target slot. It never touches field contents; switching is a single
//! binding write that the next tick picks up.
//!
//! [`TriggerZones`] are the screen-space regions that drive selection from
//! the pointer. Each zone is registered once with an explicit target index;
//! entering a zone reports that index.

use glam::Vec2;
use rand::Rng;

use crate::compute::{ComputeBackend, TargetId, VariableId};
use crate::config::SwarmConfig;
use crate::error::ComputeError;
use crate::programs::SwarmPrograms;
use crate::sampler::sample_shape;
use crate::simulator::FieldSimulator;

/// Label of the base snapshot target.
pub const BASE_LABEL: &str = "scatter";

/// Cyclic selector over the registered targets.
#[derive(Debug, Clone)]
pub struct ShapeSelector {
    variable: VariableId,
    targets: Vec<TargetId>,
    labels: Vec<String>,
    current: usize,
}

impl ShapeSelector {
    /// Selector over `targets` for `variable`, starting at index 0.
    pub fn new(variable: VariableId, targets: Vec<TargetId>) -> Self {
        let labels = (0..targets.len()).map(|i| format!("target {}", i)).collect();
        Self {
            variable,
            targets,
            labels,
            current: 0,
        }
    }

    /// Sample every configured shape, register it with the simulator's
    /// backend and build a selector whose index 0 is the base snapshot.
    pub fn build<B, R>(sim: &mut FieldSimulator<B>, config: &SwarmConfig, rng: &mut R) -> Self
    where
        B: SwarmPrograms,
        R: Rng + ?Sized,
    {
        let side = sim.backend().side();
        let mut targets = vec![sim.base_target()];
        let mut labels = vec![BASE_LABEL.to_string()];
        for shape in &config.shapes {
            let texture = sample_shape(*shape, side, config.shape_scale, rng);
            targets.push(sim.backend_mut().add_target(&texture));
            labels.push(shape.name().to_string());
            log::debug!("Sampled {} into {}x{} target", shape.name(), side, side);
        }
        Self {
            variable: sim.velocity(),
            targets,
            labels,
            current: 0,
        }
    }

    /// Index of the bound target.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of targets (`K`).
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, index: usize) -> Option<TargetId> {
        self.targets.get(index).copied()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Variable whose target slot this selector drives.
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    /// Move to the next target, wrapping after `K - 1`.
    pub fn advance<B: ComputeBackend + ?Sized>(&mut self, backend: &mut B) -> Result<usize, ComputeError> {
        self.select(self.current + 1, backend)
    }

    /// Jump to `index mod K`.
    pub fn select<B: ComputeBackend + ?Sized>(&mut self, index: usize, backend: &mut B) -> Result<usize, ComputeError> {
        if self.targets.is_empty() {
            return Err(ComputeError::UnknownTarget(index));
        }
        let index = index % self.targets.len();
        backend.bind_target(self.variable, self.targets[index])?;
        self.current = index;
        Ok(index)
    }
}

/// Axis-aligned rectangle in normalized window coordinates (`0..1`, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ZoneRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.x + self.width && point.y >= self.y && point.y < self.y + self.height
    }
}

/// A screen region bound to one target index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerZone {
    pub rect: ZoneRect,
    pub target: usize,
}

/// Registered trigger zones and the pointer's hover state.
#[derive(Debug, Clone, Default)]
pub struct TriggerZones {
    zones: Vec<TriggerZone>,
    hovered: Option<usize>,
}

impl TriggerZones {
    pub fn new() -> Self {
        Self::default()
    }

    /// One zone per target along the bottom edge of the window.
    pub fn row(count: usize) -> Self {
        let mut zones = Self::new();
        if count == 0 {
            return zones;
        }
        let margin = 0.02;
        let span = 1.0 - 2.0 * margin;
        // Gaps never take more than half the row.
        let gap = (0.01f32).min(span / (2.0 * count as f32));
        let width = (span - gap * (count - 1) as f32) / count as f32;
        for target in 0..count {
            let x = margin + target as f32 * (width + gap);
            zones.register(ZoneRect::new(x, 0.9, width, 0.08), target);
        }
        zones
    }

    /// Register a zone for `target`. Returns the zone's index.
    pub fn register(&mut self, rect: ZoneRect, target: usize) -> usize {
        self.zones.push(TriggerZone { rect, target });
        self.zones.len() - 1
    }

    pub fn zones(&self) -> &[TriggerZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Index of the zone under the pointer.
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Track the pointer at `point` (normalized). Returns the target index
    /// when the pointer enters a zone it was not already in.
    pub fn pointer_moved(&mut self, point: Vec2) -> Option<usize> {
        let under = self.zones.iter().position(|z| z.rect.contains(point));
        let entered = under.filter(|&zone| self.hovered != Some(zone));
        self.hovered = under;
        entered.map(|zone| self.zones[zone].target)
    }

    /// The pointer left the window.
    pub fn pointer_left(&mut self) {
        self.hovered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuCompute;
    use crate::field::FieldTexture;

    fn setup(k: usize) -> (CpuCompute, ShapeSelector) {
        let mut cpu = CpuCompute::new(1);
        let v = cpu.add_variable("v", Box::new(|i: &crate::compute::TexelInput<'_>| i.target()), FieldTexture::new(1));
        let targets = (0..k)
            .map(|i| cpu.add_target(&FieldTexture::from_fn(1, |_| [i as f32; 4])))
            .collect();
        (cpu, ShapeSelector::new(v, targets))
    }

    #[test]
    fn test_advance_wraps() {
        let (mut cpu, mut selector) = setup(4);
        assert_eq!(selector.advance(&mut cpu), Ok(1));
        assert_eq!(selector.advance(&mut cpu), Ok(2));
        assert_eq!(selector.advance(&mut cpu), Ok(3));
        assert_eq!(selector.advance(&mut cpu), Ok(0));
        assert_eq!(cpu.bound_target(selector.variable()), selector.target(0));
    }

    #[test]
    fn test_select_wraps_out_of_range() {
        let (mut cpu, mut selector) = setup(4);
        assert_eq!(selector.select(6, &mut cpu), Ok(2));
        assert_eq!(selector.current(), 2);
        assert_eq!(cpu.bound_target(selector.variable()), selector.target(2));
    }

    #[test]
    fn test_select_same_index_is_idempotent() {
        let (mut cpu, mut selector) = setup(3);
        selector.select(1, &mut cpu).unwrap();
        selector.select(1, &mut cpu).unwrap();
        assert_eq!(selector.current(), 1);
        assert_eq!(cpu.bound_target(selector.variable()), selector.target(1));
    }

    #[test]
    fn test_empty_selector_errors() {
        let (mut cpu, _) = setup(0);
        let mut selector = ShapeSelector::new(VariableId(0), Vec::new());
        assert!(selector.advance(&mut cpu).is_err());
        assert_eq!(selector.current(), 0);
    }

    #[test]
    fn test_rebinding_reaches_next_tick() {
        let (mut cpu, mut selector) = setup(3);
        cpu.init().unwrap();
        selector.select(2, &mut cpu).unwrap();
        cpu.compute();
        assert_eq!(cpu.current(selector.variable()).unwrap().texel(0), [2.0; 4]);
    }

    #[test]
    fn test_zone_enter_fires_once() {
        let mut zones = TriggerZones::new();
        zones.register(ZoneRect::new(0.0, 0.0, 0.5, 1.0), 3);
        zones.register(ZoneRect::new(0.5, 0.0, 0.5, 1.0), 1);

        assert_eq!(zones.pointer_moved(Vec2::new(0.1, 0.5)), Some(3));
        assert_eq!(zones.pointer_moved(Vec2::new(0.2, 0.5)), None);
        assert_eq!(zones.pointer_moved(Vec2::new(0.7, 0.5)), Some(1));
        assert_eq!(zones.hovered(), Some(1));
    }

    #[test]
    fn test_zone_reentry_fires_again() {
        let mut zones = TriggerZones::new();
        zones.register(ZoneRect::new(0.0, 0.0, 0.5, 0.5), 2);

        assert_eq!(zones.pointer_moved(Vec2::new(0.1, 0.1)), Some(2));
        assert_eq!(zones.pointer_moved(Vec2::new(0.9, 0.9)), None);
        assert_eq!(zones.hovered(), None);
        assert_eq!(zones.pointer_moved(Vec2::new(0.1, 0.1)), Some(2));

        zones.pointer_left();
        assert_eq!(zones.pointer_moved(Vec2::new(0.1, 0.1)), Some(2));
    }

    #[test]
    fn test_row_layout() {
        let zones = TriggerZones::row(4);
        assert_eq!(zones.len(), 4);
        for (i, zone) in zones.zones().iter().enumerate() {
            assert_eq!(zone.target, i);
            assert!(zone.rect.x >= 0.0 && zone.rect.x + zone.rect.width <= 1.0 + 1e-6);
        }
        for pair in zones.zones().windows(2) {
            assert!(pair[0].rect.x + pair[0].rect.width <= pair[1].rect.x);
        }
        assert!(TriggerZones::row(0).is_empty());
    }

    #[test]
    fn test_long_row_keeps_positive_widths() {
        for count in [97, 150, 1000] {
            let zones = TriggerZones::row(count);
            assert_eq!(zones.len(), count);
            for zone in zones.zones() {
                assert!(zone.rect.width > 0.0, "{} zones", count);
            }
            let last = zones.zones()[count - 1].rect;
            assert!(last.x + last.width <= 0.98 + 1e-4, "{} zones", count);
        }
    }
}
