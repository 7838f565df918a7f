use std::{fmt, sync::Arc};

use image::RgbaImage;
use serde_json::Value;

use crate::{
    assets::{AssetSpec, BaseImage},
    clock::{resolve_zone, ClockState, ResolvedZone, ZoneFallback},
    config::ComponentConfig,
    host::{no_redraw, RedrawHook, SchedulingContext, SystemClock, WallClock},
    lifecycle::{LifecycleBinding, LifecyclePhase},
    render::{Element, HandAngles, RenderPlan},
    snapshot::SavedSnapshot,
    tint::{compose, BlendMode, Capabilities, ColorSet, ComposedAsset, InteractionState},
    Result,
};

/// Callback told when [`AnalogClock::set_zone_id`] (or a restore) had to
/// replace the requested zone id with the system zone.
pub type FallbackHook = Arc<dyn Fn(&ZoneFallback) + Send + Sync>;

/// Self-updating analog clock: a face and three hands driven by wall time.
pub struct AnalogClock {
    zone: ResolvedZone,
    slots: [Slot; 4],
    capabilities: Capabilities,
    interaction: InteractionState,
    context: Option<Arc<dyn SchedulingContext>>,
    binding: LifecycleBinding,
    redraw: RedrawHook,
    on_fallback: Option<FallbackHook>,
}

#[derive(Debug, Default)]
struct Slot {
    spec: AssetSpec,
    composed: Option<ComposedAsset>,
}

impl AnalogClock {
    pub fn new(config: ComponentConfig) -> Self {
        let redraw = no_redraw();
        let ComponentConfig {
            zone_id,
            face,
            hour,
            minute,
            second,
        } = config;

        let mut clock = Self {
            zone: resolve_zone(zone_id.as_deref()),
            slots: [face, hour, minute, second].map(|spec| Slot {
                spec,
                composed: None,
            }),
            capabilities: Capabilities::default(),
            interaction: InteractionState::default(),
            context: None,
            binding: LifecycleBinding::new(Arc::new(SystemClock), redraw.clone()),
            redraw,
            on_fallback: None,
        };
        clock.recompose_all();
        clock
    }

    pub fn with_redraw_hook(mut self, redraw: RedrawHook) -> Self {
        self.binding.set_redraw_hook(redraw.clone());
        self.redraw = redraw;
        self
    }

    pub fn with_wall_clock(mut self, wall_clock: Arc<dyn WallClock>) -> Self {
        self.binding.set_wall_clock(wall_clock);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self.recompose_all();
        self
    }

    pub fn with_scheduling_context(mut self, context: Arc<dyn SchedulingContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Registers a callback for zone ids that fall back to the system zone.
    pub fn on_zone_fallback(mut self, hook: FallbackHook) -> Self {
        self.on_fallback = Some(hook);
        self
    }

    // Lifecycle.

    /// Attaches to the injected scheduling context and starts ticking.
    pub fn attach(&mut self) -> Result<()> {
        self.binding.attach(self.context.as_deref(), self.zone.zone())?;
        self.request_redraw();
        Ok(())
    }

    /// Injects `context` and attaches to it.
    pub fn attach_to(&mut self, context: Arc<dyn SchedulingContext>) -> Result<()> {
        self.context = Some(context);
        self.attach()
    }

    pub fn detach(&mut self) {
        self.binding.detach();
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.binding.phase()
    }

    pub fn is_attached(&self) -> bool {
        self.phase() == LifecyclePhase::Running
    }

    /// Latest clock snapshot; `None` while detached.
    pub fn clock_state(&self) -> Option<ClockState> {
        self.binding.clock_state()
    }

    pub fn hand_angles(&self) -> Option<HandAngles> {
        self.clock_state().as_ref().map(HandAngles::from_state)
    }

    // Time zone.

    pub fn zone_id(&self) -> &str {
        self.zone.id()
    }

    /// Present when the last requested zone id could not be resolved.
    pub fn zone_fallback(&self) -> Option<&ZoneFallback> {
        self.zone.fallback()
    }

    /// Changes the zone; `None` selects the system zone. Restarts a running
    /// clock on the new zone.
    pub fn set_zone_id(&mut self, zone_id: Option<&str>) -> Result<()> {
        self.zone = resolve_zone(zone_id);
        if let (Some(fallback), Some(hook)) = (self.zone.fallback(), &self.on_fallback) {
            hook(fallback);
        }
        self.binding
            .zone_changed(self.context.as_deref(), self.zone.zone())?;
        self.request_redraw();
        Ok(())
    }

    // Assets and tint.

    pub fn asset(&self, element: Element) -> Option<&BaseImage> {
        self.slot(element).spec.image.as_ref()
    }

    pub fn set_asset(&mut self, element: Element, image: Option<BaseImage>) {
        self.slot_mut(element).spec.image = image;
        self.recompose(element);
        self.request_redraw();
    }

    pub fn tint_colors(&self, element: Element) -> Option<&ColorSet> {
        self.slot(element).spec.tint.colors.as_ref()
    }

    pub fn set_tint_colors(&mut self, element: Element, colors: Option<ColorSet>) {
        self.slot_mut(element).spec.tint.colors = colors;
        self.recompose(element);
        self.request_redraw();
    }

    pub fn tint_blend_mode(&self, element: Element) -> Option<BlendMode> {
        self.slot(element).spec.tint.blend_mode
    }

    pub fn set_tint_blend_mode(&mut self, element: Element, blend_mode: Option<BlendMode>) {
        self.slot_mut(element).spec.tint.blend_mode = blend_mode;
        self.recompose(element);
        self.request_redraw();
    }

    /// The tinted image drawn for `element`, if it has one.
    pub fn composed(&self, element: Element) -> Option<&ComposedAsset> {
        self.slot(element).composed.as_ref()
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction
    }

    /// Updates the interaction state and recomposes the assets that depend on it.
    pub fn set_interaction_state(&mut self, state: InteractionState) {
        if state == self.interaction {
            return;
        }
        self.interaction = state;

        let mut changed = false;
        for element in Element::ALL {
            let stateful = self
                .slot(element)
                .composed
                .as_ref()
                .is_some_and(|composed| composed.state().is_some());
            if stateful {
                self.recompose(element);
                changed = true;
            }
        }
        if changed {
            self.request_redraw();
        }
    }

    // Rendering.

    /// Draw list for a `width` x `height` container.
    pub fn render_plan(&self, width: u32, height: u32) -> RenderPlan {
        RenderPlan::build(width, height, self.hand_angles(), |element| {
            self.composed(element).map(ComposedAsset::dimensions)
        })
    }

    /// Rasterizes the current frame.
    pub fn render(&self, width: u32, height: u32) -> RgbaImage {
        self.render_plan(width, height)
            .rasterize(|element| self.composed(element).map(ComposedAsset::image))
    }

    // Persistence.

    /// Captures the selected zone alongside the host's own state.
    pub fn save(&self, host_state: Value) -> SavedSnapshot {
        SavedSnapshot::new(self.zone_id(), host_state)
    }

    /// Restores from a value produced by [`AnalogClock::save`].
    ///
    /// Returns the state the host should restore itself from: the wrapped host
    /// state for a recognised snapshot, or `state` untouched otherwise.
    pub fn restore(&mut self, state: Value) -> Result<Value> {
        match SavedSnapshot::from_value(state) {
            Ok(snapshot) => {
                self.set_zone_id(Some(&snapshot.zone_id))?;
                Ok(snapshot.host_state)
            }
            Err(unrecognised) => {
                tracing::debug!("snapshot not recognised, deferring to host restoration");
                Ok(unrecognised)
            }
        }
    }

    fn slot(&self, element: Element) -> &Slot {
        &self.slots[element.index()]
    }

    fn slot_mut(&mut self, element: Element) -> &mut Slot {
        &mut self.slots[element.index()]
    }

    fn recompose(&mut self, element: Element) {
        let interaction = self.interaction;
        let capabilities = self.capabilities;
        let slot = self.slot_mut(element);
        slot.composed = slot
            .spec
            .image
            .as_ref()
            .map(|image| compose(image, &slot.spec.tint, interaction, &capabilities));
    }

    fn recompose_all(&mut self) {
        for element in Element::ALL {
            self.recompose(element);
        }
    }

    fn request_redraw(&self) {
        (self.redraw)();
    }
}

impl Default for AnalogClock {
    fn default() -> Self {
        Self::new(ComponentConfig::default())
    }
}

impl fmt::Debug for AnalogClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalogClock")
            .field("zone_id", &self.zone_id())
            .field("binding", &self.binding)
            .field("interaction", &self.interaction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::Rgba;

    use super::*;
    use crate::{assets::builtin, tint::Color, ClockError};

    fn counting_clock(config: ComponentConfig) -> (AnalogClock, Arc<AtomicUsize>) {
        let redraws = Arc::new(AtomicUsize::new(0));
        let counter = redraws.clone();
        let clock = AnalogClock::new(config).with_redraw_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (clock, redraws)
    }

    #[test]
    fn attach_without_context_fails_loudly() {
        let mut clock = AnalogClock::default();
        assert!(matches!(
            clock.attach().unwrap_err(),
            ClockError::MissingSchedulingContext
        ));
        assert!(!clock.is_attached());
    }

    #[test]
    fn setters_recompose_and_request_redraw() {
        let (mut clock, redraws) = counting_clock(ComponentConfig::default());
        assert!(clock.composed(Element::Hour).is_none());

        clock.set_asset(Element::Hour, Some(builtin::hour_hand()));
        clock.set_tint_colors(Element::Hour, Some(ColorSet::solid(Color::rgb(0, 128, 0))));
        clock.set_tint_blend_mode(Element::Hour, Some(BlendMode::SourceAtop));

        let composed = clock.composed(Element::Hour).unwrap();
        assert_eq!(composed.applied_color(), Some(Color::rgb(0, 128, 0)));
        assert_eq!(composed.applied_blend_mode(), Some(BlendMode::SourceAtop));
        assert_eq!(clock.tint_blend_mode(Element::Hour), Some(BlendMode::SourceAtop));
        assert_eq!(redraws.load(Ordering::SeqCst), 3);

        clock.set_asset(Element::Hour, None);
        assert!(clock.composed(Element::Hour).is_none());
        assert!(clock.tint_colors(Element::Hour).is_some());
    }

    #[test]
    fn elements_tint_independently_from_a_shared_image() {
        let shared = builtin::minute_hand();
        let mut config = ComponentConfig::default();
        config.minute = AssetSpec::from_image(shared.clone());
        config.second = AssetSpec::from_image(shared.clone());
        let mut clock = AnalogClock::new(config);

        clock.set_tint_colors(Element::Second, Some(ColorSet::solid(Color::rgb(255, 0, 0))));

        assert_eq!(clock.composed(Element::Minute).unwrap().image(), shared.pixels());
        assert_ne!(clock.composed(Element::Second).unwrap().image(), shared.pixels());
        assert!(clock.asset(Element::Minute).unwrap().shares_pixels(&shared));
    }

    #[test]
    fn unknown_zone_falls_back_and_notifies() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let hook: FallbackHook = Arc::new(move |fallback: &ZoneFallback| {
            assert_eq!(fallback.requested, "Nowhere/Special");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut clock = AnalogClock::default().on_zone_fallback(hook);

        clock.set_zone_id(Some("Nowhere/Special")).unwrap();
        assert_eq!(clock.zone_id(), ResolvedZone::system().id());
        assert!(clock.zone_fallback().is_some());
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        clock.set_zone_id(Some("Europe/Paris")).unwrap();
        assert_eq!(clock.zone_id(), "Europe/Paris");
        assert!(clock.zone_fallback().is_none());
    }

    #[test]
    fn stateful_tints_follow_interaction_state() {
        let pressed = crate::tint::StateMatcher {
            pressed: Some(true),
            ..Default::default()
        };
        let colors =
            ColorSet::solid(Color::rgb(0, 0, 0)).with_entry(pressed, Color::rgb(255, 255, 255));
        let mut config = ComponentConfig::with_builtin_assets();
        config.face.tint.colors = Some(colors);
        let (mut clock, redraws) = counting_clock(config);

        clock.set_interaction_state(InteractionState {
            pressed: true,
            ..Default::default()
        });

        let face = clock.composed(Element::Face).unwrap();
        assert_eq!(face.applied_color(), Some(Color::rgb(255, 255, 255)));
        assert_eq!(face.state().map(|state| state.pressed), Some(true));
        assert_eq!(redraws.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_render_draws_only_the_face() {
        let mut config = ComponentConfig::default();
        config.face = AssetSpec::from_image(BaseImage::new(RgbaImage::from_pixel(
            4,
            4,
            Rgba([0, 0, 255, 255]),
        )));
        config.hour = AssetSpec::from_image(builtin::hour_hand());
        let clock = AnalogClock::new(config);

        let plan = clock.render_plan(64, 64);
        assert_eq!(plan.layers.len(), 1);

        let frame = clock.render(64, 64);
        assert_eq!(frame.get_pixel(32, 32).0, [0, 0, 255, 255]);
    }

    #[test]
    fn unrecognised_snapshot_is_returned_to_the_host() {
        let mut clock = AnalogClock::new(ComponentConfig {
            zone_id: Some("Asia/Tokyo".into()),
            ..Default::default()
        });
        let foreign = serde_json::json!({ "scroll": 42 });

        let handed_back = clock.restore(foreign.clone()).unwrap();
        assert_eq!(handed_back, foreign);
        assert_eq!(clock.zone_id(), "Asia/Tokyo");
    }
}
