//! Core library for the analog clock component.
//!
//! The component draws a face and three hands that follow wall-clock time in
//! a configurable zone. Each module owns one concern: deriving the displayed
//! time, ticking on whole seconds, placing and rotating images, tinting them,
//! binding the tick loop to the host lifecycle, and persisting the zone.

pub mod assets;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod render;
pub mod snapshot;
pub mod timeline;
pub mod tint;
pub mod widget;

pub use assets::{builtin, AssetSpec, BaseImage};
pub use clock::{resolve_zone, ClockState, ResolvedZone, ZoneFallback};
pub use config::{ClockConfig, ComponentConfig, ElementConfig, SizeConfig};
pub use error::{ClockError, Result};
pub use host::{
    no_redraw, HostScope, RedrawHook, SchedulingContext, SystemClock, TaskFuture, TaskHandle,
    WallClock,
};
pub use lifecycle::{LifecycleBinding, LifecyclePhase};
pub use render::{fit_center, Bounds, Element, HandAngles, Layer, RenderPlan};
pub use snapshot::SavedSnapshot;
pub use timeline::{delay_to_next_interval, TickScheduler, TICK_INTERVAL};
pub use tint::{
    compose, BlendMode, Capabilities, Color, ColorEntry, ColorSet, ComposedAsset,
    InteractionState, StateMatcher, TintSpec,
};
pub use widget::{AnalogClock, FallbackHook};
