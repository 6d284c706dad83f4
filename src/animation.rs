//! A shared frame loop that drives per-control animations.
//!
//! Every control registers the animations it needs, keyed by its [`ControlId`] and an
//! [`AnimationChannel`], on one [`AnimationScheduler`]. The scheduler is a cheap handle: clones
//! share the same registry, so it can be stored in each control as well as in the app as a
//! [`Resource`]. The loop only runs while something is registered and suspends itself otherwise.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_platform::time::Instant;

/// The timestep used for the synchronous first step of a newly started animation, and for the
/// first frame after the loop resumes.
pub const FIRST_FRAME_DELTA: Duration = Duration::from_nanos(16_666_667);

/// Identifies one control instance on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(u64);

impl ControlId {
    /// A process-unique id.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ControlId {
    fn default() -> Self {
        Self::new()
    }
}

/// The animations a single control can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationChannel {
    /// The damped continuation of a released pointer.
    Inertia,
    /// Delivery of the coalesced property change.
    ChangeBatch,
    /// Defined by the control's owner.
    Custom(u32),
}

/// A registered animation: one channel of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    pub owner: ControlId,
    pub channel: AnimationChannel,
}

impl AnimationKey {
    pub fn new(owner: ControlId, channel: AnimationChannel) -> Self {
        Self { owner, channel }
    }
}

/// Something the scheduler can step.
///
/// Implementations must not assume a fixed timestep.
pub trait Animatable {
    /// The id animations of this value are registered under.
    fn animation_owner(&self) -> ControlId;

    /// Advance the animation on `channel` by `delta`.
    fn animate(&mut self, channel: AnimationChannel, delta: Duration);
}

#[derive(Debug, Default)]
struct SchedulerState {
    registered: Vec<AnimationKey>,
    requested: Vec<AnimationKey>,
    last_frame: Option<Instant>,
    frame_index: u64,
}

impl SchedulerState {
    fn is_idle(&self) -> bool {
        self.registered.is_empty() && self.requested.is_empty()
    }
}

/// A shared handle to the animation registry.
///
/// All clones refer to the same registry. The app-wide instance is inserted as a resource by the
/// [`AnimationSchedulerPlugin`](crate::controls::systems::AnimationSchedulerPlugin) and handed to
/// controls when they are built.
#[derive(Debug, Clone, Default, Resource)]
pub struct AnimationScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl AnimationScheduler {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // The registry is plain data, a panicking animation cannot leave it half updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an animation of `target` and step it once, synchronously, by
    /// [`FIRST_FRAME_DELTA`], so it is visible without waiting for the next frame.
    ///
    /// Starting an animation that is already registered does nothing and returns `false`.
    pub fn start_animation<A: Animatable + ?Sized>(
        &self,
        target: &mut A,
        channel: AnimationChannel,
    ) -> bool {
        let key = AnimationKey::new(target.animation_owner(), channel);
        {
            let mut state = self.lock();
            if state.registered.contains(&key) {
                return false;
            }
            if state.is_idle() && state.last_frame.is_none() {
                trace!("Animation loop started");
            }
            state.registered.push(key);
        }
        target.animate(channel, FIRST_FRAME_DELTA);
        true
    }

    /// Step `key` once at the next frame, without the synchronous first step.
    ///
    /// Requesting a key that is already requested does nothing.
    pub fn request_frame(&self, key: AnimationKey) {
        let mut state = self.lock();
        if !state.requested.contains(&key) {
            state.requested.push(key);
        }
    }

    /// Deregister an animation and drop its pending frame request. Returns `false` if neither
    /// existed.
    pub fn stop_animation(&self, key: AnimationKey) -> bool {
        let mut state = self.lock();
        let before = state.registered.len() + state.requested.len();
        state.registered.retain(|registered| *registered != key);
        state.requested.retain(|requested| *requested != key);
        before != state.registered.len() + state.requested.len()
    }

    /// Deregister every animation and frame request of `owner`, returning how many were removed.
    pub fn stop_all_animations(&self, owner: ControlId) -> usize {
        let mut state = self.lock();
        let before = state.registered.len() + state.requested.len();
        state.registered.retain(|key| key.owner != owner);
        state.requested.retain(|key| key.owner != owner);
        before - (state.registered.len() + state.requested.len())
    }

    /// Is `key` registered? One-shot frame requests do not count.
    pub fn is_animating(&self, key: AnimationKey) -> bool {
        self.lock().registered.contains(&key)
    }

    /// Is anything registered or requested, so that another frame is needed?
    pub fn is_running(&self) -> bool {
        !self.lock().is_idle()
    }

    /// Start a frame at `now`.
    ///
    /// Returns `None`, and suspends the loop, if nothing is registered or requested. Otherwise the
    /// frame lists everything that is due; pending one-shot requests are consumed by the frame.
    pub fn begin_frame(&self, now: Instant) -> Option<AnimationFrame> {
        let mut state = self.lock();
        if state.is_idle() {
            if state.last_frame.take().is_some() {
                trace!("Animation loop suspended");
            }
            return None;
        }
        let delta = match state.last_frame {
            Some(last) => now.saturating_duration_since(last),
            None => FIRST_FRAME_DELTA,
        };
        state.last_frame = Some(now);
        state.frame_index += 1;
        let registered = state.registered.clone();
        let one_shots = std::mem::take(&mut state.requested)
            .into_iter()
            .filter(|key| !registered.contains(key))
            .collect();
        Some(AnimationFrame {
            index: state.frame_index,
            delta,
            registered,
            one_shots,
        })
    }

    /// Begin a frame and step every due animation of `targets`. Returns `false` if the loop is
    /// suspended.
    pub fn tick(&self, now: Instant, targets: &mut [&mut dyn Animatable]) -> bool {
        let Some(frame) = self.begin_frame(now) else {
            return false;
        };
        for target in targets.iter_mut() {
            frame.run(self, &mut **target);
        }
        true
    }
}

/// The animations due in one frame of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    index: u64,
    delta: Duration,
    registered: Vec<AnimationKey>,
    one_shots: Vec<AnimationKey>,
}

impl AnimationFrame {
    /// Increases by one every frame.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Wall clock time since the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Is anything of `owner` due in this frame?
    pub fn is_due(&self, owner: ControlId) -> bool {
        self.registered
            .iter()
            .chain(self.one_shots.iter())
            .any(|key| key.owner == owner)
    }

    /// Step the animations of `target` that are due in this frame, returning how many ran.
    ///
    /// Registered animations are skipped if they were stopped earlier in the same frame.
    pub fn run<A: Animatable + ?Sized>(
        &self,
        scheduler: &AnimationScheduler,
        target: &mut A,
    ) -> usize {
        let owner = target.animation_owner();
        let mut ran = 0;
        for key in self.registered.iter().filter(|key| key.owner == owner) {
            if scheduler.is_animating(*key) {
                target.animate(key.channel, self.delta);
                ran += 1;
            }
        }
        for key in self.one_shots.iter().filter(|key| key.owner == owner) {
            target.animate(key.channel, self.delta);
            ran += 1;
        }
        ran
    }
}
