//! Observed properties and per-frame change batching.
//!
//! Writing an observed property through its setter does three things, in order:
//!
//! 1. calls the owner's `<property>_changed(previous)` hook, if it has one,
//! 2. synchronously delivers a [`ControlEvent::PropertyChanged`] to all listeners,
//! 3. queues a [`ControlEvent::Change`] that is delivered once, at the next frame boundary, with
//!    the latest value of every property written in the meantime.
//!
//! Nothing happens when the new value equals the old one.

use std::borrow::Cow;

use bevy_derive::Deref;

/// A property whose writes are observed.
///
/// Usually an enum with one variant per property, carrying the value.
pub trait ObservedProperty: Clone + PartialEq + Send + Sync + 'static {
    /// The property name, used to build event types and to coalesce changes.
    fn name(&self) -> &'static str;
}

/// A value that only reports writes that change it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deref)]
pub struct Observed<T>(T);

impl<T: PartialEq> Observed<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Store `value`, returning the previous value if it was different.
    pub fn replace(&mut self, value: T) -> Option<T> {
        if self.0 == value {
            return None;
        }
        Some(std::mem::replace(&mut self.0, value))
    }
}

/// An event emitted by an observed control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent<P> {
    /// A property was written with a new value. Delivered synchronously, in write order.
    PropertyChanged {
        /// The new value.
        value: P,
        /// The value before the write.
        previous: P,
    },
    /// Properties changed since the last frame. Delivered at most once per frame.
    Change {
        /// The latest value of each property that changed, in order of first change.
        changes: Vec<P>,
    },
}

impl<P: ObservedProperty> ControlEvent<P> {
    /// `"<property>-changed"` or `"change"`.
    pub fn event_type(&self) -> Cow<'static, str> {
        match self {
            ControlEvent::PropertyChanged { value, .. } => {
                Cow::Owned(format!("{}-changed", value.name()))
            }
            ControlEvent::Change { .. } => Cow::Borrowed("change"),
        }
    }
}

/// Identifies a listener added with [`PropertyEvents::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<P> = Box<dyn FnMut(&ControlEvent<P>) + Send + Sync>;

/// Listeners of a control's property events, and the change waiting for the next frame.
pub struct PropertyEvents<P> {
    listeners: Vec<(ListenerId, Listener<P>)>,
    pending_change: Option<Vec<P>>,
    next_listener: u64,
}

impl<P> Default for PropertyEvents<P> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            pending_change: None,
            next_listener: 0,
        }
    }
}

impl<P> std::fmt::Debug for PropertyEvents<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyEvents")
            .field("listeners", &self.listeners.len())
            .field("change_pending", &self.pending_change.is_some())
            .finish()
    }
}

impl<P: ObservedProperty> PropertyEvents<P> {
    /// Call `listener` with every event until it is removed.
    pub fn add_listener(
        &mut self,
        listener: impl FnMut(&ControlEvent<P>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the listener was already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Remove all listeners and drop the pending change.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.pending_change = None;
    }

    /// Is a [`ControlEvent::Change`] waiting for the next frame?
    pub fn is_change_pending(&self) -> bool {
        self.pending_change.is_some()
    }

    /// Report a property write.
    ///
    /// Returns `true` if this write queued a new change, meaning the owner has to request a frame
    /// to [`flush`](Self::flush) it. Further writes in the same frame only update the queued
    /// change.
    pub fn notify(&mut self, value: P, previous: P) -> bool {
        self.dispatch(&ControlEvent::PropertyChanged {
            value: value.clone(),
            previous,
        });
        match &mut self.pending_change {
            Some(changes) => {
                match changes.iter_mut().find(|change| change.name() == value.name()) {
                    Some(change) => *change = value,
                    None => changes.push(value),
                }
                false
            }
            None => {
                self.pending_change = Some(vec![value]);
                true
            }
        }
    }

    /// Deliver the queued change, if any.
    pub fn flush(&mut self) {
        if let Some(changes) = self.pending_change.take() {
            self.dispatch(&ControlEvent::Change { changes });
        }
    }

    fn dispatch(&mut self, event: &ControlEvent<P>) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

/// A type with observed properties.
pub trait PropertyObservable {
    /// The properties this type reports changes of.
    type Property: ObservedProperty;

    /// The events of this value.
    fn property_events(&mut self) -> &mut PropertyEvents<Self::Property>;

    /// Call `listener` with every property event until it is removed.
    fn add_listener(
        &mut self,
        listener: impl FnMut(&ControlEvent<Self::Property>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.property_events().add_listener(listener)
    }

    /// Returns `false` if the listener was already removed.
    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.property_events().remove_listener(id)
    }
}

/// Generate setters for [`Observed`] fields.
///
/// Each entry `setter(field: Type) => Variant, hook;` expands to a `pub fn setter(&mut self, value:
/// Type)` that stores the value and, if it changed, calls `self.hook(previous)` (the hook is
/// optional) and then `self.notify_property(Property::Variant(value), Property::Variant(previous))`.
macro_rules! observed_setters {
    (
        $property:ident;
        $(
            $(#[$attr:meta])*
            $setter:ident($field:ident: $ty:ty) => $variant:ident $(, $hook:ident)?;
        )*
    ) => {
        $(
            $(#[$attr])*
            pub fn $setter(&mut self, value: $ty) {
                let Some(previous) = self.$field.replace(value) else {
                    return;
                };
                $(self.$hook(previous);)?
                self.notify_property($property::$variant(value), $property::$variant(previous));
            }
        )*
    };
}

pub(crate) use observed_setters;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Light {
        On(bool),
        Level(u8),
    }

    impl ObservedProperty for Light {
        fn name(&self) -> &'static str {
            match self {
                Light::On(_) => "on",
                Light::Level(_) => "level",
            }
        }
    }

    fn recorded(events: &mut PropertyEvents<Light>) -> Arc<Mutex<Vec<ControlEvent<Light>>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        events.add_listener(move |event| sink.lock().unwrap().push(event.clone()));
        log
    }

    #[test]
    fn observed_ignores_equal_writes() {
        let mut level = Observed::new(3u8);
        assert_eq!(level.replace(3), None);
        assert_eq!(level.replace(4), Some(3));
        assert_eq!(*level, 4);
    }

    #[test]
    fn property_events_are_immediate_and_changes_coalesce() {
        let mut events = PropertyEvents::default();
        let log = recorded(&mut events);

        assert!(events.notify(Light::Level(1), Light::Level(0)));
        assert!(!events.notify(Light::Level(2), Light::Level(1)));
        assert!(!events.notify(Light::On(true), Light::On(false)));
        assert!(!events.notify(Light::Level(3), Light::Level(2)));
        assert_eq!(log.lock().unwrap().len(), 4);
        assert!(events.is_change_pending());

        events.flush();
        events.flush();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 5);
        assert_eq!(
            log[4],
            ControlEvent::Change {
                changes: vec![Light::Level(3), Light::On(true)]
            }
        );
        assert_eq!(log[0].event_type(), "level-changed");
        assert_eq!(log[4].event_type(), "change");
    }

    #[test]
    fn removed_listeners_are_not_called() {
        let mut events = PropertyEvents::default();
        let log = Arc::new(Mutex::new(0));
        let counter = log.clone();
        let id = events.add_listener(move |_| *counter.lock().unwrap() += 1);
        events.notify(Light::On(true), Light::On(false));
        assert!(events.remove_listener(id));
        assert!(!events.remove_listener(id));
        events.flush();
        assert_eq!(*log.lock().unwrap(), 1);
    }
}
