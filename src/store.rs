//! # Interactive Parameter Store
//!
//! Single source of truth for the interactive inputs: measurement duration,
//! time range, measurement window and model mode.
//!
//! The store is an explicitly constructed value handed to collaborators by
//! reference. State is only changed through the setters. Each setter clamps its
//! inputs, builds a candidate state and compares it field by field with the
//! current one. Listeners are called synchronously with the new snapshot only
//! when at least one field changed, so a control re-reporting its current value
//! never triggers a recomputation.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use flowspec::store::ParameterStore;
//!
//! let mut store = ParameterStore::new();
//! let calls = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&calls);
//! store.subscribe(move |_state| seen.set(seen.get() + 1));
//!
//! store.set_duration(0.7);
//! store.set_duration(0.7);
//! assert_eq!(calls.get(), 1);
//! ```

use serde::Serialize;

/// Smallest normalized window size / duration
pub const MIN_WINDOW_NORM: f64 = 0.02;

/// Smallest accepted time span for [`ParameterStore::set_time_range`]
pub const MIN_TIME_SPAN: f64 = 1e-6;

/// Snapshot of the interactive inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterState {
    /// Normalized measurement duration, `[MIN_WINDOW_NORM, 1]`
    pub delta_t_norm: f64,
    /// Start of the simulated time range
    pub t_min: f64,
    /// End of the simulated time range
    pub t_max: f64,
    /// Normalized window center, `[0, 1]`
    pub window_center: f64,
    /// Normalized window size, `[MIN_WINDOW_NORM, 1]`
    pub window_size_norm: f64,
    /// Selected emission model
    pub model_mode: bool,
}

impl Default for ParameterState {
    fn default() -> Self {
        Self {
            delta_t_norm: 0.5,
            t_min: 0.0,
            t_max: 10.0,
            window_center: 0.5,
            window_size_norm: 0.3,
            model_mode: true,
        }
    }
}

impl ParameterState {
    /// Normalized window edges `(start, end)`, clamped to `[0, 1]`
    pub fn window_edges(&self) -> (f64, f64) {
        let half = self.window_size_norm / 2.0;
        (
            (self.window_center - half).max(0.0),
            (self.window_center + half).min(1.0),
        )
    }
}

/// Handle returned by [`ParameterStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ParameterState)>;

/// Owner of the process-wide [`ParameterState`] with change notification
pub struct ParameterStore {
    state: ParameterState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ParameterStore {
    /// Create a store holding the default state
    pub fn new() -> Self {
        Self::with_state(ParameterState::default())
    }

    /// Create a store holding `state`
    pub fn with_state(state: ParameterState) -> Self {
        Self {
            state,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> ParameterState {
        self.state
    }

    /// Normalized window edges of the current state
    pub fn window_edges(&self) -> (f64, f64) {
        self.state.window_edges()
    }

    /// Register a listener called with every committed state
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ParameterState) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Set the normalized duration; the window size follows it.
    pub fn set_duration(&mut self, value: f64) -> ParameterState {
        if !value.is_finite() {
            return self.ignore("set_duration", value);
        }
        let v = value.clamp(MIN_WINDOW_NORM, 1.0);
        self.commit(ParameterState {
            delta_t_norm: v,
            window_size_norm: v,
            ..self.state
        })
    }

    /// Set the window by normalized center and size.
    pub fn set_window(&mut self, center: f64, size_norm: f64) -> ParameterState {
        if !(center.is_finite() && size_norm.is_finite()) {
            return self.ignore("set_window", center);
        }
        self.commit(ParameterState {
            window_center: center.clamp(0.0, 1.0),
            window_size_norm: size_norm.clamp(MIN_WINDOW_NORM, 1.0),
            ..self.state
        })
    }

    /// Set the window by normalized edges; the duration follows the size.
    pub fn set_window_edges(&mut self, start: f64, end: f64) -> ParameterState {
        if !(start.is_finite() && end.is_finite()) {
            return self.ignore("set_window_edges", start);
        }
        let start = start.clamp(0.0, 1.0 - MIN_WINDOW_NORM);
        let end = end.max(start + MIN_WINDOW_NORM).min(1.0);
        let size = end - start;
        self.commit(ParameterState {
            window_center: (start + end) / 2.0,
            window_size_norm: size,
            delta_t_norm: size,
            ..self.state
        })
    }

    /// Select the emission model.
    pub fn set_model_mode(&mut self, model_mode: bool) -> ParameterState {
        self.commit(ParameterState {
            model_mode,
            ..self.state
        })
    }

    /// Set the simulated time range; a reversed pair is swapped.
    pub fn set_time_range(&mut self, t_min: f64, t_max: f64) -> ParameterState {
        if !(t_min.is_finite() && t_max.is_finite()) {
            return self.ignore("set_time_range", t_min);
        }
        let (lo, hi) = if t_min <= t_max { (t_min, t_max) } else { (t_max, t_min) };
        self.commit(ParameterState {
            t_min: lo,
            t_max: hi.max(lo + MIN_TIME_SPAN),
            ..self.state
        })
    }

    fn ignore(&self, setter: &str, value: f64) -> ParameterState {
        log::debug!("{} ignored non-finite input {}", setter, value);
        self.state
    }

    fn commit(&mut self, candidate: ParameterState) -> ParameterState {
        if candidate == self.state {
            return self.state;
        }
        self.state = candidate;
        let snapshot = self.state;
        for (_, listener) in self.listeners.iter_mut() {
            listener(&snapshot);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_store() -> (ParameterStore, Rc<RefCell<Vec<ParameterState>>>) {
        let mut store = ParameterStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |state| sink.borrow_mut().push(*state));
        (store, seen)
    }

    #[test]
    fn test_default_state() {
        let store = ParameterStore::new();
        let state = store.state();
        assert_eq!(state.delta_t_norm, 0.5);
        assert_eq!(state.t_min, 0.0);
        assert_eq!(state.t_max, 10.0);
        assert_eq!(state.window_center, 0.5);
        assert_eq!(state.window_size_norm, 0.3);
        assert!(state.model_mode);
    }

    #[test]
    fn test_duplicate_value_notifies_once() {
        let (mut store, seen) = recording_store();
        store.set_duration(0.7);
        store.set_duration(0.7);

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].delta_t_norm, 0.7);
        assert_eq!(store.state().window_size_norm, 0.7);
    }

    #[test]
    fn test_clamped_duplicates_do_not_notify() {
        let (mut store, seen) = recording_store();
        store.set_duration(5.0);
        store.set_duration(1.0);
        store.set_duration(2.0);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(store.state().delta_t_norm, 1.0);

        store.set_duration(-1.0);
        assert_eq!(store.state().delta_t_norm, MIN_WINDOW_NORM);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let (mut store, seen) = recording_store();
        let before = store.state();
        assert_eq!(store.set_duration(f64::NAN), before);
        assert_eq!(store.set_window(f64::INFINITY, 0.3), before);
        assert_eq!(store.set_window_edges(0.1, f64::NAN), before);
        assert_eq!(store.set_time_range(f64::NAN, 1.0), before);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_set_window() {
        let mut store = ParameterStore::new();
        let state = store.set_window(0.5, 0.3);
        assert_eq!(state.window_center, 0.5);
        assert_eq!(state.window_size_norm, 0.3);

        let state = store.set_window(1.4, 0.0);
        assert_eq!(state.window_center, 1.0);
        assert_eq!(state.window_size_norm, MIN_WINDOW_NORM);

        let (start, end) = store.window_edges();
        assert!(start >= 0.0 && end <= 1.0 && start < end);
    }

    #[test]
    fn test_set_window_edges_syncs_duration() {
        let mut store = ParameterStore::new();
        let state = store.set_window_edges(0.2, 0.6);

        assert!((state.window_center - 0.4).abs() < 1e-12);
        assert!((state.window_size_norm - 0.4).abs() < 1e-12);
        assert_eq!(state.delta_t_norm, state.window_size_norm);
        assert!(state.window_center >= 0.2 && state.window_center <= 0.6);
    }

    #[test]
    fn test_set_window_edges_enforces_minimum() {
        let mut store = ParameterStore::new();
        let state = store.set_window_edges(0.5, 0.4);
        assert!((state.window_size_norm - MIN_WINDOW_NORM).abs() < 1e-12);

        let state = store.set_window_edges(1.0, 1.0);
        let (start, end) = state.window_edges();
        assert!(end <= 1.0);
        assert!(end - start >= MIN_WINDOW_NORM - 1e-12);
    }

    #[test]
    fn test_model_mode() {
        let (mut store, seen) = recording_store();
        store.set_model_mode(true);
        assert!(seen.borrow().is_empty());

        store.set_model_mode(false);
        assert!(!store.state().model_mode);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_set_time_range() {
        let mut store = ParameterStore::new();
        let state = store.set_time_range(20.0, 5.0);
        assert_eq!(state.t_min, 5.0);
        assert_eq!(state.t_max, 20.0);

        let state = store.set_time_range(3.0, 3.0);
        assert!(state.t_max > state.t_min);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = ParameterStore::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.subscribe(move |_| *sink.borrow_mut() += 1);
        assert_eq!(store.listener_count(), 1);

        store.set_duration(0.4);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_duration(0.6);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_listeners_receive_committed_snapshot() {
        let (mut store, seen) = recording_store();
        let committed = store.set_window(0.25, 0.5);
        assert_eq!(seen.borrow().last(), Some(&committed));
        assert_eq!(store.state(), committed);
    }
}
