use prism_core::ids::ResourceId;
use prism_core::providers::WatchHandle;

/// The two independent watch axes. Exactly one record may be active per
/// axis; both may be inactive when nothing is bound yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    FocusedSubject,
    LiveStatus,
}

struct Record {
    owner: ResourceId,
    handle: WatchHandle,
}

/// Owns the scoped resource-watch subscriptions whose lifetime tracks the
/// current subject and mode.
#[derive(Default)]
pub struct SubscriptionSet {
    focused: Option<Record>,
    live: Option<Record>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-key an axis to a new owner. An existing record for a different
    /// owner is disposed first; re-binding to the same owner is a no-op so
    /// unrelated events can't trigger duplicate refreshes. `None` owner
    /// just disposes.
    pub fn rebind(
        &mut self,
        axis: Axis,
        owner: Option<&ResourceId>,
        bind: impl FnOnce(&ResourceId) -> WatchHandle,
    ) {
        let slot = self.slot_mut(axis);
        let same_owner = slot
            .as_ref()
            .map_or(false, |record| owner == Some(&record.owner));
        if same_owner {
            return;
        }
        if let Some(record) = slot.take() {
            record.handle.dispose();
        }
        if let Some(o) = owner {
            *slot = Some(Record {
                owner: o.clone(),
                handle: bind(o),
            });
        }
    }

    /// Dispose an axis's record, if any. Safe to call repeatedly.
    pub fn dispose(&mut self, axis: Axis) {
        if let Some(record) = self.slot_mut(axis).take() {
            record.handle.dispose();
        }
    }

    pub fn dispose_all(&mut self) {
        self.dispose(Axis::FocusedSubject);
        self.dispose(Axis::LiveStatus);
    }

    pub fn is_active(&self, axis: Axis) -> bool {
        self.slot(axis).is_some()
    }

    pub fn owner(&self, axis: Axis) -> Option<&ResourceId> {
        self.slot(axis).as_ref().map(|r| &r.owner)
    }

    fn slot(&self, axis: Axis) -> &Option<Record> {
        match axis {
            Axis::FocusedSubject => &self.focused,
            Axis::LiveStatus => &self.live,
        }
    }

    fn slot_mut(&mut self, axis: Axis) -> &mut Option<Record> {
        match axis {
            Axis::FocusedSubject => &mut self.focused,
            Axis::LiveStatus => &mut self.live,
        }
    }
}
