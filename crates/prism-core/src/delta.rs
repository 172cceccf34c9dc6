use serde_json::{Map, Value};

use crate::context::{DerivedFields, LiveStatus, PanelMode};
use crate::subject::Subject;

/// A partial overlay of `Context`: queued-but-undispatched changes.
///
/// At most one pending delta exists at a time; every mutation either creates
/// it or deep-merges into it, and it is discarded when folded into the
/// committed context on dispatch. Internal to the engine, never on the wire.
///
/// `subject` and `live_status` are doubly optional so a delta can express
/// "clear this field" (`Some(None)`) distinctly from "leave it alone" (`None`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextDelta {
    pub mode: Option<PanelMode>,
    pub navigation: Option<NavigationDelta>,
    pub pinned: Option<bool>,
    pub preferences: Option<Map<String, Value>>,
    pub subject: Option<Option<Subject>>,
    pub rich_data_loaded: Option<bool>,
    pub derived: Option<DerivedFields>,
    pub live_status: Option<Option<LiveStatus>>,
    pub org_settings: Option<Map<String, Value>>,
}

impl ContextDelta {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.navigation.as_ref().map_or(true, NavigationDelta::is_empty)
            && self.pinned.is_none()
            && self.preferences.as_ref().map_or(true, Map::is_empty)
            && self.subject.is_none()
            && self.rich_data_loaded.is_none()
            && self.derived.is_none()
            && self.live_status.is_none()
            && self.org_settings.as_ref().map_or(true, Map::is_empty)
    }
}

/// Field-wise overlay for the nested navigation object. Merged by name so an
/// update to, say, `position` leaves an already-pending `hint` untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigationDelta {
    pub count: Option<u32>,
    pub position: Option<u32>,
    pub hint: Option<Option<String>>,
}

impl NavigationDelta {
    pub fn is_empty(&self) -> bool {
        self.count.is_none() && self.position.is_none() && self.hint.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delta_is_empty() {
        assert!(ContextDelta::default().is_empty());
        assert!(NavigationDelta::default().is_empty());
    }

    #[test]
    fn any_field_makes_delta_non_empty() {
        let d = ContextDelta {
            pinned: Some(true),
            ..Default::default()
        };
        assert!(!d.is_empty());

        let d = ContextDelta {
            subject: Some(None),
            ..Default::default()
        };
        assert!(!d.is_empty(), "clearing the subject is a real change");
    }

    #[test]
    fn empty_nested_objects_do_not_count() {
        let d = ContextDelta {
            navigation: Some(NavigationDelta::default()),
            preferences: Some(Map::new()),
            ..Default::default()
        };
        assert!(d.is_empty());
    }
}
