//! Pending-delta merge engine.
//!
//! All context mutation funnels through [`apply_delta`]: a structural,
//! field-by-field comparison against the effective (pending-overlaid) view
//! drops no-op writes before they can dirty the pending delta, and nested
//! objects merge by name so unrelated pending fields survive.

use prism_core::context::Context;
use prism_core::delta::{ContextDelta, NavigationDelta};

/// Merge a proposed delta into the pending overlay.
///
/// Unless `force` is set, fields whose proposed value deep-equals the
/// effective value are dropped first, so a delta of pure no-ops leaves the
/// pending state untouched and returns `changed = false`.
pub fn apply_delta(
    context: &Context,
    pending: Option<ContextDelta>,
    delta: ContextDelta,
    force: bool,
) -> (bool, Option<ContextDelta>) {
    let delta = if force {
        delta
    } else {
        prune(&effective(context, pending.as_ref()), delta)
    };

    if delta.is_empty() {
        return (false, pending);
    }

    let merged = match pending {
        Some(mut p) => {
            merge_into(&mut p, delta);
            p
        }
        None => delta,
    };
    (true, Some(merged))
}

/// The merged view: pending overlaid on the committed context.
pub fn effective(context: &Context, pending: Option<&ContextDelta>) -> Context {
    let mut view = context.clone();
    if let Some(p) = pending {
        fold(&mut view, p.clone());
    }
    view
}

/// Apply a delta to a committed context in place.
pub fn fold(context: &mut Context, delta: ContextDelta) {
    if let Some(mode) = delta.mode {
        context.mode = mode;
    }
    if let Some(nav) = delta.navigation {
        if let Some(count) = nav.count {
            context.navigation.count = count;
        }
        if let Some(position) = nav.position {
            context.navigation.position = position;
        }
        if let Some(hint) = nav.hint {
            context.navigation.hint = hint;
        }
    }
    if let Some(pinned) = delta.pinned {
        context.pinned = pinned;
    }
    if let Some(prefs) = delta.preferences {
        for (key, value) in prefs {
            context.preferences.insert(key, value);
        }
    }
    if let Some(subject) = delta.subject {
        context.subject = subject;
    }
    if let Some(rich) = delta.rich_data_loaded {
        context.rich_data_loaded = rich;
    }
    if let Some(derived) = delta.derived {
        context.derived = derived;
    }
    if let Some(status) = delta.live_status {
        context.live_status = status;
    }
    if let Some(org) = delta.org_settings {
        for (key, value) in org {
            context.org_settings.insert(key, value);
        }
    }
}

/// Drop delta fields whose proposed value equals the effective value.
fn prune(effective: &Context, mut delta: ContextDelta) -> ContextDelta {
    if delta.mode == Some(effective.mode) {
        delta.mode = None;
    }
    if let Some(nav) = delta.navigation.take() {
        let nav = NavigationDelta {
            count: nav.count.filter(|c| *c != effective.navigation.count),
            position: nav.position.filter(|p| *p != effective.navigation.position),
            hint: nav.hint.filter(|h| *h != effective.navigation.hint),
        };
        if !nav.is_empty() {
            delta.navigation = Some(nav);
        }
    }
    if delta.pinned == Some(effective.pinned) {
        delta.pinned = None;
    }
    if let Some(mut prefs) = delta.preferences.take() {
        prefs.retain(|key, value| effective.preferences.get(key) != Some(value));
        if !prefs.is_empty() {
            delta.preferences = Some(prefs);
        }
    }
    if delta.subject.as_ref() == Some(&effective.subject) {
        delta.subject = None;
    }
    if delta.rich_data_loaded == Some(effective.rich_data_loaded) {
        delta.rich_data_loaded = None;
    }
    if delta.derived.as_ref() == Some(&effective.derived) {
        delta.derived = None;
    }
    if delta.live_status.as_ref() == Some(&effective.live_status) {
        delta.live_status = None;
    }
    if let Some(mut org) = delta.org_settings.take() {
        org.retain(|key, value| effective.org_settings.get(key) != Some(value));
        if !org.is_empty() {
            delta.org_settings = Some(org);
        }
    }
    delta
}

/// Deep-merge a newer delta over a pending one. Scalar fields replace;
/// nested `navigation`, `preferences`, and `org_settings` merge by name.
fn merge_into(pending: &mut ContextDelta, delta: ContextDelta) {
    if delta.mode.is_some() {
        pending.mode = delta.mode;
    }
    if let Some(nav) = delta.navigation {
        let merged = pending.navigation.get_or_insert_with(NavigationDelta::default);
        if nav.count.is_some() {
            merged.count = nav.count;
        }
        if nav.position.is_some() {
            merged.position = nav.position;
        }
        if nav.hint.is_some() {
            merged.hint = nav.hint;
        }
    }
    if delta.pinned.is_some() {
        pending.pinned = delta.pinned;
    }
    if let Some(prefs) = delta.preferences {
        let merged = pending.preferences.get_or_insert_with(Default::default);
        for (key, value) in prefs {
            merged.insert(key, value);
        }
    }
    if delta.subject.is_some() {
        pending.subject = delta.subject;
    }
    if delta.rich_data_loaded.is_some() {
        pending.rich_data_loaded = delta.rich_data_loaded;
    }
    if delta.derived.is_some() {
        pending.derived = delta.derived;
    }
    if delta.live_status.is_some() {
        pending.live_status = delta.live_status;
    }
    if let Some(org) = delta.org_settings {
        let merged = pending.org_settings.get_or_insert_with(Default::default);
        for (key, value) in org {
            merged.insert(key, value);
        }
    }
}
