//! Native views keyed by the id the host assigned them.
//!
//! The scripting side may set properties on a view before the platform has
//! created it. Those are kept as pending properties and applied, in the
//! order they were set, once the view registers.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use crate::dependency::{DependencyManager, Unsubscribe};
use crate::errors::ViewError;
use crate::platform::ErrorReporter;
use crate::props::{PropertyContainer, PropertyValue};
use crate::values::SharedValue;
use crate::view::DrawView;

mod api;

pub use api::ViewApi;

/// Host-assigned identifier of a native view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

impl Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ViewId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Default)]
struct ViewInfo {
    view: Option<Arc<DrawView>>,
    props: PropertyContainer,
    subscriptions: Vec<Unsubscribe>,
}

impl ViewInfo {
    fn release_subscriptions(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }
}

/// Registry of every view of one scripting runtime.
///
/// Calls into a [`DrawView`] happen with the registry lock released, so
/// views may call back into the registry.
pub struct ViewRegistry {
    me: Weak<ViewRegistry>,
    views: Mutex<HashMap<ViewId, ViewInfo>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ViewRegistry {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            views: Mutex::new(HashMap::new()),
            reporter,
        })
    }

    fn views(&self) -> MutexGuard<'_, HashMap<ViewId, ViewInfo>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.reporter
    }

    pub fn view(&self, id: ViewId) -> Option<Arc<DrawView>> {
        self.views().get(&id).and_then(|info| info.view.clone())
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.views().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.views().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views().is_empty()
    }

    /// Copy of the properties stored for `id`.
    pub fn pending_properties(&self, id: ViewId) -> Option<PropertyContainer> {
        self.views().get(&id).map(|info| info.props.clone())
    }

    /// Stores `value` for `id` and, when the view exists, applies it and
    /// requests a redraw.
    pub fn set_custom_property(
        &self,
        id: ViewId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), ViewError> {
        let value = Arc::new(value.into());
        let view = {
            let mut views = self.views();
            let info = views.entry(id).or_default();
            info.props.set_property(name, value.clone())?;
            info.view.clone()
        };

        if let Some(view) = view {
            view.set_custom_property(name, &value)?;
            view.request_redraw();
        }
        Ok(())
    }

    /// Associates `view` with `id` and applies its pending properties.
    pub fn register_view(&self, id: ViewId, view: Arc<DrawView>) {
        let props = {
            let mut views = self.views();
            let info = views.entry(id).or_default();
            info.view = Some(view.clone());
            info.props.clone()
        };

        view.set_native_id(id);
        view.apply_custom_properties(&props);
        view.request_redraw();
        log::debug!("registered view {id}");
    }

    /// Attaches or detaches the view of an existing entry. Pending
    /// properties are kept either way.
    pub fn set_view(&self, id: ViewId, view: Option<Arc<DrawView>>) {
        let attached = {
            let mut views = self.views();
            let Some(info) = views.get_mut(&id) else {
                log::debug!("set_view on unknown view {id}");
                return;
            };
            info.view = view.clone();
            view.map(|view| (view, info.props.clone()))
        };

        if let Some((view, props)) = attached {
            view.set_native_id(id);
            view.apply_custom_properties(&props);
            view.request_redraw();
        }
    }

    /// Removes the entry for `id` and releases its value subscriptions.
    pub fn unregister_view(&self, id: ViewId) -> Option<Arc<DrawView>> {
        let mut info = self.views().remove(&id)?;
        info.release_subscriptions();
        log::debug!("unregistered view {id}");
        info.view
    }

    pub fn unregister_all(&self) {
        let drained: Vec<ViewInfo> = self.views().drain().map(|(_, info)| info).collect();
        for mut info in drained {
            info.release_subscriptions();
        }
    }

    /// Tears down every view and forgets them. Used when the scripting
    /// runtime goes away.
    pub fn invalidate(&self) {
        let drained: Vec<ViewInfo> = self.views().drain().map(|(_, info)| info).collect();
        for mut info in drained {
            info.release_subscriptions();
            if let Some(view) = info.view {
                view.teardown();
            }
        }
    }

    pub fn request_redraw(&self, id: ViewId) {
        if let Some(view) = self.view(id) {
            view.request_redraw();
        }
    }

    pub fn call_custom_action(
        &self,
        id: ViewId,
        name: &str,
        args: &[PropertyValue],
    ) -> Result<PropertyValue, ViewError> {
        let view = self.view(id).ok_or_else(|| ViewError::ViewNotReady {
            view_id: id,
            action: name.to_string(),
        })?;
        view.call_custom_action(name, args)
    }

    /// Requests a redraw of `id` whenever one of `values` changes.
    ///
    /// The returned handle is shared with the registry: whichever of the
    /// caller or [`unregister_view`](Self::unregister_view) releases it
    /// first wins.
    pub fn register_values_in_view(&self, id: ViewId, values: &[SharedValue]) -> Unsubscribe {
        let subscriptions = values
            .iter()
            .map(|value| {
                let registry = self.me.clone();
                DependencyManager::subscribe(value, move |_| {
                    if let Some(registry) = registry.upgrade() {
                        registry.request_redraw(id);
                    }
                })
            })
            .collect();
        let unsubscribe = Unsubscribe::new(subscriptions);

        let mut views = self.views();
        let info = views.entry(id).or_default();
        info.subscriptions.retain(|s| !s.is_released());
        info.subscriptions.push(unsubscribe.clone());
        unsubscribe
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry").field("views", &self.len()).finish()
    }
}
