//! C entry points for hosts that embed the registry without a scripting
//! bridge. Property values travel as JSON strings.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Arc;

use crate::platform::LogReporter;
use crate::props::PropertyValue;
use crate::registry::{ViewId, ViewRegistry};

#[repr(C)]
pub struct CanvasDomRegistryHandle(*const ViewRegistry);

/// # Safety
/// `ptr` is null or a valid NUL terminated string.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// # Safety
/// `handle` was returned by [`canvas_dom_registry_new`] and not yet freed.
unsafe fn registry<'a>(handle: &CanvasDomRegistryHandle) -> Option<&'a ViewRegistry> {
    handle.0.as_ref()
}

#[no_mangle]
pub extern "C" fn canvas_dom_registry_new() -> CanvasDomRegistryHandle {
    let registry = ViewRegistry::new(Arc::new(LogReporter));
    CanvasDomRegistryHandle(Arc::into_raw(registry))
}

/// Stores a JSON encoded custom property for `view_id`. Returns false when
/// an argument is malformed or the value is rejected.
///
/// # Safety
/// `handle` comes from [`canvas_dom_registry_new`]; `name` and `json` are
/// NUL terminated strings.
#[no_mangle]
pub unsafe extern "C" fn canvas_dom_set_property_json(
    handle: CanvasDomRegistryHandle,
    view_id: u64,
    name: *const c_char,
    json: *const c_char,
) -> bool {
    let (Some(registry), Some(name), Some(json)) = (registry(&handle), str_arg(name), str_arg(json)) else {
        return false;
    };
    let value = match serde_json::from_str::<serde_json::Value>(json) {
        Ok(value) => PropertyValue::from(value),
        Err(err) => {
            log::warn!("invalid JSON for property {name}: {err}");
            return false;
        }
    };

    match registry.set_custom_property(ViewId(view_id), name, value) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("setting property {name} on view {view_id} failed: {err}");
            false
        }
    }
}

/// # Safety
/// `handle` comes from [`canvas_dom_registry_new`].
#[no_mangle]
pub unsafe extern "C" fn canvas_dom_request_redraw(handle: CanvasDomRegistryHandle, view_id: u64) {
    if let Some(registry) = registry(&handle) {
        registry.request_redraw(ViewId(view_id));
    }
}

/// Returns whether `view_id` was known.
///
/// # Safety
/// `handle` comes from [`canvas_dom_registry_new`].
#[no_mangle]
pub unsafe extern "C" fn canvas_dom_unregister_view(handle: CanvasDomRegistryHandle, view_id: u64) -> bool {
    let Some(registry) = registry(&handle) else {
        return false;
    };
    let id = ViewId(view_id);
    let known = registry.contains(id);
    registry.unregister_view(id);
    known
}

/// Invalidates every view and releases the registry.
///
/// # Safety
/// `handle` comes from [`canvas_dom_registry_new`] and is not used again.
#[no_mangle]
pub unsafe extern "C" fn canvas_dom_registry_free(handle: CanvasDomRegistryHandle) {
    if !handle.0.is_null() {
        let registry = Arc::from_raw(handle.0);
        registry.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn copy(handle: &CanvasDomRegistryHandle) -> CanvasDomRegistryHandle {
        CanvasDomRegistryHandle(handle.0)
    }

    #[test]
    fn json_properties_round_trip_through_the_handle() {
        let handle = canvas_dom_registry_new();
        let name = CString::new("mode").unwrap();
        let json = CString::new("\"continuous\"").unwrap();
        let broken = CString::new("{").unwrap();

        unsafe {
            assert!(canvas_dom_set_property_json(copy(&handle), 3, name.as_ptr(), json.as_ptr()));
            assert!(!canvas_dom_set_property_json(copy(&handle), 3, name.as_ptr(), broken.as_ptr()));
            assert!(!canvas_dom_set_property_json(copy(&handle), 3, std::ptr::null(), json.as_ptr()));

            let pending = registry(&handle).unwrap().pending_properties(ViewId(3)).unwrap();
            assert_eq!(pending.value("mode"), Some(&PropertyValue::from("continuous")));

            canvas_dom_request_redraw(copy(&handle), 3);
            assert!(canvas_dom_unregister_view(copy(&handle), 3));
            assert!(!canvas_dom_unregister_view(copy(&handle), 3));
            canvas_dom_registry_free(handle);
        }
    }
}
