use std::sync::Arc;

use crate::dependency::Unsubscribe;
use crate::errors::ViewError;
use crate::props::PropertyValue;
use crate::registry::{ViewId, ViewRegistry};
use crate::values::SharedValue;

/// Scripting-facing entry points of a [`ViewRegistry`].
///
/// Arguments arrive as untyped lists. Malformed lists are reported through
/// the registry's error reporter and answered with `Null` instead of
/// failing the call.
#[derive(Clone, Debug)]
pub struct ViewApi {
    registry: Arc<ViewRegistry>,
}

impl ViewApi {
    pub fn new(registry: Arc<ViewRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ViewRegistry> {
        &self.registry
    }

    fn report(&self, err: ViewError) {
        let err = anyhow::Error::new(err);
        self.registry.reporter().report("Invalid arguments", Some(&err));
    }

    /// `setJsiProperty(viewId, name, value)`
    pub fn set_custom_property(&self, args: &[PropertyValue]) -> PropertyValue {
        const FUNCTION: &str = "setJsiProperty";

        let parsed = match args {
            [id, name, value] => view_id(FUNCTION, id)
                .and_then(|id| string_arg(FUNCTION, name, "second").map(|name| (id, name, value))),
            _ => Err(ViewError::invalid_argument(
                FUNCTION,
                format!("expected 3 arguments, got {}", args.len()),
            )),
        };

        let applied = parsed.and_then(|(id, name, value)| {
            self.registry.set_custom_property(id, name, value.clone())
        });
        if let Err(err) = applied {
            self.report(err);
        }
        PropertyValue::Null
    }

    /// `callJsiMethod(viewId, name, ...args)`
    ///
    /// Missing views and unknown actions are errors of the call itself and
    /// are returned rather than reported.
    pub fn call_custom_action(&self, args: &[PropertyValue]) -> Result<PropertyValue, ViewError> {
        const FUNCTION: &str = "callJsiMethod";

        let parsed = match args {
            [id, name, rest @ ..] => view_id(FUNCTION, id)
                .and_then(|id| string_arg(FUNCTION, name, "second").map(|name| (id, name, rest))),
            _ => Err(ViewError::invalid_argument(
                FUNCTION,
                format!("expected at least 2 arguments, got {}", args.len()),
            )),
        };

        match parsed {
            Ok((id, name, rest)) => self.registry.call_custom_action(id, name, rest),
            Err(err) => {
                self.report(err);
                Ok(PropertyValue::Null)
            }
        }
    }

    /// `registerValuesInView(viewId, values)`
    pub fn register_values_in_view(&self, args: &[PropertyValue]) -> Option<Unsubscribe> {
        const FUNCTION: &str = "registerValuesInView";

        let parsed = match args {
            [id, values] => view_id(FUNCTION, id).and_then(|id| shared_values(values).map(|v| (id, v))),
            _ => Err(ViewError::invalid_argument(
                FUNCTION,
                format!("expected 2 arguments, got {}", args.len()),
            )),
        };

        match parsed {
            Ok((id, values)) => Some(self.registry.register_values_in_view(id, &values)),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }
}

fn view_id(function: &'static str, arg: &PropertyValue) -> Result<ViewId, ViewError> {
    match arg.as_number() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(ViewId(n as u64)),
        _ => Err(ViewError::invalid_argument(
            function,
            format!("expected a view id as first argument, got {}", arg.type_name()),
        )),
    }
}

fn string_arg<'a>(
    function: &'static str,
    arg: &'a PropertyValue,
    position: &str,
) -> Result<&'a str, ViewError> {
    arg.as_str().ok_or_else(|| {
        ViewError::invalid_argument(
            function,
            format!("expected a string as {position} argument, got {}", arg.type_name()),
        )
    })
}

fn shared_values(arg: &PropertyValue) -> Result<Vec<SharedValue>, ViewError> {
    const FUNCTION: &str = "registerValuesInView";

    let items = arg.as_array().ok_or_else(|| {
        ViewError::invalid_argument(FUNCTION, "expected an array of values as second argument")
    })?;

    items
        .iter()
        .map(|item| {
            item.downcast_host::<SharedValue>().cloned().ok_or_else(|| {
                ViewError::invalid_argument(
                    FUNCTION,
                    format!("expected shared values, got {}", item.type_name()),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::platform::{CollectingReporter, ManualPlatform};
    use crate::props::names;
    use crate::render::{RecordingSurface, SurfaceSize};
    use crate::view::{DrawCallback, DrawView, DrawingMode};

    fn api() -> (ViewApi, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::new());
        (ViewApi::new(ViewRegistry::new(reporter.clone())), reporter)
    }

    fn num(n: f64) -> PropertyValue {
        PropertyValue::Number(n)
    }

    fn s(text: &str) -> PropertyValue {
        PropertyValue::from(text)
    }

    #[test]
    fn set_property_validates_arguments() {
        let (api, reporter) = api();

        assert_eq!(api.set_custom_property(&[num(1.0)]), PropertyValue::Null);
        assert_eq!(api.set_custom_property(&[s("1"), s("mode"), s("default")]), PropertyValue::Null);
        assert_eq!(api.set_custom_property(&[num(1.0), PropertyValue::Bool(true), s("default")]), PropertyValue::Null);
        assert_eq!(reporter.len(), 3);
        assert!(reporter.reports()[0].contains("expected 3 arguments, got 1"));
        assert!(!api.registry().contains(ViewId(1)));

        api.set_custom_property(&[num(1.0), s(names::MODE), s("continuous")]);
        assert_eq!(reporter.len(), 3);
        let pending = api.registry().pending_properties(ViewId(1)).unwrap();
        assert_eq!(pending.value(names::MODE).and_then(PropertyValue::as_str), Some("continuous"));
    }

    #[test]
    fn actions_report_bad_arguments_but_return_view_errors() {
        let (api, reporter) = api();

        assert_eq!(api.call_custom_action(&[num(1.0)]).unwrap(), PropertyValue::Null);
        assert_eq!(reporter.len(), 1);

        let err = api.call_custom_action(&[num(1.0), s("redraw")]).unwrap_err();
        assert!(matches!(err, ViewError::ViewNotReady { .. }));

        let platform = Arc::new(ManualPlatform::default());
        let view = DrawView::new(ViewConfig::default(), platform, reporter.clone());
        api.registry().register_view(ViewId(1), view.clone());

        api.call_custom_action(&[num(1.0), s("setDrawingMode"), s("continuous")])
            .unwrap();
        assert_eq!(view.mode(), DrawingMode::Continuous);
        assert!(matches!(
            api.call_custom_action(&[num(1.0), s("fly")]),
            Err(ViewError::UnknownAction(_))
        ));
    }

    #[test]
    fn register_values_expects_shared_values() {
        let (api, reporter) = api();
        let value = SharedValue::new(0.0);

        assert!(api.register_values_in_view(&[num(2.0), num(3.0)]).is_none());
        assert!(api
            .register_values_in_view(&[num(2.0), PropertyValue::Array(vec![num(1.0)])])
            .is_none());
        assert_eq!(reporter.len(), 2);

        let platform = Arc::new(ManualPlatform::default());
        let view = DrawView::new(ViewConfig::default(), platform.clone(), reporter.clone());
        let surface = RecordingSurface::new(SurfaceSize::new(8, 8));
        let presented = surface.presented();
        view.set_surface(Some(Box::new(surface)));
        view.set_draw_callback(Some(DrawCallback::new(|_canvas, _info| Ok(()))));
        api.registry().register_view(ViewId(2), view);
        platform.run_pending();

        let args = [num(2.0), PropertyValue::Array(vec![PropertyValue::host(value.clone())])];
        let unsubscribe = api.register_values_in_view(&args).unwrap();
        value.set(1.0);
        platform.run_pending();
        assert_eq!(presented.count(), 2);

        unsubscribe.unsubscribe();
        assert_eq!(value.listener_count(), 0);
    }
}
