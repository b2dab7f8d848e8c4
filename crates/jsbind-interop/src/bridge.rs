//! Per-context bridge state
//!
//! Installing the bridge on a context does two things:
//! - builds the wrapper template (one internal slot, named and indexed
//!   interceptors) and registers it as the context's object wrapper template
//! - stores the context's `BridgeOptions` as embedder data
//!
//! Every entry point installs the bridge with default options on first use,
//! so `install` only needs to be called to pick non-default options.

use std::rc::Rc;

use jsbind_engine::{Context, ObjectTemplate};

use crate::config::BridgeOptions;
use crate::wrapper::{WrapperIndexedHandler, WrapperNamedHandler};

/// State attached to a context by `install`
#[derive(Debug)]
pub struct BridgeState {
    options: BridgeOptions,
}

impl BridgeState {
    /// Options in effect for this context
    pub fn options(&self) -> BridgeOptions {
        self.options
    }
}

/// Install the bridge on `ctx` with `options`, replacing any earlier options.
pub fn install(ctx: &mut Context, options: BridgeOptions) {
    let mut template = ObjectTemplate::new();
    template.set_internal_field_count(1);
    template.set_named_property_handler(Rc::new(WrapperNamedHandler));
    template.set_indexed_property_handler(Rc::new(WrapperIndexedHandler));
    ctx.set_object_wrapper_template(Rc::new(template));
    ctx.set_embedder_data(Rc::new(BridgeState { options }));
    tracing::debug!(context = ctx.id().as_u64(), ?options, "bridge installed");
}

/// Bridge state of `ctx`, installing defaults if needed
pub fn state(ctx: &mut Context) -> Rc<BridgeState> {
    if let Some(state) = installed_state(ctx) {
        return state;
    }
    install(ctx, BridgeOptions::default());
    installed_state(ctx).unwrap_or_else(|| {
        Rc::new(BridgeState {
            options: BridgeOptions::default(),
        })
    })
}

/// Options of `ctx`, installing defaults if needed
pub fn options(ctx: &mut Context) -> BridgeOptions {
    state(ctx).options()
}

fn installed_state(ctx: &Context) -> Option<Rc<BridgeState>> {
    ctx.embedder_data()
        .and_then(|data| data.downcast::<BridgeState>().ok())
}

/// The wrapper template of `ctx`, installing defaults if needed
pub(crate) fn wrapper_template(ctx: &mut Context) -> Rc<ObjectTemplate> {
    if let Some(template) = ctx
        .object_wrapper_template()
        .filter(|_| installed_state(ctx).is_some())
    {
        return template;
    }
    install(ctx, BridgeOptions::default());
    ctx.object_wrapper_template()
        .unwrap_or_else(|| Rc::new(ObjectTemplate::new()))
}
