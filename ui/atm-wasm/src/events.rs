//! Event binding and the effect loop.
//!
//! Clicks and input are delegated to the root element, so listeners survive
//! the full redraws done by [`render::refresh`]. Effects run as
//! `spawn_local` jobs; each job owns its handles and only touches the app
//! again to apply its outcome.

use atm_api_types::{Address, OperationKind};
use atm_session::{Effect, Intent};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, MouseEvent};

use crate::{dom, render, state};

/// Id of the amount field.
pub const AMOUNT_INPUT: &str = "amount";

pub fn bind(root: &Element) -> Result<(), JsValue> {
    let on_click = Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| {
        let Some(el) = dom::closest(event.target(), "[data-intent],[data-op]") else {
            return;
        };
        let intent = intent_for(
            el.get_attribute("data-intent").as_deref(),
            el.get_attribute("data-op").as_deref(),
        );
        if let Some(intent) = intent {
            event.prevent_default();
            dispatch(intent);
        }
    });
    root.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    let on_input = Closure::<dyn FnMut(Event)>::new(|event: Event| {
        if let Some((id, value)) = dom::input_value(event.target()) {
            if id == AMOUNT_INPUT {
                dispatch(Intent::SetAmount(value));
            }
        }
    });
    root.add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())?;
    on_input.forget();

    Ok(())
}

/// Maps a clicked element's `data-intent` / `data-op` attributes to an intent.
pub fn intent_for(intent: Option<&str>, op: Option<&str>) -> Option<Intent> {
    match (intent, op) {
        (Some("connect"), _) => Some(Intent::Connect),
        (Some("refresh"), _) => Some(Intent::RefreshBalance),
        (Some("dismiss"), _) => Some(Intent::DismissNotice),
        (None, Some(op)) => OperationKind::from_command(op).map(Intent::Submit),
        _ => None,
    }
}

/// Forwarded from the provider's `accountsChanged` event.
pub fn accounts_changed(accounts: Vec<Address>) {
    dispatch(Intent::AccountsChanged(accounts));
}

pub fn dispatch(intent: Intent) {
    let typing = matches!(intent, Intent::SetAmount(_));
    let Some(effects) = state::with_app(|app| app.handle(intent)) else {
        return;
    };
    if typing {
        render::refresh_actions();
    } else {
        render::refresh();
    }
    run(effects);
}

pub fn run(effects: Vec<Effect>) {
    for effect in effects {
        let Some(job) = state::with_app(|app| app.job(effect)) else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = job.run().await;
            let Some((next, view)) = state::with_app(|app| {
                let next = app.apply(outcome);
                (next, app.view())
            }) else {
                return;
            };
            if let Some(notice) = view.notice.filter(|notice| notice.fatal) {
                gloo_console::error!(format!("atm: {}", notice.message));
            }
            render::refresh();
            run(next);
        });
    }
}
