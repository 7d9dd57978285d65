//! The page's single [`App`].
//!
//! `thread_local!` storage is enough since WASM is single-threaded. Borrows
//! never outlive a closure passed to [`with_app`], so no borrow is held
//! across an `await`.

use atm_session::App;
use std::cell::RefCell;

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

pub fn install(app: App) {
    APP.with(|slot| *slot.borrow_mut() = Some(app));
}

/// Runs `f` against the app. `None` before [`install`] has been called.
pub fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|slot| slot.borrow_mut().as_mut().map(f))
}
