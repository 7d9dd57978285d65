//! ATM console in the browser.
//!
//! The signing agent is the page's injected `window.ethereum` provider. All
//! state lives in a single [`atm_session::App`]; this crate only renders its
//! view and feeds it DOM events.

pub mod dom;
pub mod events;
pub mod provider;
pub mod render;
pub mod state;

use atm_agent::{SigningAgent, SigningAgentHandle};
use atm_chain_client::{ContractBackend, ContractDeployment, Disconnected};
use atm_chain_rpc::{ProviderAgent, RpcContractBackend};
use atm_session::{App, AtmConfig, config};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use provider::Eip1193Transport;

/// Element the UI renders into.
pub const ROOT_ID: &str = "atm";

/// WASM entry point, called when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    init()
}

fn init() -> Result<(), JsValue> {
    let config = AtmConfig::from_lookup(build_time).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
    let interface = Rc::new(config.interface().map_err(|err| JsValue::from_str(&format!("{err:#}")))?);

    let transport = Eip1193Transport::detect().map(Rc::new);
    let agent = SigningAgentHandle::detect(transport.clone().map(|transport| {
        let agent: Rc<dyn SigningAgent> = Rc::new(ProviderAgent::new("window.ethereum", transport));
        agent
    }));
    let backend: Rc<dyn ContractBackend> = match &transport {
        Some(transport) => Rc::new(RpcContractBackend::new(transport.clone()).with_poll_interval(config.poll_interval)),
        None => Rc::new(Disconnected),
    };

    gloo_console::log!(format!(
        "atm: contract {} ({}), provider {}",
        config.contract_address,
        config.operations,
        if transport.is_some() { "detected" } else { "missing" }
    ));

    let deployment = ContractDeployment {
        address: config.contract_address,
        interface,
        backend,
    };
    let app = App::new(agent, deployment).with_clock(|| js_sys::Date::now() as u128);
    state::install(app);

    let root = dom::by_id(ROOT_ID)?;
    events::bind(&root)?;
    if let Some(transport) = &transport {
        transport.on_accounts_changed(events::accounts_changed)?;
    }

    render::refresh();
    let effects = state::with_app(|app| app.start()).unwrap_or_default();
    events::run(effects);
    Ok(())
}

/// Configuration baked in at build time. There is no filesystem in the
/// browser, so `ATM_ABI_PATH` is not consulted.
fn build_time(key: &str) -> Option<String> {
    let value = match key {
        config::CONTRACT_ADDRESS => option_env!("ATM_CONTRACT_ADDRESS"),
        config::OPERATION_SET => option_env!("ATM_OPERATION_SET"),
        config::CONFIRMATION_POLL_MS => option_env!("ATM_CONFIRMATION_POLL_MS"),
        _ => None,
    };
    value.map(str::to_owned)
}
