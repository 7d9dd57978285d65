//! EIP-1193 transport over the injected `window.ethereum` provider.

use async_trait::async_trait;
use atm_api_types::Address;
use atm_chain_rpc::{RpcError, RpcErrorObject, RpcTransport};
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub struct Eip1193Transport {
    provider: JsValue,
}

impl Eip1193Transport {
    /// Looks up `window.ethereum`. Does not prompt or touch the network.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let provider = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if provider.is_undefined() || provider.is_null() {
            return None;
        }
        Some(Self { provider })
    }

    /// Subscribes `handler` to the provider's `accountsChanged` event for the
    /// lifetime of the page.
    pub fn on_accounts_changed(&self, handler: fn(Vec<Address>)) -> Result<(), JsValue> {
        let on: Function = Reflect::get(&self.provider, &JsValue::from_str("on"))?.dyn_into()?;
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |accounts: JsValue| {
            let raw: Vec<String> = serde_wasm_bindgen::from_value(accounts).unwrap_or_default();
            handler(parse_accounts(&raw));
        });
        on.call2(
            &self.provider,
            &JsValue::from_str("accountsChanged"),
            callback.as_ref().unchecked_ref(),
        )?;
        callback.forget();
        Ok(())
    }

    fn request_fn(&self) -> Result<Function, RpcError> {
        Reflect::get(&self.provider, &JsValue::from_str("request"))
            .map_err(|err| RpcError::Transport(describe(&err)))?
            .dyn_into::<Function>()
            .map_err(|_| RpcError::Transport("provider has no request()".to_owned()))
    }
}

#[async_trait(?Send)]
impl RpcTransport for Eip1193Transport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let args = json!({ "method": method, "params": params })
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| RpcError::Transport(err.to_string()))?;

        let promise: Promise = self
            .request_fn()?
            .call1(&self.provider, &args)
            .map_err(|err| provider_error(&err))?
            .dyn_into()
            .map_err(|_| RpcError::Transport(format!("{method}: provider did not return a promise")))?;

        let result = JsFuture::from(promise).await.map_err(|err| provider_error(&err))?;
        serde_wasm_bindgen::from_value(result).map_err(|err| RpcError::Decode(format!("{method}: {err}")))
    }

    async fn pause(&self, interval: Duration) {
        gloo_timers::future::sleep(interval).await;
    }
}

/// Rejections carry `{ code, message, data? }`, wallets nest node reverts in
/// `data`. Anything else is a transport failure.
fn provider_error(err: &JsValue) -> RpcError {
    let code = Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|code| code.as_f64());
    let message = Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| describe(err));
    let data = Reflect::get(err, &JsValue::from_str("data"))
        .ok()
        .filter(|data| !data.is_undefined() && !data.is_null())
        .and_then(|data| serde_wasm_bindgen::from_value::<Value>(data).ok());

    match code {
        Some(code) => RpcErrorObject {
            code: code as i64,
            message,
            data,
        }
        .into(),
        None => RpcError::Transport(message),
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Addresses the provider reported, skipping anything unparseable.
pub fn parse_accounts(raw: &[String]) -> Vec<Address> {
    raw.iter().filter_map(|account| account.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_accept_lowercase_hex_and_skip_garbage() {
        let raw = vec![
            "0x00000000000000000000000000000000000a11ce".to_owned(),
            "not an address".to_owned(),
        ];
        let accounts = parse_accounts(&raw);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].to_string().to_lowercase(), raw[0]);
    }
}
