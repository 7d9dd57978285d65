//! View rendering.
//!
//! The whole screen is rebuilt from [`View`] on every state change, except
//! while typing an amount (see [`refresh_actions`]).

use atm_session::{Action, Screen, View};
use std::fmt::Write;

use crate::{ROOT_ID, dom, state};

/// Redraws the app into `#atm`.
pub fn refresh() {
    let Some(view) = state::with_app(|app| app.view()) else {
        return;
    };
    let Ok(root) = dom::by_id(ROOT_ID) else {
        gloo_console::error!(format!("atm: #{ROOT_ID} not found"));
        return;
    };
    let focused = dom::focused_id();
    root.set_inner_html(&html(&view));
    if let Some(id) = focused {
        dom::refocus(&id);
    }
}

/// Updates button labels in place so the amount field keeps its caret.
pub fn refresh_actions() {
    let Some(view) = state::with_app(|app| app.view()) else {
        return;
    };
    let Screen::Ready { actions, .. } = &view.screen else {
        return refresh();
    };
    let Ok(root) = dom::by_id(ROOT_ID) else {
        return;
    };
    for button in dom::query_all_within(&root, "button[data-op]") {
        let op = button.get_attribute("data-op").unwrap_or_default();
        if let Some(action) = actions.iter().find(|action| action.op.command() == op) {
            button.set_text_content(Some(&action.label));
        }
    }
}

pub fn html(view: &View) -> String {
    let mut out = String::from("<header><h1>Ethereum Defi Bank</h1></header>");
    match &view.screen {
        Screen::InstallPrompt => {
            out.push_str("<p>Please install Metamask in order to use this ATM.</p>");
        }
        Screen::Connect { connecting } => {
            let _ = write!(
                out,
                r#"<button class="btn" data-intent="connect"{}>Please connect your Metamask wallet</button>"#,
                disabled(*connecting)
            );
        }
        Screen::Loading { account } => {
            let _ = write!(
                out,
                r#"<div class="user-info"><p><strong>Account:</strong> {account}</p><p><strong>Balance:</strong> loading…</p></div>"#
            );
        }
        Screen::Ready {
            account,
            balance,
            amount,
            actions,
            busy,
        } => {
            let _ = write!(
                out,
                r#"<div class="user-info"><p><strong>Account:</strong> {account}</p><p><strong>Balance:</strong> {} ETH <button class="link" data-intent="refresh">refresh</button></p>"#,
                escape(balance)
            );
            let _ = write!(
                out,
                r#"<form class="form" onsubmit="return false"><label for="amount">Enter amount:</label><input id="amount" type="number" placeholder="Amount" value="{}"></form>"#,
                escape(amount)
            );
            out.push_str(r#"<div class="buttons">"#);
            for action in actions {
                button(&mut out, action);
            }
            out.push_str("</div>");
            if let Some(op) = busy {
                let _ = write!(out, r#"<p class="pending">Waiting for {} to be confirmed…</p>"#, escape(&op.to_string()));
            }
            out.push_str("</div>");
        }
    }
    if let Some(notice) = &view.notice {
        let class = if notice.fatal { "notice fatal" } else { "notice" };
        let _ = write!(
            out,
            r#"<p class="{class}">{} <button class="link" data-intent="dismiss">dismiss</button></p>"#,
            escape(&notice.message)
        );
    }
    out
}

fn button(out: &mut String, action: &Action) {
    let _ = write!(
        out,
        r#"<button class="btn" data-op="{}"{}>{}</button>"#,
        action.op.command(),
        disabled(!action.enabled),
        escape(&action.label)
    );
}

fn disabled(disabled: bool) -> &'static str {
    if disabled { " disabled" } else { "" }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_api_types::{OperationKind, address};
    use atm_session::Notice;

    fn ready(amount: &str, enabled: bool) -> View {
        View {
            screen: Screen::Ready {
                account: address!("00000000000000000000000000000000000a11ce"),
                balance: "1.0".into(),
                amount: amount.into(),
                actions: vec![Action {
                    op: OperationKind::Deposit,
                    label: format!("Deposit {amount} ETH"),
                    enabled,
                }],
                busy: (!enabled).then_some(OperationKind::Deposit),
            },
            notice: None,
        }
    }

    #[test]
    fn install_prompt_has_no_affordances() {
        let page = html(&View {
            screen: Screen::InstallPrompt,
            notice: None,
        });
        assert!(page.contains("Please install Metamask"));
        assert!(!page.contains("<button"));
    }

    #[test]
    fn connect_button_is_disabled_while_waiting() {
        let page = html(&View {
            screen: Screen::Connect { connecting: true },
            notice: None,
        });
        assert!(page.contains(r#"data-intent="connect" disabled"#));
    }

    #[test]
    fn typed_amount_is_escaped() {
        let page = html(&ready("<b>1</b>", true));
        assert!(page.contains(r#"value="&lt;b&gt;1&lt;/b&gt;""#));
        assert!(page.contains("Deposit &lt;b&gt;1&lt;/b&gt; ETH"));
        assert!(!page.contains("<b>"));
    }

    #[test]
    fn in_flight_actions_render_disabled() {
        let page = html(&ready("1", false));
        assert!(page.contains(r#"data-op="deposit" disabled"#));
        assert!(page.contains("Waiting for"));
    }

    #[test]
    fn notices_can_be_dismissed() {
        let mut view = ready("1", true);
        view.notice = Some(Notice {
            message: "request rejected in the signing agent".into(),
            fatal: false,
        });
        let page = html(&view);
        assert!(page.contains(r#"<p class="notice">request rejected in the signing agent"#));
        assert!(page.contains(r#"data-intent="dismiss""#));
    }
}
