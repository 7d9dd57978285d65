use atm_session::{Screen, View};
use std::fmt::Write;

pub fn banner() -> String {
    "== Ethereum Defi Bank ==  (type `help` for commands)".to_owned()
}

pub fn view(view: &View) -> String {
    let mut out = String::new();
    match &view.screen {
        Screen::InstallPrompt => {
            out.push_str("Please install a signing agent (set ATM_PROVIDER_URL) in order to use this ATM.");
        }
        Screen::Connect { connecting: false } => {
            out.push_str("Please connect your wallet: type `connect`.");
        }
        Screen::Connect { connecting: true } => {
            out.push_str("Waiting for the signing agent...");
        }
        Screen::Loading { account } => {
            let _ = write!(out, "Account: {account}\nBalance: loading...");
        }
        Screen::Ready {
            account,
            balance,
            amount,
            actions,
            busy,
        } => {
            let _ = writeln!(out, "Account: {account}");
            let _ = writeln!(out, "Balance: {balance} ETH");
            let _ = writeln!(out, "Amount:  {}", if amount.is_empty() { "-" } else { amount });
            for action in actions {
                let _ = writeln!(out, "  [{}] {}", action.op.command(), action.label);
            }
            if let Some(op) = busy {
                let _ = writeln!(out, "Waiting for `{op}` to be confirmed...");
            }
            out.truncate(out.trim_end().len());
        }
    }
    if let Some(notice) = &view.notice {
        let marker = if notice.fatal { "!!" } else { "!" };
        let _ = write!(out, "\n{marker} {}", notice.message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_api_types::{OperationKind, address};
    use atm_session::{Action, Notice};

    #[test]
    fn ready_screen_lists_actions() {
        let view = View {
            screen: Screen::Ready {
                account: address!("00000000000000000000000000000000000a11ce"),
                balance: "1.5".into(),
                amount: "2".into(),
                actions: vec![Action {
                    op: OperationKind::Deposit,
                    label: "Deposit 2 ETH".into(),
                    enabled: true,
                }],
                busy: None,
            },
            notice: Some(Notice {
                message: "request rejected in the signing agent".into(),
                fatal: false,
            }),
        };
        let text = super::view(&view);
        assert!(text.contains("Balance: 1.5 ETH"));
        assert!(text.contains("[deposit] Deposit 2 ETH"));
        assert!(text.ends_with("! request rejected in the signing agent"));
    }

    #[test]
    fn install_prompt_is_alone() {
        let view = View {
            screen: Screen::InstallPrompt,
            notice: None,
        };
        assert_eq!(super::view(&view).lines().count(), 1);
    }
}
