use atm_api_types::{Address, OperationKind};
use atm_session::Intent;

pub const HELP: &str = "\
commands:
  connect                 ask the signing agent for an account
  amount <value>          set the amount in ETH
  deposit|withdraw [value]
  increment|decrement [value]
  clear | double | halve | zero
  refresh                 re-read the balance
  dismiss                 clear the last message
  accounts [address...]  simulate an account change from the agent
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intents(Vec<Intent>),
    Help,
    Quit,
    Empty,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let intents = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(Command::Empty),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "connect" => vec![Intent::Connect],
        "amount" => vec![Intent::SetAmount(rest.to_owned())],
        "refresh" | "balance" => vec![Intent::RefreshBalance],
        "dismiss" => vec![Intent::DismissNotice],
        "accounts" => {
            let accounts = rest
                .split_whitespace()
                .map(|raw| raw.parse::<Address>().map_err(|err| format!("bad address {raw}: {err}")))
                .collect::<Result<Vec<_>, _>>()?;
            vec![Intent::AccountsChanged(accounts)]
        }
        other => {
            let op = OperationKind::from_command(other).ok_or_else(|| format!("unknown command: {other}"))?;
            let mut intents = Vec::new();
            if !rest.is_empty() {
                if !op.takes_amount() {
                    return Err(format!("{op} takes no amount"));
                }
                intents.push(Intent::SetAmount(rest.to_owned()));
            }
            intents.push(Intent::Submit(op));
            intents
        }
    };
    Ok(Command::Intents(intents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_with_inline_amount_set_it_first() {
        assert_eq!(
            parse("deposit -5"),
            Ok(Command::Intents(vec![
                Intent::SetAmount("-5".into()),
                Intent::Submit(OperationKind::Deposit),
            ]))
        );
        assert_eq!(
            parse("  double "),
            Ok(Command::Intents(vec![Intent::Submit(OperationKind::DoubleValue)]))
        );
    }

    #[test]
    fn fixed_operations_refuse_amounts() {
        assert!(parse("halve 2").is_err());
    }

    #[test]
    fn session_commands() {
        assert_eq!(parse("connect"), Ok(Command::Intents(vec![Intent::Connect])));
        assert_eq!(parse(""), Ok(Command::Empty));
        assert_eq!(parse("QUIT"), Ok(Command::Quit));
        assert_eq!(parse("accounts"), Ok(Command::Intents(vec![Intent::AccountsChanged(Vec::new())])));
        assert!(parse("accounts 0xnope").is_err());
        assert!(parse("launch").is_err());
    }
}
