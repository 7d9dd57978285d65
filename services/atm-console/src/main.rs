use anyhow::Context;
use atm_agent::{SigningAgent, SigningAgentHandle};
use atm_chain_client::{ContractBackend, ContractDeployment, Disconnected};
use atm_chain_rpc::{HttpTransport, ProviderAgent, RpcContractBackend};
use atm_session::{App, AtmConfig};
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod commands;
mod render;

use commands::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AtmConfig::from_env().context("loading configuration")?;
    let interface = Rc::new(config.interface()?);

    let transport = config
        .provider_url
        .as_deref()
        .map(|url| Rc::new(HttpTransport::new(url)));

    let agent = SigningAgentHandle::detect(transport.clone().map(|transport| {
        let agent: Rc<dyn SigningAgent> = Rc::new(ProviderAgent::new(transport.endpoint().to_owned(), transport));
        agent
    }));

    let backend: Rc<dyn ContractBackend> = match transport {
        Some(transport) => Rc::new(RpcContractBackend::new(transport).with_poll_interval(config.poll_interval)),
        None => Rc::new(Disconnected),
    };

    info!(
        contract = %config.contract_address,
        operations = %config.operations,
        provider = config.provider_url.as_deref().unwrap_or("none"),
        "atm-console starting"
    );

    let deployment = ContractDeployment {
        address: config.contract_address,
        interface,
        backend,
    };
    let mut app = App::new(agent, deployment);

    println!("{}", render::banner());
    let effects = app.start();
    app.settle(effects).await;
    println!("{}", render::view(&app.view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match commands::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("{}", commands::HELP),
            Ok(Command::Intents(intents)) => {
                let mut effects = Vec::new();
                for intent in intents {
                    effects.extend(app.handle(intent));
                }
                if !effects.is_empty() {
                    println!("{}", render::view(&app.view()));
                }
                app.settle(effects).await;
                println!("{}", render::view(&app.view()));
            }
            Ok(Command::Empty) => {}
            Err(err) => println!("{err}\n{}", commands::HELP),
        }
    }

    Ok(())
}
