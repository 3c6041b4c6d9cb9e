use std::{process::exit, sync::Arc};

use kube::Client;
use release::OperatorRelease;

use crate::controller::{network::start_network_controller, reconciler::context::ReconcilerContext};

mod controller;
mod helpers;
mod release;

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    configure_logger();

    let release = get_release();
    let client = create_client().await;

    let context = Arc::new(ReconcilerContext::new(client, release));

    start_network_controller(&context).await;

    Ok(())
}

async fn create_client() -> Client {
    match Client::try_default().await {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create client! {error:?}");
            exit(6)
        }
    }
}

fn get_release() -> OperatorRelease {
    match OperatorRelease::from_env() {
        Ok(release) => release,
        Err(error) => {
            log::error!("Couldn't retrieve release info! {error:?}");
            exit(7)
        }
    }
}

fn configure_logger() {
    env_logger::builder()
        .default_format()
        .format_module_path(false)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init()
}
