use std::sync::Arc;

use cluster_network_core::resources::crd::v1::network::Network;
use futures::StreamExt;
use kube::{
    runtime::{watcher::Config, Controller},
    Api,
};
use log::info;

use crate::helpers::handle_reconciliation_result;

use super::reconciler::{
    context::ReconcilerContext,
    network::{reconcile_network, reconcile_network_error},
};

pub async fn start_network_controller(context: &Arc<ReconcilerContext>) {
    info!("Creating network controller...");

    let network_api: Api<Network> = Api::all(context.client.clone());
    let controller = Controller::new(network_api, Config::default())
        .shutdown_on_signal()
        .run(reconcile_network, reconcile_network_error, context.clone())
        .for_each(handle_reconciliation_result);

    info!("Network controller created!");

    controller.await
}
