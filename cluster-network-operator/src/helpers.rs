use std::{any::type_name, fmt::Debug};

use kube::{
    runtime::{
        controller::{Action, Error as ControllerError},
        reflector::ObjectRef,
        watcher::Error as WatcherError,
    },
    Resource,
};
use log::{error, info, warn};

fn pretty_type_name<'a, T>() -> &'a str {
    type_name::<T>().split("::").last().unwrap_or_default()
}

pub fn handle_reconciliation_result<T, E>(
    result: Result<(ObjectRef<T>, Action), ControllerError<E, WatcherError>>,
) -> impl std::future::Future<Output = ()>
where
    T: Resource,
    E: Debug,
{
    let resource_name = pretty_type_name::<T>();

    match result {
        Ok((object, action)) => info!(
            "Reconciled {} '{}'. Next action: {:?}",
            resource_name.to_lowercase(),
            object.name,
            action
        ),
        Err(err) => match err {
            ControllerError::ObjectNotFound(_) => (),
            ControllerError::ReconcilerFailed(reconciler_error, object) => warn!(
                "{} reconciliation failed for '{}': {:#?}",
                resource_name, object.name, reconciler_error
            ),
            ControllerError::QueueError(watcher_err) => {
                error!("Watcher has failed! {watcher_err:#?}")
            }
        },
    }

    std::future::ready(())
}
