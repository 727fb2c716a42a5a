//! Request handlers for each operation.

use tracing::{debug, info, warn};

use corral_protocol::{DispatchRegistry, Envelope, Operation, Payload, Record, sort_natural};

use super::DISPATCH_TARGET;
use super::context::RequestContext;
use super::errors::HandlerError;
use super::secret::generate_secret;
use crate::storage::{StorageError, UserId};

type HandlerResult = Result<Option<Payload>, HandlerError>;
type Handler = fn(&RequestContext, &Envelope) -> HandlerResult;

/// Builds the server's request table.
///
/// `load` and `save` have no entry, so the server ignores both.
pub(crate) fn request_registry() -> DispatchRegistry<RequestContext> {
    let mut registry = DispatchRegistry::new();
    let table: [(Operation, Handler); 10] = [
        (Operation::Info, info),
        (Operation::Show, show),
        (Operation::Add, add),
        (Operation::Remove, remove),
        (Operation::RemoveFirst, remove_first),
        (Operation::RemoveLast, remove_last),
        (Operation::Import, import),
        (Operation::Stop, stop),
        (Operation::Register, register),
        (Operation::Login, login),
    ];
    for (operation, handler) in table {
        registry.on_request(operation, replying(handler));
    }
    registry
}

/// Adapts a fallible handler to the registry shape: a body becomes a reply,
/// an error is logged and produces no reply.
fn replying(
    handler: Handler,
) -> impl Fn(&RequestContext, &Envelope) -> Option<Envelope> + Send + Sync + 'static {
    move |context: &RequestContext, request: &Envelope| match handler(context, request) {
        Ok(body) => body.map(|body| request.reply(body)),
        Err(error) => {
            warn!(
                target: DISPATCH_TARGET,
                operation = %request.operation(),
                peer = %context.peer(),
                error = %error,
                "request failed"
            );
            None
        }
    }
}

fn acting_user(context: &RequestContext, request: &Envelope) -> Result<UserId, HandlerError> {
    context
        .user()
        .ok_or(HandlerError::MissingUser(request.operation()))
}

fn record_body(request: &Envelope) -> Result<&Record, HandlerError> {
    request.body().as_record().ok_or_else(|| {
        HandlerError::unexpected_body(request.operation(), "record", request.body().kind())
    })
}

fn text_body(request: &Envelope) -> Result<&str, HandlerError> {
    request.body().as_text().ok_or_else(|| {
        HandlerError::unexpected_body(request.operation(), "text", request.body().kind())
    })
}

fn info(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let summary = context.services().database().collection_info(user)?;
    Ok(Some(Payload::CollectionInfo(summary)))
}

fn show(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let mut records = context.services().database().list_records(user)?;
    sort_natural(&mut records);
    Ok(Some(Payload::Records(records)))
}

fn add(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let record = record_body(request)?;
    record.validate()?;
    context
        .services()
        .database()
        .add_record(record.clone(), user)?;
    debug!(target: DISPATCH_TARGET, %user, name = %record.name, "record added");
    Ok(None)
}

fn remove(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let record = record_body(request)?;
    let removed = context.services().database().remove_record(record, user)?;
    debug!(target: DISPATCH_TARGET, %user, removed, "records removed");
    Ok(None)
}

fn remove_first(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let removed = context.services().database().remove_first(user)?;
    debug!(target: DISPATCH_TARGET, %user, removed = removed.is_some(), "largest record removed");
    Ok(None)
}

fn remove_last(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let removed = context.services().database().remove_last(user)?;
    debug!(target: DISPATCH_TARGET, %user, removed = removed.is_some(), "smallest record removed");
    Ok(None)
}

fn import(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    let records = Record::from_document(text_body(request)?)?;
    let count = records.len();
    let database = context.services().database();
    for record in records {
        database.add_record(record, user)?;
    }
    info!(target: DISPATCH_TARGET, %user, count, "records imported");
    Ok(None)
}

fn stop(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let user = acting_user(context, request)?;
    info!(target: DISPATCH_TARGET, %user, peer = %context.peer(), "stop requested");
    context.services().request_shutdown("stop request");
    Ok(None)
}

fn register(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let address = text_body(request)?;
    let services = context.services();
    if services.database().is_registered(address)? {
        warn!(target: DISPATCH_TARGET, address, "address already registered");
        return Ok(Some(Payload::Flag(false)));
    }
    let secret = generate_secret(&mut rand::thread_rng());
    if let Err(error) = services.notifier().deliver(address, &secret) {
        warn!(
            target: DISPATCH_TARGET,
            address,
            error = %error,
            "registration secret not delivered"
        );
        return Ok(Some(Payload::Flag(false)));
    }
    match services
        .database()
        .register_user(address, &services.digest().digest(&secret))
    {
        Ok(user) => {
            info!(target: DISPATCH_TARGET, address, %user, "user registered");
            Ok(Some(Payload::Flag(true)))
        }
        Err(StorageError::AlreadyRegistered(_)) => {
            warn!(target: DISPATCH_TARGET, address, "address registered concurrently");
            Ok(Some(Payload::Flag(false)))
        }
        Err(error) => Err(error.into()),
    }
}

fn login(context: &RequestContext, request: &Envelope) -> HandlerResult {
    let accepted = match request.credentials() {
        Some(credentials) => context
            .services()
            .database()
            .verify_user(&credentials.login, &credentials.digest)?,
        None => false,
    };
    debug!(target: DISPATCH_TARGET, login = request.login(), accepted, "login checked");
    Ok(Some(Payload::Flag(accepted)))
}
