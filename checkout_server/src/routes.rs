//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Finalization talks to the database and to the payment provider, so
//! everything here is async and nothing may block.
//!
//! ## Status codes
//! | Outcome      | `/api/checkout/{id}/finalize`   | `/webhook/checkout_completed` |
//! |--------------|---------------------------------|-------------------------------|
//! | `created`    | 201, order summary              | 200                           |
//! | `reused`     | 200, order summary              | 200                           |
//! | `not_found`  | 404                             | 200 (nothing to retry)        |
//! | `forbidden`  | 403                             | n/a                           |
//! | `not_paid`   | 402                             | 503                           |
//! | `processing` | 202 with `Retry-After`          | 503                           |
//! | `error`      | 500                             | 503                           |
use std::time::Duration;

use actix_web::{get, http::header::RETRY_AFTER, web, HttpResponse, Responder};
use checkout_engine::{
    checkout_objects::{FinalizeOutcome, FinalizeRequest},
    traits::{CheckoutDatabase, PaymentGateway},
    CheckoutFlowApi,
};
use log::*;

use crate::{
    data_objects::{
        CheckoutCompletedNotification,
        FinalizeQuery,
        FinalizeResponse,
        JsonResponse,
        ProcessingResponse,
    },
    errors::ServerError,
    helpers::CallerIdentity,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(finalize_checkout => Post "/checkout/{session_id}/finalize" impl CheckoutDatabase, PaymentGateway);
/// Route handler for the finalize endpoint.
///
/// The buyer's browser lands here after the payment provider redirects back to the marketplace. The caller must be
/// identified by the upstream auth proxy (see `MSQ_CALLER_ID_HEADER`) and must own the checkout session.
///
/// The call is idempotent. Repeating it after success returns the same order with status `reused`. While another
/// attempt (usually the provider webhook) is finalizing the same session, it returns 202 and a `Retry-After` header.
///
/// Pass `?include_shipping_address=true` to have the shipping address echoed back in the order summary.
pub async fn finalize_checkout<B, G>(
    path: web::Path<String>,
    query: web::Query<FinalizeQuery>,
    caller: CallerIdentity,
    api: web::Data<CheckoutFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGateway,
{
    let session_id = path.into_inner();
    if session_id.trim().is_empty() {
        return Err(ServerError::InvalidRequestPath("A checkout session id is required".into()));
    }
    debug!("💻️ Finalize request for checkout session {session_id} from {}", caller.0);
    let request = FinalizeRequest::new(session_id.as_str())
        .for_caller(&caller.0)
        .with_shipping_address(query.include_shipping_address);
    let outcome = api.finalize(request).await;
    info!("💻️ Finalize for checkout session {session_id}: {}", outcome.label());
    Ok(finalize_response(outcome))
}

fn finalize_response(outcome: FinalizeOutcome) -> HttpResponse {
    match outcome {
        FinalizeOutcome::Created(order) => {
            HttpResponse::Created().json(FinalizeResponse { status: "created".into(), order })
        },
        FinalizeOutcome::Reused(order) => HttpResponse::Ok().json(FinalizeResponse { status: "reused".into(), order }),
        FinalizeOutcome::NotFound => HttpResponse::NotFound().json(JsonResponse::failure("Checkout session not found.")),
        FinalizeOutcome::Forbidden => {
            HttpResponse::Forbidden().json(JsonResponse::failure("This checkout session belongs to another user."))
        },
        FinalizeOutcome::NotPaid => {
            HttpResponse::PaymentRequired().json(JsonResponse::failure("Payment has not been completed."))
        },
        FinalizeOutcome::Processing { retry_after } => HttpResponse::Accepted()
            .insert_header((RETRY_AFTER, retry_after_secs(retry_after).to_string()))
            .json(ProcessingResponse {
                status: "processing".into(),
                retry_after_ms: u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
            }),
        FinalizeOutcome::Error { message } => HttpResponse::InternalServerError().json(JsonResponse::failure(message)),
    }
}

/// `Retry-After` only carries whole seconds, so round up.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(checkout_completed => Post "/checkout_completed" impl CheckoutDatabase, PaymentGateway);
/// Route handler for the payment provider's "checkout completed" webhook.
///
/// The request body is signed (see [`crate::middleware::HmacMiddlewareFactory`]), so no caller check is made. The
/// response tells the provider whether to retry: any 2xx stops retries, and outcomes that may change later (not paid
/// yet, in flight, errors) return 503 so that the provider tries again.
pub async fn checkout_completed<B, G>(
    body: web::Json<CheckoutCompletedNotification>,
    api: web::Data<CheckoutFlowApi<B, G>>,
) -> HttpResponse
where
    B: CheckoutDatabase,
    G: PaymentGateway,
{
    let CheckoutCompletedNotification { session_id } = body.into_inner();
    debug!("💻️ Checkout completed webhook for session {session_id}");
    let outcome = api.finalize(FinalizeRequest::new(session_id.as_str())).await;
    info!("💻️ Webhook finalize for checkout session {session_id}: {}", outcome.label());
    match outcome {
        FinalizeOutcome::Created(s) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Order {} created.", s.order_ref)))
        },
        FinalizeOutcome::Reused(s) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Order {} already exists.", s.order_ref)))
        },
        FinalizeOutcome::NotFound => {
            warn!("💻️ Webhook for unknown checkout session {session_id}. Acknowledging so that it is not retried.");
            HttpResponse::Ok().json(JsonResponse::failure("Checkout session not found."))
        },
        FinalizeOutcome::Forbidden => HttpResponse::Ok().json(JsonResponse::failure("Checkout session not finalized.")),
        FinalizeOutcome::NotPaid => {
            HttpResponse::ServiceUnavailable().json(JsonResponse::failure("Payment has not been completed yet."))
        },
        FinalizeOutcome::Processing { retry_after } => HttpResponse::ServiceUnavailable()
            .insert_header((RETRY_AFTER, retry_after_secs(retry_after).to_string()))
            .json(JsonResponse::failure("Checkout session is being finalized.")),
        FinalizeOutcome::Error { message } => HttpResponse::ServiceUnavailable().json(JsonResponse::failure(message)),
    }
}
