use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use checkout_engine::{CheckoutFlowApi, SqliteDatabase};
use futures::{future::ok, FutureExt};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::{get_remote_ip, CallerIdHeader},
    integrations::HttpPaymentGateway,
    middleware::HmacMiddlewareFactory,
    routes::{health, CheckoutCompletedRoute, FinalizeCheckoutRoute},
};

const DB_MAX_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = if config.database_url.is_empty() {
        SqliteDatabase::new(DB_MAX_CONNECTIONS).await
    } else {
        SqliteDatabase::new_with_url(&config.database_url, DB_MAX_CONNECTIONS).await
    }
    .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🗃️ Checkout database ready at {}", db.url());
    let gateway = HttpPaymentGateway::new(config.gateway.clone())
        .map_err(|e| ServerError::ConfigurationError(format!("Payment gateway client. {e}")))?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: HttpPaymentGateway,
) -> Result<Server, ServerError> {
    let options = config.finalize_options();
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutFlowApi::new(db.clone(), gateway.clone()).with_options(options);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("msq::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(CallerIdHeader(config.caller_id_header.clone())));
        let api_scope =
            web::scope("/api").service(FinalizeCheckoutRoute::<SqliteDatabase, HttpPaymentGateway>::new());
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook.whitelist.clone();
        let hmac = HmacMiddlewareFactory::new(
            &config.webhook.hmac_header,
            config.webhook.hmac_secret.clone(),
            config.webhook.hmac_checks,
        );
        let webhook_scope = web::scope("/webhook")
            .wrap(hmac)
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let allowed = match (peer_ip, &whitelist) {
                    (_, None) => true,
                    (Some(ip), Some(whitelist)) => {
                        debug!("💻️ Webhook call from {ip}");
                        whitelist.contains(&ip)
                    },
                    (None, Some(_)) => {
                        warn!("💻️ No IP address found for webhook caller. Denying access.");
                        false
                    },
                };
                if allowed {
                    srv.call(req).boxed_local()
                } else {
                    warn!("💻️ Webhook call from {peer_ip:?} is not whitelisted. Denying access.");
                    ok(req.error_response(ServerError::ForbiddenPeer)).boxed_local()
                }
            })
            .service(CheckoutCompletedRoute::<SqliteDatabase, HttpPaymentGateway>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
