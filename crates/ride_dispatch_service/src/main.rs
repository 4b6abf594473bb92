/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{web, App, HttpServer};
use ride_dispatch_service::{
    domain::api,
    environment::{read_dhall_config, AppState},
    middleware::*,
    tools::{error::AppError, logger::*, prometheus::prometheus_metrics},
};
use std::env::var;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn start_server() -> std::io::Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/ride_dispatch_service.dhall".to_string());
    let mut app_config = read_dhall_config(&dhall_config_path).unwrap_or_else(|err| {
        println!("Dhall Config Reading Error : {}", err.message());
        std::process::exit(1);
    });

    if let Some(port) = var("PORT").ok().and_then(|port| port.parse::<u16>().ok()) {
        app_config.port = port;
    }

    let _guard = setup_tracing(app_config.logger_cfg).unwrap_or_else(|err| {
        println!("Logger Setup Error : {}", err.message());
        std::process::exit(1);
    });

    let port = app_config.port;
    let workers = app_config.workers;
    let registry_backend = app_config.registry_backend;

    let app_state = AppState::new(app_config).await.unwrap_or_else(|err| {
        error!(tag = "[Startup Failed]", error = %err.message());
        std::process::exit(1);
    });

    let data = web::Data::new(app_state);
    let prometheus = prometheus_metrics();

    info!(
        tag = "[Server Starting]",
        port = port,
        workers = workers,
        registry_backend = %registry_backend
    );

    let server_data = data.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(server_data.clone())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _| AppError::MalformedInput(err.to_string()).into()),
            )
            .wrap(CheckContentLength)
            .wrap(IncomingRequestMetrics)
            .wrap(TracingLogger::<DomainRootSpanBuilder>::new())
            .wrap(prometheus.clone())
            .configure(api::handler)
    })
    .workers(workers)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    if let Some(redis) = data.redis.as_ref() {
        redis.close_connections().await;
    }

    info!(tag = "[Server Stopped]");

    Ok(())
}

fn main() {
    if let Err(err) = start_server() {
        println!("Server Error : {err}");
        std::process::exit(1);
    }
}
