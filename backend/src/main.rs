//! Backend entry-point: loads settings, wires Supabase adapters into the
//! services and serves the REST API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use canopy::domain::{AccountService, TreeService};
use canopy::inbound::http::health::HealthState;
use canopy::inbound::http::state::HttpState;
use canopy::outbound::supabase::{
    SupabaseAuthGateway, SupabaseClient, SupabasePhotoStore, SupabaseTreeRepository,
};
use server::{BuildMode, ServerConfig, ServerSettings, create_server, load_session_key};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        ServerSettings::load().map_err(|error| eyre!("failed to load settings: {error}"))?;
    let http_state = build_http_state(&settings)?;

    let key = load_session_key(
        &settings.session_key_file(),
        BuildMode::from_debug_assertions(),
        settings.allow_ephemeral_session,
    )?;
    let bind_addr = settings.bind_addr()?;
    let config = ServerConfig::new(
        key,
        settings.cookie_secure(),
        settings.same_site()?,
        bind_addr,
    );

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), http_state, config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");

    server.await?;
    health_state.mark_unhealthy();
    Ok(())
}

fn build_http_state(settings: &ServerSettings) -> Result<web::Data<HttpState>> {
    let client = SupabaseClient::new(
        settings.supabase_url()?,
        settings.supabase_service_key()?,
        settings.request_timeout(),
    )
    .wrap_err("failed to build Supabase client")?;

    let records = SupabaseTreeRepository::new(client.clone(), settings.tree_table());
    let photos = SupabasePhotoStore::new(client.clone(), settings.photo_bucket());
    let auth = SupabaseAuthGateway::new(client, settings.password_reset_redirect()?);

    let trees = Arc::new(TreeService::new(
        Arc::new(records),
        Arc::new(photos),
        Arc::new(DefaultClock),
    ));
    let accounts = Arc::new(AccountService::new(Arc::new(auth)));
    Ok(web::Data::new(HttpState::new(trees.clone(), trees, accounts)))
}
