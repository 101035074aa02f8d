#![recursion_limit = "256"]

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::Router;
    use contest_hub::api::{self, AppState};
    use contest_hub::app::*;
    use contest_hub::config::ServerConfig;
    use contest_hub::{build_pool, init_schema};
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().expect("Invalid server configuration.");

    let pool = build_pool(&config.database_url, config.pool_size).expect("Failed to create pool.");
    {
        let mut conn = pool.get().expect("Failed to get a database connection.");
        init_schema(&mut conn).expect("Failed to create database schema.");
    }

    let conf = get_configuration(None).unwrap();
    let addr = conf.leptos_options.site_addr;
    let leptos_options = conf.leptos_options;
    // Generate the list of routes in your Leptos App
    let routes = generate_route_list(App);

    let state = AppState::new(pool, config.admin_password);
    let leptos_options_clone = leptos_options.clone();
    let app = Router::new()
        .nest("/api", api::router(state, &config.cors_origins))
        .leptos_routes(&leptos_options, routes, move || {
            shell(leptos_options_clone.clone())
        })
        // Use shell for fallback.
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptos_options);

    tracing::info!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // no client-side main function
    // see lib.rs for hydration function instead
}
