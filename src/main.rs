use minijinja::{path_loader, Environment};
use std::env::args;
use std::path::PathBuf;
use std::process::exit;
use tidepool::web::app::App;
use tidepool::web::state::AppState;
use tidepool::AppConfig;
use tracing::Level;

fn main() {
    let args: Vec<String> = args().collect();
    if args.len() < 2 {
        println!(
            "usage: {} CFG",
            args.first().map(String::as_str).unwrap_or("tidepool")
        );
        exit(1);
    }

    let cfg: AppConfig = AppConfig::new_from_file_and_env(args[1].as_ref()).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        exit(1);
    });

    // Sentry wants to be initialized before the async runtime spins up
    let _sentry_guard = cfg.sentry_dsn.clone().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async {
            // initialize tracing
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);

            tracing::debug!("config: {:?}", cfg);

            let template_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
            let mut env = Environment::new();
            minijinja_contrib::add_to_environment(&mut env);

            fn linebreaks_filter(value: String) -> String {
                tidepool::text_utils::linebreaks(&value)
            }
            env.add_filter("linebreaks", linebreaks_filter);

            env.set_loader(path_loader(&template_path));

            let db_pool = cfg.connect_database().await.unwrap_or_else(|e| {
                eprintln!("error connecting to database: {}", e);
                exit(1);
            });

            let state = AppState {
                config: cfg.clone(),
                env,
                db_pool,
            };

            App::new(state).await.unwrap().serve().await.unwrap()
        });
}
