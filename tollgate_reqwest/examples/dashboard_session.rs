use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use serde_json::Value;
use tollgate_reqwest::{ApiClient, ClientConfig, LoggingObserver, RequestOptions};
use tollgate_tokens::{storage::FileStorage, AuthData, CredentialStore, LoginResponse};

#[derive(Debug, Parser)]
struct Opts {
    /// The backend's base address
    #[clap(short, long, env)]
    base_url: String,

    /// The path of the refresh endpoint
    #[clap(long, env, default_value = "/auth/refresh-token")]
    refresh_path: String,

    /// The path of the sign-in endpoint
    #[clap(long, env, default_value = "/auth/login")]
    login_path: String,

    /// The account to sign in with, if no session is stored
    #[clap(short, long, env)]
    email: Option<String>,

    /// The password used to sign in
    #[clap(short, long, env, hide_env_values = true)]
    password: Option<String>,

    /// The local file used to persist credentials
    #[clap(short = 'f', long, env, default_value = ".credentials.json")]
    credentials_file: PathBuf,

    /// The resource to poll once signed in
    #[clap(short, long, env, default_value = "/orders")]
    resource: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let store = CredentialStore::new(FileStorage::new(opts.credentials_file));

    let client = ApiClient::builder(
        ClientConfig::new(opts.base_url).with_refresh_path(opts.refresh_path),
    )
    .store(store.clone())
    .observer(Arc::new(LoggingObserver))
    .build()?;

    if !store.is_authenticated().await {
        let (email, password) = match (opts.email, opts.password) {
            (Some(email), Some(password)) => (email, password),
            _ => color_eyre::eyre::bail!("no stored session; provide --email and --password"),
        };

        let resp: LoginResponse = client
            .post(
                &opts.login_path,
                &serde_json::json!({ "email": email, "password": password }),
                &RequestOptions::default(),
            )
            .await?;
        let AuthData { ref token, .. } = resp.data;
        tracing::info!(token = format_args!("{:#?}", token), "signed in");
        store.set_auth_data(&resp.data).await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;

        match client
            .get::<Value>(&opts.resource, &RequestOptions::default())
            .await
        {
            Ok(body) => tracing::info!(resource = %opts.resource, %body, "fetched resource"),
            Err(error) if error.is_session_expired() => {
                tracing::error!("session ended, sign in again to continue");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(error = (&error as &dyn std::error::Error), "request failed")
            }
        }
    }
}
