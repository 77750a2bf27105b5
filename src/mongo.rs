// src/mongo.rs
//! Process-wide MongoDB client.
//!
//! Creating a `Client` is expensive; it owns the connection pool and server
//! monitoring tasks. One client is built on first use and shared afterwards.

use crate::settings::{MongoSettings, SecretsReader};
use anyhow::Result;
use bson::doc;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Collection};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::sync::OnceCell;

// RFC 3986 unreserved characters pass through; everything else in userinfo is escaped.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static CONNECTION: OnceCell<Client> = OnceCell::const_new();

pub fn connection_uri(settings: &MongoSettings) -> String {
    format!(
        "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority",
        utf8_percent_encode(&settings.user, USERINFO),
        utf8_percent_encode(&settings.password, USERINFO),
        settings.cluster,
    )
}

/// Parses the connection string and pins the Stable API to version 1.
pub async fn client_options(settings: &MongoSettings) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(connection_uri(settings)).await?;
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    Ok(options)
}

pub async fn ping(client: &Client) -> Result<()> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await?;
    Ok(())
}

/// Builds a client from settings and pings the deployment.
pub async fn connect(settings: &MongoSettings) -> Result<Client> {
    tracing::info!(cluster = %settings.cluster, user = %settings.user, "connecting to MongoDB");
    connect_with_options(client_options(settings).await?).await
}

/// A failed ping is logged and the client is returned anyway; later operations
/// surface the real error.
pub async fn connect_with_options(options: ClientOptions) -> Result<Client> {
    let client = Client::with_options(options)?;

    match ping(&client).await {
        Ok(()) => tracing::info!("pinged your deployment, connection to MongoDB succeeded"),
        Err(e) => tracing::error!(error = %e, "ping to MongoDB deployment failed"),
    }

    Ok(client)
}

/// Returns the shared client, creating it on first call from `section` of the
/// secrets. Concurrent first callers wait on the same initialization. If
/// initialization fails nothing is cached and the next call tries again.
pub async fn get_connection(secrets: &SecretsReader, section: &str) -> Result<Client> {
    shared_client(&CONNECTION, secrets, section).await
}

async fn shared_client(
    cell: &OnceCell<Client>,
    secrets: &SecretsReader,
    section: &str,
) -> Result<Client> {
    let client = cell
        .get_or_try_init(|| async {
            let settings: MongoSettings = secrets.read_section(section)?;
            connect(&settings).await
        })
        .await?;
    Ok(client.clone())
}

pub fn collection<T: Send + Sync>(client: &Client, db: &str, collection: &str) -> Collection<T> {
    client.database(db).collection::<T>(collection)
}
