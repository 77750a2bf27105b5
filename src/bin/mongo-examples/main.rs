use anyhow::Result;
use clap::Parser;
use mongo_examples::cli::Cli;
use mongo_examples::examples::{Examples, SEPARATOR};
use mongo_examples::logging::init_tracing;
use mongo_examples::settings::SecretsReader;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let secrets = SecretsReader::locate(args.secrets.clone());
    if let Some(path) = secrets.path() {
        tracing::debug!(path = %path.display(), "using secrets file");
    }

    let examples = Examples::connect(&secrets, &args.section, &args.db, &args.collection).await?;

    println!("{}", SEPARATOR);
    for example in args.selected() {
        examples.run(example).await?;
        println!("{}", SEPARATOR);
    }

    Ok(())
}
