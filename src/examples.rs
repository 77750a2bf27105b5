// src/examples.rs
//! One method per driver call. Each method opens the posts collection, runs a
//! single operation and prints what came back.

use crate::cli::Example;
use crate::models::{Account, Post, PostSummary, PostTypeTotal};
use crate::mongo::{collection, get_connection};
use crate::pipeline::{
    group_by_type, match_name_contains, name_eq, project_type_and_age, set_name,
    sort_by_name_desc, timestamped_name,
};
use crate::settings::SecretsReader;
use anyhow::{anyhow, Result};
use bson::{doc, Decimal128, Document};
use futures::stream::TryStreamExt;
use mongodb::options::{Acknowledgment, WriteConcern};
use mongodb::{Client, Collection};
use std::str::FromStr;

pub const SEPARATOR: &str = "----------------------------------------------";

const MATCH_NEEDLE: &str = "test";

pub struct Examples {
    client: Client,
    db: String,
    collection: String,
}

impl Examples {
    pub fn new(client: Client, db: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client,
            db: db.into(),
            collection: collection.into(),
        }
    }

    /// Builds the examples on top of the shared client.
    pub async fn connect(
        secrets: &SecretsReader,
        section: &str,
        db: &str,
        collection: &str,
    ) -> Result<Self> {
        let client = get_connection(secrets, section).await?;
        Ok(Self::new(client, db, collection))
    }

    fn posts(&self) -> Collection<Post> {
        collection(&self.client, &self.db, &self.collection)
    }

    pub async fn run(&self, example: Example) -> Result<()> {
        tracing::debug!(?example, db = %self.db, collection = %self.collection, "running example");
        match example {
            Example::ListDatabases => self.list_databases().await,
            Example::Insert => self.insert_document().await,
            Example::InsertAsync => self.insert_async_document().await,
            Example::InsertMany => self.insert_many_documents().await,
            Example::Find => self.find_document().await,
            Example::FindList => self.find_list_documents().await,
            Example::Update => self.update_document().await,
            Example::Delete => self.delete_document().await,
            Example::Transaction => self.transaction().await,
            Example::InsertAccount => self.insert_account().await,
            Example::AggregationMatch => self.aggregation_match().await,
            Example::AggregationGroup => self.aggregation_group().await,
            Example::AggregationSort => self.aggregation_sort().await,
            Example::AggregationProjection => self.aggregation_projection().await,
        }
    }

    pub async fn list_databases(&self) -> Result<()> {
        for database in self.client.list_databases().await? {
            println!(
                "{}",
                database_summary(
                    &database.name,
                    database.size_on_disk,
                    database.empty,
                    database.shards.as_ref()
                )
            );
        }
        Ok(())
    }

    pub async fn insert_document(&self) -> Result<()> {
        let result = self.posts().insert_one(Post::new("test post", 1)).await?;
        println!("Inserted: {}", result.inserted_id);
        Ok(())
    }

    pub async fn insert_async_document(&self) -> Result<()> {
        let post = Post::new("test async post", 3);
        let result = self.posts().insert_one(&post).await?;
        println!("Inserted: {}", result.inserted_id);
        Ok(())
    }

    /// Both posts go to the server in a single round trip.
    pub async fn insert_many_documents(&self) -> Result<()> {
        let posts = vec![
            Post::new("insert many post", 5),
            Post::new("insert many post 2", 6),
        ];
        let result = self.posts().insert_many(posts).await?;
        println!("Inserted {} posts", result.inserted_ids.len());
        Ok(())
    }

    pub async fn find_document(&self) -> Result<()> {
        match self.posts().find_one(name_eq("insert many post 2")).await? {
            Some(post) => println!("Post found: {}", post.name),
            None => println!("No post found"),
        }
        Ok(())
    }

    pub async fn find_list_documents(&self) -> Result<()> {
        let posts: Vec<Post> = self.posts().find(doc! {}).await?.try_collect().await?;
        for post in &posts {
            println!("{post}");
        }
        Ok(())
    }

    pub async fn update_document(&self) -> Result<()> {
        let posts = self.posts();
        let new_name = timestamped_name("test post", &chrono::Local::now());
        let result = posts
            .update_one(name_eq("test post"), set_name(&new_name))
            .await?;
        println!(
            "{}",
            update_summary(
                is_acknowledged(posts.write_concern()),
                result.matched_count,
                result.modified_count
            )
        );
        Ok(())
    }

    pub async fn delete_document(&self) -> Result<()> {
        let posts = self.posts();
        let result = posts.delete_one(name_eq("test post")).await?;
        println!(
            "{}",
            delete_summary(is_acknowledged(posts.write_concern()), result.deleted_count)
        );
        Ok(())
    }

    /// Inserts two posts atomically. Needs a replica set or sharded cluster.
    pub async fn transaction(&self) -> Result<()> {
        let posts = self.posts();
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let batch = [
            Post::new("transaction post", 7),
            Post::new("transaction post 2", 8),
        ];
        for post in &batch {
            if let Err(e) = posts.insert_one(post).session(&mut session).await {
                tracing::warn!(error = %e, "aborting transaction");
                let aborted = session.abort_transaction().await;
                return Err(keep_cause(e, aborted));
            }
        }

        session.commit_transaction().await?;
        println!("Committed {} posts in one transaction", batch.len());
        Ok(())
    }

    pub async fn insert_account(&self) -> Result<()> {
        let accounts: Collection<Account> = collection(&self.client, "bank", "accounts");
        let result = accounts.insert_one(sample_account()?).await?;
        println!("Inserted account: {}", result.inserted_id);
        Ok(())
    }

    pub async fn aggregation_match(&self) -> Result<()> {
        let pipeline = vec![match_name_contains(MATCH_NEEDLE)];
        let results: Vec<Post> = self
            .posts()
            .aggregate(pipeline)
            .with_type::<Post>()
            .await?
            .try_collect()
            .await?;
        for post in &results {
            println!("{}", post.name);
        }
        Ok(())
    }

    pub async fn aggregation_group(&self) -> Result<()> {
        let pipeline = vec![match_name_contains(MATCH_NEEDLE), group_by_type()];
        let results: Vec<PostTypeTotal> = self
            .posts()
            .aggregate(pipeline)
            .with_type::<PostTypeTotal>()
            .await?
            .try_collect()
            .await?;
        for group in &results {
            println!(
                "{} - {}",
                group.post_type.as_deref().unwrap_or(""),
                group.total
            );
        }
        Ok(())
    }

    pub async fn aggregation_sort(&self) -> Result<()> {
        let pipeline = vec![match_name_contains(MATCH_NEEDLE), sort_by_name_desc()];
        let results: Vec<Post> = self
            .posts()
            .aggregate(pipeline)
            .with_type::<Post>()
            .await?
            .try_collect()
            .await?;
        for post in &results {
            println!("{}", post.name);
        }
        Ok(())
    }

    pub async fn aggregation_projection(&self) -> Result<()> {
        let pipeline = vec![
            match_name_contains(MATCH_NEEDLE),
            sort_by_name_desc(),
            project_type_and_age(),
        ];
        let results: Vec<PostSummary> = self
            .posts()
            .aggregate(pipeline)
            .with_type::<PostSummary>()
            .await?
            .try_collect()
            .await?;
        for summary in &results {
            println!("{summary}");
        }
        Ok(())
    }
}

/// Writes are acknowledged unless the write concern is explicitly `w: 0`.
pub fn is_acknowledged(write_concern: Option<&WriteConcern>) -> bool {
    !matches!(
        write_concern.and_then(|wc| wc.w.as_ref()),
        Some(Acknowledgment::Nodes(0))
    )
}

/// Returns `cause` even when the cleanup that followed it failed too; the
/// cleanup error is only logged.
fn keep_cause<E, C>(cause: E, cleanup: std::result::Result<(), C>) -> anyhow::Error
where
    E: Into<anyhow::Error>,
    C: std::fmt::Display,
{
    if let Err(e) = cleanup {
        tracing::error!(error = %e, "failed to abort transaction");
    }
    cause.into()
}

pub fn database_summary(
    name: &str,
    size_on_disk: u64,
    empty: bool,
    shards: Option<&Document>,
) -> String {
    let mut line = format!("{name} - sizeOnDisk: {size_on_disk} - empty: {empty}");
    if let Some(shards) = shards {
        line.push_str(&format!(" - shards: {shards}"));
    }
    line
}

pub fn update_summary(acknowledged: bool, matched: u64, modified: u64) -> String {
    format!("Acknowledged: {acknowledged} - Matched: {matched} - Modified: {modified}")
}

pub fn delete_summary(acknowledged: bool, deleted: u64) -> String {
    format!("Acknowledged: {acknowledged} - Deleted: {deleted}")
}

pub fn sample_account() -> Result<Account> {
    Ok(Account {
        id: None,
        account_id: "MDB829001337".to_string(),
        account_holder: "Linus Torvalds".to_string(),
        account_type: "checking".to_string(),
        balance: Decimal128::from_str("50352434")
            .map_err(|e| anyhow!("invalid sample balance: {:?}", e))?,
        transfers_completed: Vec::new(),
    })
}
