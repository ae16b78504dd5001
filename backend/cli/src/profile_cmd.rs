use anyhow::{bail, Result};

use staytime_config::StaytimeConfig;

use crate::runtime::open_directory;

pub async fn run(config: &StaytimeConfig, user_id: &str) -> Result<()> {
    let directory = open_directory(config)?;
    match directory.get(user_id).await? {
        Some(profile) => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        None => bail!("no profile stored for user {user_id}"),
    }
}
