use anyhow::Context;

use bw_domain::config::Config;
use bw_store::IdentityStore;

use super::StoreCommand;

pub fn run(config: &Config, command: StoreCommand) -> anyhow::Result<()> {
    let store = IdentityStore::open(&config.store.path)
        .with_context(|| format!("opening {}", config.store.path.display()))?;

    match command {
        StoreCommand::List => {
            for id in store.ids() {
                println!("{id}");
            }
        }
        StoreCommand::Count => println!("{}", store.len()),
    }

    store.close()?;
    Ok(())
}
