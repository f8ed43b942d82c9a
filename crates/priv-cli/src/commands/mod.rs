pub mod dp;
pub mod kanon;
pub mod link;
pub mod run;
pub mod schema;
pub mod utility;

use crate::bootstrap;
use crate::cli::{Commands, GlobalFlags};

/// Dispatch a parsed command to the corresponding handler module.
pub fn dispatch(command: &Commands, flags: &GlobalFlags) -> anyhow::Result<()> {
    if let Commands::Schema(args) = command {
        return schema::handle(args, flags);
    }

    let config = bootstrap::load_config(flags)?;
    match command {
        Commands::Run(args) => run::handle(args, config, flags),
        Commands::Kanon(args) => kanon::handle(args, &config, flags),
        Commands::Dp(args) => dp::handle(args, &config, flags),
        Commands::Link(args) => link::handle(args, &config, flags),
        Commands::Utility(args) => utility::handle(args, &config, flags),
        Commands::Schema(_) => unreachable!("schema is dispatched before config loading"),
    }
}
