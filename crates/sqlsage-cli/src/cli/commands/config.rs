use super::exit_codes;
use sqlsage_core::config::AgentConfig;

pub fn run(cfg: &AgentConfig) -> anyhow::Result<i32> {
    print!("{}", serde_yaml::to_string(cfg)?);
    Ok(exit_codes::OK)
}
