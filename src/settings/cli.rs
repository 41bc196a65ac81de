use super::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    /// Path to a settings file, without extension works too.
    #[arg(long)]
    pub settings: Option<String>,
}
