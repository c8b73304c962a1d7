use anyhow::Context as _;

use crate::cli::Cli;
use crate::output;
use crate::run_error::RunError;
use loadmix_core::{Generator, GeneratorConfig};

pub async fn run(cli: Cli) -> Result<(), RunError> {
    validate_base_url(&cli.base_url).map_err(RunError::InvalidInput)?;

    let out = output::formatter(cli.output, cli.duration);

    let cfg = GeneratorConfig::new(cli.base_url, cli.duration);
    out.print_header(&cfg);

    let generator = match cli.seed {
        Some(seed) => Generator::with_seed(cfg, seed),
        None => Generator::new(cfg),
    };

    let summary = generator.run(out.progress()).await;

    out.print_summary(&summary).map_err(RunError::RuntimeError)?;
    Ok(())
}

fn validate_base_url(raw: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(raw).with_context(|| format!("invalid base url: {raw}"))?;
    if parsed.scheme() != "http" {
        anyhow::bail!("only http:// base urls are supported: {raw}");
    }
    if parsed.host_str().is_none() {
        anyhow::bail!("base url must include a host: {raw}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_validation() {
        assert!(validate_base_url("http://localhost:3000").is_ok());
        assert!(validate_base_url("http://10.0.0.5:8080/app").is_ok());
        assert!(validate_base_url("https://example.com").is_err());
        assert!(validate_base_url("localhost:3000").is_err());
        assert!(validate_base_url("not a url").is_err());
    }
}
