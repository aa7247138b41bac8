use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Resolve a token reference to its value
///
/// - `${VAR_NAME}` reads an environment variable
/// - `command://...` runs a shell command and uses its trimmed output
/// - anything else is the token itself
pub(crate) async fn resolve_token(token_ref: &str) -> Result<String> {
    match token_ref {
        ref_str if ref_str.starts_with("${") && ref_str.ends_with('}') => {
            let var_name = &ref_str[2..ref_str.len() - 1];
            std::env::var(var_name)
                .with_context(|| format!("Environment variable '{var_name}' not found"))
        }

        ref_str if ref_str.starts_with("command://") => {
            let command = &ref_str["command://".len()..];

            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .context("Failed to spawn token command")?
                .wait_with_output()
                .await
                .context("Failed to wait for token command")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("Token command failed: {}", stderr.trim());
            }

            let token = String::from_utf8(output.stdout)
                .context("Token command output is not valid UTF-8")?
                .trim()
                .to_string();
            if token.is_empty() {
                anyhow::bail!("Token command returned empty output");
            }
            Ok(token)
        }

        literal => Ok(literal.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn env_var() {
        unsafe {
            std::env::set_var("GANTRY_TEST_SOURCE_TOKEN", "ghp_from_env");
        }
        let token = resolve_token("${GANTRY_TEST_SOURCE_TOKEN}").await.unwrap();
        assert_eq!(token, "ghp_from_env");
        unsafe {
            std::env::remove_var("GANTRY_TEST_SOURCE_TOKEN");
        }

        let err = resolve_token("${GANTRY_TEST_MISSING_VAR}").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn command() {
        let token = resolve_token("command://printf '  ghp_from_command \\n'").await.unwrap();
        assert_eq!(token, "ghp_from_command");
        assert!(resolve_token("command://exit 1").await.is_err());
        assert!(resolve_token("command://true").await.is_err());
    }

    #[tokio::test]
    async fn literal() {
        assert_eq!(resolve_token("ghp_literal").await.unwrap(), "ghp_literal");
    }
}
