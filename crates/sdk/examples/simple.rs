//! Simple SDK Example
//!
//! Runs a JavaScript snippet, streams its logs and prints the result.
//!
//! # Usage
//!
//! 1. Provide credentials:
//!    ```bash
//!    export YEPCODE_API_TOKEN=sk-...
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple
//!    ```

use anyhow::Context;
use serde_json::json;
use yepcode_sdk::{ApiConfig, ExecutionEvents, RunOptions, YepCodeEnv, YepCodeRun};

const CODE: &str = r#"
async function main() {
  const { name } = yep.context.parameters;
  console.log(`Hello, ${name}`);
  return { greeting: `Hello, ${name}`, at: new Date().toISOString() };
}
module.exports = { main };
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("YepCode Run SDK - Simple Example");
    println!("================================\n");

    // 1. Build the facades (credentials from YEPCODE_* / .env)
    let runner = YepCodeRun::new(ApiConfig::default()).context("Failed to configure client")?;
    let env = YepCodeEnv::new(ApiConfig::default())?;

    // 2. Store a team variable the snippet could read
    env.set_env_var("GREETING_TARGET", "world", false).await?;
    println!("1. Team variables:");
    for var in env.env_vars().await? {
        println!("   - {} = {}", var.key, var.value.unwrap_or_default());
    }

    // 3. Run the snippet and stream its logs
    println!("\n2. Running snippet...");
    let execution = runner
        .run(
            CODE,
            RunOptions {
                parameters: Some(json!({ "name": "world" })),
                remove_on_done: true,
                events: Some(
                    ExecutionEvents::new()
                        .on_log(|log| println!("   | [{}] {}", log.level, log.message))
                        .on_error(|err| eprintln!("   ✗ {}", err)),
                ),
                ..RunOptions::default()
            },
        )
        .await?;
    println!("   ✓ Execution started: {}", execution.execution_id());

    // 4. Wait for the result
    let done = execution.wait_for_done().await?;
    println!("\n3. Status: {:?}", done.status);
    if let Some(value) = done.return_value {
        println!("   Return value: {}", serde_json::to_string_pretty(&value)?);
    }

    env.del_env_var("GREETING_TARGET").await?;
    println!("\n✓ Example completed successfully!");

    Ok(())
}
