use anyhow::Result;
use zklogin::cli::{actions, actions::Action, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let action = start()?;

    // Handle the action
    match action {
        Action::Demo { .. } => actions::demo::handle(action).await?,
    }

    Ok(())
}
