//! `shotline version` - print version information.

use crate::error::Result;

pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(
            "{}",
            serde_json::json!({ "name": "shotline", "version": version })
        );
    } else {
        println!("shotline {version}");
    }
    Ok(())
}
