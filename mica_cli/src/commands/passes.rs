//! `mica passes`: list registered passes

use anyhow::Result;
use mica_passes::PassManager;

pub fn execute() -> Result<()> {
    let manager = PassManager::with_default_passes();
    for registration in manager.registrations() {
        println!("{} — {}", registration.signature(), registration.summary);
    }
    Ok(())
}
