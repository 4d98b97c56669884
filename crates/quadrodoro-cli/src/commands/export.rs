use std::path::Path;

use quadrodoro_core::Database;

use super::CommandResult;

pub fn run(path: &Path) -> CommandResult {
    let db = Database::open()?;
    db.export_json(path)?;
    println!("exported to {}", path.display());
    Ok(())
}
