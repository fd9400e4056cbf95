//! Removal of compiled output so the next run starts from a clean tree.

use super::Pipeline;
use crate::target::Target;
use std::fs;
use tracing::{info, warn};

impl Pipeline<'_> {
    /// Remove both `bin/` directories. Never fails; problems are logged.
    pub fn cleanup(&self) {
        info!("removing directories with compiled files");
        for target in Target::ALL {
            let dir = self.config.output_dir(target);
            if !dir.exists() {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => info!(path = %dir.display(), "removed"),
                Err(e) => warn!(path = %dir.display(), error = %e, "could not remove"),
            }
        }
    }
}
