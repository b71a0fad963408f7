//! Size estimate for the next incremental snapshot.
//!
//! The two newest snapshots share unchanged files through hardlinks. A single
//! `du` over both charges every shared inode to the older one, so the total it
//! reports for the newer one is roughly what the last run added. That figure
//! stands in for what the next run will add. It is a heuristic with no error
//! bound.

use crate::backup::command::{SystemCommand, Tools};
use crate::backup::function_path;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use crate::backup::snapshot::Catalog;
use crate::backup::tool_output::du::{parse_last_row_bytes, DU_ARGS};
use function_name::named;
use std::path::Path;

pub struct SpaceEstimator {
    tools: Tools,
}

impl SpaceEstimator {
    pub fn new(tools: Tools) -> Self {
        Self { tools }
    }

    /// `None` when fewer than two snapshots exist.
    #[named]
    pub fn estimate(&self, catalog: &Catalog, root: &Path) -> Result<Option<u64>> {
        let Some((older, newer)) = catalog.newest_pair() else {
            return Ok(None);
        };

        let du = &self.tools.paths.du;
        let command = SystemCommand::privileged(du)
            .args(DU_ARGS)
            .arg(root.join(older))
            .arg(root.join(newer));
        let output = self
            .tools
            .runner
            .output(&command)
            .add_fn_name(function_path!())?;
        let size = parse_last_row_bytes(&du.to_string_lossy(), &output)
            .add_msg(format!("Determining size of {older} and {newer} failed"))
            .add_fn_name(function_path!())?;

        tracing::info!("Estimated incremental size from {newer}: {size} bytes");
        Ok(Some(size))
    }
}
