//! Config-script executor collaborator.

use crate::error::CloudResult;
use crate::path::AssetPath;

/// Runs a downloaded file as executable configuration.
///
/// Closures taking the path work directly:
///
/// ```rust
/// use cloudsync::{AssetPath, CloudError, ScriptExecutor};
///
/// let mut executed = Vec::new();
/// let mut executor = |path: &AssetPath| {
///     executed.push(path.to_string());
///     Ok::<(), CloudError>(())
/// };
/// executor.execute(&AssetPath::parse("settings_ddnet.cfg").unwrap()).unwrap();
/// assert_eq!(executed, vec!["settings_ddnet.cfg"]);
/// ```
pub trait ScriptExecutor {
    fn execute(&mut self, path: &AssetPath) -> CloudResult<()>;
}

impl<F> ScriptExecutor for F
where
    F: FnMut(&AssetPath) -> CloudResult<()>,
{
    fn execute(&mut self, path: &AssetPath) -> CloudResult<()> {
        self(path)
    }
}
