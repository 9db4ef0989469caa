//! Test helpers for running CLI invocations against a temporary workspace.

use super::*;
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Temporary directory holding the trip store and index artefacts.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("trips.db")
    }

    pub(super) fn index(&self) -> Utf8PathBuf {
        self.root.join("artefacts").join("routes.wyri")
    }

    /// Write the Tokyo sample network into the workspace's trip store.
    #[cfg(feature = "store-sqlite")]
    pub(super) fn write_network(&self) {
        wayfarer_core::test_support::sample_network()
            .write(self.database().as_std_path())
            .expect("write sample network");
    }

    /// Build the route index from the trip store.
    #[cfg(feature = "store-sqlite")]
    pub(super) fn build_index(&self) {
        let database = self.database();
        let index = self.index();
        invoke(&[
            "build-index",
            "--database",
            database.as_str(),
            "--output",
            index.as_str(),
        ])
        .0
        .expect("build index");
    }
}

/// Parse `args` after the binary name and run the command, capturing
/// standard output.
pub(super) fn invoke(args: &[&str]) -> (Result<(), CliError>, String) {
    let argv = std::iter::once("wayfarer").chain(args.iter().copied());
    let mut stdout = Vec::new();
    let outcome = Cli::try_parse_from(argv)
        .map_err(CliError::from)
        .and_then(|cli| run_command(cli.command, &mut stdout));
    let printed = String::from_utf8(stdout).expect("stdout utf-8");
    (outcome, printed)
}
