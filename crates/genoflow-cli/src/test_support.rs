//! Command harness over the in-memory store and a local bucket.

use crate::app::AppContext;
use crate::command::CliCommand;
use clap::ArgMatches;
use genoflow_agent::Agent;
use genoflow_core::{CallContext, Config};
use genoflow_db::MemoryJobStore;
use genoflow_processing::{Runner, Script, ScriptedExecutor};
use genoflow_storage::{FolderLayout, LocalStorage};
use std::sync::Arc;
use tempfile::TempDir;

pub const VCF_PASSED: &str = r#"{"mode":"vcf","sex":"F","error":"","passed":true}"#;

pub struct Harness {
    pub app: AppContext,
    pub store: MemoryJobStore,
    pub executor: Arc<ScriptedExecutor>,
    _dir: TempDir,
}

pub async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let mount = dir.path().join("mnt");
    let layout = FolderLayout {
        internal: "internal".into(),
        external: "external".into(),
        binary: "binary".into(),
        upload: "upload".into(),
    };
    let storage = LocalStorage::new(dir.path().join("bucket"), layout, mount.join("source"))
        .await
        .unwrap();
    let store = MemoryJobStore::new();
    let executor = Arc::new(ScriptedExecutor::new().with_artifact_root(mount.join("raw_data")));
    let runner = Runner::new(
        Arc::new(store.clone()),
        executor.clone(),
        Arc::new(storage),
        &mount,
    );
    let agent = Agent::new(Arc::new(store.clone()), runner);
    let mount_dir = mount.to_string_lossy().into_owned();
    let config = Config::from_lookup(|key| match key {
        "DOCKER_MOUNT_DIR" => Some(mount_dir.clone()),
        _ => None,
    })
    .unwrap();

    Harness {
        app: AppContext::with_agent(config, agent),
        store,
        executor,
        _dir: dir,
    }
}

impl Harness {
    pub async fn validated(&self, user_id: &str, file_name: &str) {
        self.executor.push(Script::Stdout(VCF_PASSED.into()));
        self.app
            .agent()
            .await
            .unwrap()
            .validate(&CallContext::background(), user_id, file_name, false, false)
            .await
            .unwrap();
    }

    pub async fn run(&self, command: &dyn CliCommand, argv: &[&str]) -> anyhow::Result<()> {
        let args: ArgMatches = command
            .describe()
            .try_get_matches_from(argv.iter().copied())
            .unwrap();
        command.execute(&self.app, &args).await
    }
}
