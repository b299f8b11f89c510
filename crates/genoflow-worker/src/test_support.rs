use genoflow_agent::Agent;
use genoflow_core::CallContext;
use genoflow_db::MemoryJobStore;
use genoflow_processing::{Runner, Script, ScriptedExecutor};
use genoflow_storage::{FolderLayout, LocalStorage};
use std::sync::Arc;
use tempfile::TempDir;

pub const VCF_PASSED: &str = r#"{"mode":"vcf","sex":"M","error":"","passed":true}"#;
pub const REJECTED: &str = r#"{"mode":"csv","sex":"","error":"bad rows","passed":false}"#;

pub struct Harness {
    pub agent: Agent,
    pub store: MemoryJobStore,
    pub executor: Arc<ScriptedExecutor>,
    pub dir: TempDir,
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
    Harness {
        agent: Agent::new(Arc::new(store.clone()), runner),
        store,
        executor,
        dir,
    }
}

impl Harness {
    /// Put a source file where remote fetches look for it.
    pub async fn stage_upload(&self, file_name: &str) {
        let upload = self.dir.path().join("bucket/upload");
        tokio::fs::create_dir_all(&upload).await.unwrap();
        tokio::fs::write(upload.join(file_name), b"rsid\tchrom\tpos\tgenotype\n")
            .await
            .unwrap();
    }

    pub fn staged(&self, file_name: &str) -> bool {
        self.dir.path().join("mnt/source").join(file_name).exists()
    }

    /// Register `user_id` with a valid `file_name` through a local validation.
    pub async fn validated(&self, user_id: &str, file_name: &str) {
        self.executor.push(Script::Stdout(VCF_PASSED.into()));
        self.agent
            .validate(&CallContext::background(), user_id, file_name, false, false)
            .await
            .unwrap();
    }
}
