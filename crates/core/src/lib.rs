pub mod collection;
pub mod config;
pub mod folder;
pub mod gateway;
pub mod job;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod pinning;
pub mod renderer;
pub mod scheduler;
pub mod testing;

pub use collection::{
    Collection, CollectionError, CollectionRepository, NftConfig, NftStatus, PinInfo,
    SqliteCollectionRepository,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig,
};
pub use folder::{DagEndpoint, FolderAssembler, FolderError, HttpDagEndpoint};
pub use gateway::{
    GatewayConfig, GatewayError, GatewayFetchBatcher, GatewayTransport, HttpGatewayTransport,
};
pub use job::{JobKey, JobRecord, JobState, JobStore, JobStoreError, SqliteJobStore};
pub use notify::{LogNotifier, Notification, Notifier, PinningState, Progress};
pub use orchestrator::{JobOutcome, OrchestratorError, PipelineOrchestrator};
pub use pinning::{
    BatchLimits, HttpPinEndpoint, PinBatchQueue, PinEndpoint, PinError, PinnedFile, PinningConfig,
};
pub use renderer::{
    HttpScriptSource, ProcessRenderer, RenderError, Renderer, RendererConfig, ScriptSource,
};
pub use scheduler::{JobScheduler, SchedulerConfig, SchedulerError, SchedulerStatus};
