// Re-export all items from the submodules
mod env_vars;
mod probes;
mod run_config;

// Re-export probe plans
pub use probes::{
    Category,
    IptablesTable,
    ProbeKind,
    ProbeSpec,
    Step,
    IOSTAT_BSD,
    IOSTAT_LINUX,
    IOSTAT_SOLARIS,
    LIMITS_D,
    SWAPCTL,
    SWAPON,
};

// Re-export run configuration
pub use run_config::{
    staging_name,
    OutputTarget,
    RunConfig,
    Selection,
};

// Re-export environment variable functions
pub use env_vars::{
    tmp_root,
    tmp_root_from,
};
