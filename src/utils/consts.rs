/// 日志级别（可被 RUST_LOG 覆盖）
pub const LOG_LEVEL: &str = "info";

/// Print the running averaged SER every this many blocks
pub const PRINT_FREQ: usize = 10;

// ============================================================================
// Detector / Online Training Defaults
// ============================================================================

/// Hidden layer width of the state-posterior network
pub const DEFAULT_HIDDEN_SIZE: usize = 100;

/// Gradient passes over the augmented pilot per block
pub const DEFAULT_ONLINE_EPOCHS: usize = 25;

/// Total number of pilot rows after augmentation expansion
pub const DEFAULT_AUG_TOTAL_SIZE: usize = 12;

/// How many of the expanded rows are actually augmented
pub const DEFAULT_AUG_N_REPEATS: usize = 3;

// ============================================================================
// Channel Parameters
// ============================================================================

/// Period (in blocks) of the cosine tap fading of the time-varying channel
pub const FADING_PERIOD_BLOCKS: usize = 20;

/// Depth of the cosine tap fading; taps swing within [1 - depth, 1 + depth]
pub const FADING_DEPTH: f32 = 0.2;
